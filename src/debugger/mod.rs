mod command;
mod source;

use self::command::Command;
use self::source::SourceMode;
use crate::output::{Category, Condition, Output, Radix};
use crate::state::MachineState;
use crate::store::ProgramStore;
use crate::symbol::LabelTable;
use crate::{dprint, dprintln};

/// Leave this as a struct, in case more options are added in the future. Plus it is more explicit.
#[derive(Debug, Default)]
pub struct DebuggerOptions {
    /// Commands to run instead of prompting, separated by `;` or newlines
    pub command: Option<String>,
    pub radix: Radix,
}

pub struct Debugger {
    status: Status,
    command_source: SourceMode,
    radix: Radix,
}

/// The current status of the debugger execution loop.
#[derive(Debug, Default, PartialEq)]
enum Status {
    /// Pause before the next instruction.
    #[default]
    WaitForAction,
    /// Execute everything left without pausing.
    Continue,
}

/// An action, which the debugger passes to the runtime loop.
#[derive(Debug, PartialEq)]
pub enum Action {
    /// Keep executing as normal (with the debugger active).
    Proceed,
    /// Disable the debugger, keep executing.
    StopDebugger,
    /// End the run before the pending instruction executes.
    ExitProgram,
}

impl Debugger {
    pub(crate) fn new(opts: DebuggerOptions) -> Self {
        Self {
            status: Status::default(),
            command_source: SourceMode::from(opts.command),
            radix: opts.radix,
        }
    }

    /// Called before every cycle. Blocks on the command source until an action is chosen.
    pub(crate) fn wait_for_action(
        &mut self,
        state: &MachineState,
        store: &ProgramStore,
        labels: &LabelTable,
    ) -> Action {
        if self.status == Status::Continue {
            return Action::StopDebugger;
        }

        Output::Debugger(Condition::Always, Category::Normal).start_new_line();
        dprintln!(Sometimes, Info, "{}", "-".repeat(40));
        Output::Debugger(Condition::Sometimes, Category::Normal).print_cpu(state, self.radix);
        dprintln!(Sometimes);
        Output::Debugger(Condition::Sometimes, Category::Normal).print_memory(store, self.radix);
        dprintln!(Sometimes);
        match store.get(state.pc()) {
            Some(cell) => {
                dprintln!(Always, Special, "Executing instruction {}: {}", state.pc(), cell)
            }
            None => dprintln!(Always, Special, "Executing instruction {}", state.pc()),
        }

        loop {
            if let Some(action) = self.next_action(state, store, labels) {
                return action;
            }
        }
    }

    fn next_action(
        &mut self,
        state: &MachineState,
        store: &ProgramStore,
        labels: &LabelTable,
    ) -> Option<Action> {
        // Convert `EOF` to `continue` command
        let command = self.next_command().unwrap_or(Command::Continue);

        match command {
            Command::Step => return Some(Action::Proceed),
            Command::Continue => {
                self.status = Status::Continue;
                dprintln!(Always, Info, "Continuing...");
                return Some(Action::StopDebugger);
            }
            Command::Exit => return Some(Action::ExitProgram),

            Command::Registers => {
                Output::Debugger(Condition::Always, Category::Normal).print_cpu(state, self.radix)
            }
            Command::Memory => {
                Output::Debugger(Condition::Always, Category::Normal)
                    .print_memory(store, self.radix)
            }
            Command::Program => {
                Output::Debugger(Condition::Always, Category::Normal).print_program(store)
            }
            Command::Labels => {
                if labels.is_empty() {
                    dprintln!(Always, Info, "No labels declared.");
                } else {
                    Output::Debugger(Condition::Always, Category::Normal).print_labels(labels);
                }
            }
            Command::Help => {
                dprintln!(Always, Special, "\n{}", include_str!("./help.txt"));
            }
        }
        None
    }

    /// Returns `None` on EOF.
    fn next_command(&mut self) -> Option<Command> {
        // Loop until valid command or EOF
        loop {
            let line = self.command_source.read()?.trim();
            match Command::try_from(line) {
                Ok(command) => break Some(command),
                Err(error) => {
                    dprint!(Always, Error, "{}", error);
                    dprintln!(Always, Error, " Type `help` for a list of commands.");
                }
            }
        }
    }
}
