use std::collections::VecDeque;
use std::fmt;
use std::io::{stdin, stdout, IsTerminal, Read, Write};

use console::Term;

use crate::debugger::{Action, Debugger, DebuggerOptions};
use crate::error::{LabelFormatError, RuntimeError, RuntimeErrorKind};
use crate::instr::{Cell, Comparand, Instruction, Label, Register, Word};
use crate::output::{Category, Condition, Output};
use crate::state::MachineState;
use crate::store::{Program, ProgramStore};
use crate::symbol::LabelTable;
use crate::{dprint, print_char};

/// Character source for `IN` and sink for `OUT`.
pub trait Io {
    /// `None` indicates no more input.
    fn read_char(&mut self) -> Option<char>;
    fn write_char(&mut self, ch: char);
}

/// In-memory I/O, for scripted runs.
#[derive(Debug, Default)]
pub struct BufferIo {
    input: VecDeque<char>,
    output: String,
}

/// Terminal I/O. Characters given up front are consumed before the terminal is asked.
#[derive(Debug, Default)]
pub struct ConsoleIo {
    script: Option<VecDeque<char>>,
}

/// Reason a run stopped without an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Halt {
    /// Executed `END`.
    End,
    /// Program counter ran past the last cell.
    EndOfProgram,
    /// Step limit reached.
    StepLimit,
    /// Stopped from the debugger.
    Exited,
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::End => write!(f, "reached END"),
            Self::EndOfProgram => write!(f, "ran past the last line"),
            Self::StepLimit => write!(f, "step limit reached"),
            Self::Exited => write!(f, "exited from debugger"),
        }
    }
}

/// Outcome of a single cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Halt(Halt),
}

/// Everything one run owns: memory, labels, registers and an optional step debugger.
pub struct RunEnvironment {
    store: ProgramStore,
    labels: LabelTable,
    state: MachineState,
    debugger: Option<Debugger>,
    step_limit: Option<u64>,
}

impl RunEnvironment {
    /// Prepare a run of `program` with fresh memory.
    ///
    /// Fails before anything executes if the labels are malformed or undefined.
    pub fn new(program: &Program) -> Result<Self, LabelFormatError> {
        Self::from_store(program.store())
    }

    pub fn from_store(store: ProgramStore) -> Result<Self, LabelFormatError> {
        let labels = LabelTable::build(&store)?;
        Ok(RunEnvironment {
            store,
            labels,
            state: MachineState::default(),
            debugger: None,
            step_limit: None,
        })
    }

    /// Pause before every instruction until the debugger says otherwise.
    pub fn attach_debugger(&mut self, opts: DebuggerOptions) {
        self.debugger = Some(Debugger::new(opts));
    }

    pub fn set_step_limit(&mut self, limit: Option<u64>) {
        self.step_limit = limit;
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn store(&self) -> &ProgramStore {
        &self.store
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Run until a halt condition or an error.
    pub fn run(&mut self, io: &mut impl Io) -> Result<Halt, RuntimeError> {
        loop {
            if self.state.pc() >= self.store.len() {
                return Ok(Halt::EndOfProgram);
            }
            if self
                .step_limit
                .is_some_and(|limit| self.state.steps() >= limit)
            {
                return Ok(Halt::StepLimit);
            }

            if let Some(debugger) = self.debugger.as_mut() {
                match debugger.wait_for_action(&self.state, &self.store, &self.labels) {
                    Action::Proceed => (),
                    Action::StopDebugger => self.debugger = None,
                    Action::ExitProgram => return Ok(Halt::Exited),
                }
            }

            if let Flow::Halt(halt) = self.step(io)? {
                return Ok(halt);
            }
        }
    }

    /// Fetch, decode and execute the cell at PC.
    ///
    /// On error the program counter still points at the failing cell.
    pub fn step(&mut self, io: &mut impl Io) -> Result<Flow, RuntimeError> {
        let pc = self.state.pc();
        let Some(cell) = self.store.get(pc) else {
            return Ok(Flow::Halt(Halt::EndOfProgram));
        };
        // Execution may overwrite the cell it came from
        let cell = cell.clone();
        self.state.count_step();

        let flow = match &cell {
            Cell::Instr(instr) => self.execute(instr, io).map_err(|kind| RuntimeError {
                pc,
                instr: instr.to_string(),
                kind,
            })?,
            // Declarations hold no opcode
            Cell::Label(_) => Flow::Continue,
            Cell::Value(_) | Cell::Raw(_) => {
                return Err(RuntimeError {
                    pc,
                    instr: cell.to_string(),
                    kind: RuntimeErrorKind::UnknownOpcode {
                        found: cell.to_string(),
                    },
                })
            }
        };

        // Incremented even after a jump, so a jump to `L` continues at `L + 1`
        *self.state.pc_mut() += 1;
        Ok(flow)
    }

    fn execute(&mut self, instr: &Instruction, io: &mut impl Io) -> Result<Flow, RuntimeErrorKind> {
        match instr {
            Instruction::Ldm(n) => *self.state.acc_mut() = *n,
            Instruction::Ldr(n) => *self.state.register_mut(Register::Ix) = *n,
            Instruction::Ldd(label) => {
                let value = self.store.value(self.target(label)?)?;
                *self.state.acc_mut() = value;
            }
            Instruction::Ldi(label) => {
                let addr = self.store.value(self.target(label)?)?;
                let value = self.store.value(addr as i64 + 1)?;
                *self.state.acc_mut() = value;
            }
            Instruction::Ldx(label) => {
                let addr = self.indexed(label)?;
                self.store.grow_to(addr);
                let value = self.store.value(addr)?;
                *self.state.acc_mut() = value;
            }
            Instruction::Sto(label) => {
                let addr = self.target(label)?;
                self.store.set_value(addr, self.state.acc())?;
            }
            Instruction::Stx(label) => {
                let addr = self.indexed(label)?;
                self.store.grow_to(addr);
                self.store.set_value(addr, self.state.acc())?;
            }
            Instruction::Add(label) => {
                let value = self.store.value(self.target(label)?)?;
                let acc = self.state.acc_mut();
                *acc = acc.wrapping_add(value);
            }
            Instruction::Inc(reg) => {
                let reg = self.state.register_mut(*reg);
                *reg = reg.wrapping_add(1);
            }
            Instruction::Dec(reg) => {
                let reg = self.state.register_mut(*reg);
                *reg = reg.wrapping_sub(1);
            }
            Instruction::Cmp(comparand) => {
                let value = match comparand {
                    Comparand::Imm(n) => *n,
                    Comparand::Label(label) => self.store.value(self.target(label)?)?,
                };
                self.state.set_eq(self.state.acc() == value);
            }
            Instruction::Jmp(label) => self.jump(label)?,
            Instruction::Jpe(label) => {
                if self.state.eq() {
                    self.jump(label)?;
                }
            }
            Instruction::Jpn(label) => {
                if !self.state.eq() {
                    self.jump(label)?;
                }
            }
            Instruction::And(n) => *self.state.acc_mut() &= *n,
            Instruction::Or(n) => *self.state.acc_mut() |= *n,
            Instruction::Xor(n) => *self.state.acc_mut() ^= *n,
            Instruction::Lsl(n) => {
                let acc = self.state.acc_mut();
                *acc = shift_left(*acc, *n);
            }
            Instruction::Lsr(n) => {
                let acc = self.state.acc_mut();
                *acc = shift_right(*acc, *n);
            }
            Instruction::In => {
                let ch = io.read_char().ok_or(RuntimeErrorKind::InputExhausted)?;
                let code = Word::try_from(ch as u32).map_err(|_| {
                    RuntimeErrorKind::InvalidCharacter {
                        value: ch as u32 as i64,
                    }
                })?;
                *self.state.acc_mut() = code;
            }
            Instruction::Out => {
                let value = self.state.acc();
                let ch = u32::try_from(value)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or(RuntimeErrorKind::InvalidCharacter {
                        value: value as i64,
                    })?;
                io.write_char(ch);
            }
            Instruction::End => return Ok(Flow::Halt(Halt::End)),
        }
        Ok(Flow::Continue)
    }

    /// Address of the cell after the declaration of `label`.
    fn target(&self, label: &Label) -> Result<i64, RuntimeErrorKind> {
        self.labels
            .target(label)
            .map(|addr| addr as i64)
            .ok_or_else(|| RuntimeErrorKind::UndefinedLabel(label.clone()))
    }

    fn indexed(&self, label: &Label) -> Result<i64, RuntimeErrorKind> {
        Ok(self.target(label)? + self.state.ix() as i64)
    }

    fn jump(&mut self, label: &Label) -> Result<(), RuntimeErrorKind> {
        let addr = self
            .labels
            .get(label)
            .ok_or_else(|| RuntimeErrorKind::UndefinedLabel(label.clone()))?;
        *self.state.pc_mut() = addr;
        Ok(())
    }
}

/// Bits shifted past the top are lost.
fn shift_left(value: Word, amount: Word) -> Word {
    (value as u16).checked_shl(amount as u32).unwrap_or(0) as Word
}

/// Logical shift; zeroes come in at the top.
fn shift_right(value: Word, amount: Word) -> Word {
    (value as u16).checked_shr(amount as u32).unwrap_or(0) as Word
}

impl BufferIo {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            output: String::new(),
        }
    }

    pub fn output(&self) -> &str {
        &self.output
    }
}

impl Io for BufferIo {
    fn read_char(&mut self) -> Option<char> {
        self.input.pop_front()
    }

    fn write_char(&mut self, ch: char) {
        self.output.push(ch);
    }
}

impl ConsoleIo {
    pub fn new(script: Option<String>) -> Self {
        Self {
            script: script.map(|script| script.chars().collect()),
        }
    }
}

impl Io for ConsoleIo {
    fn read_char(&mut self) -> Option<char> {
        if let Some(script) = self.script.as_mut() {
            return script.pop_front();
        }
        read_input()
    }

    fn write_char(&mut self, ch: char) {
        print_char!(ch);
        // Flushing stdout is best effort
        let _ = stdout().flush();
    }
}

// Read one character from unbuffered terminal or one byte from stdin
fn read_input() -> Option<char> {
    if stdin().is_terminal() {
        dprint!(Sometimes, Info, "Enter input: ");
        let ch = Term::stdout().read_char().ok();
        Output::Debugger(Condition::Always, Category::Info).start_new_line();
        ch
    } else {
        let mut buf = [0; 1];
        match stdin().read(&mut buf) {
            Ok(1) => Some(buf[0] as char),
            _ => None,
        }
    }
}
