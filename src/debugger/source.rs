use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal};

use console::{style, Term};

use crate::dprintln;

/// Where debugger commands come from.
///
/// Every source is line based. A line may hold several commands separated by `;`, and an
/// empty line is a single empty command.
pub struct SourceMode {
    lines: Lines,
    /// Commands split from the last line, not yet handed out
    pending: VecDeque<String>,
    current: String,
}

enum Lines {
    /// `--command` argument
    Argument(VecDeque<String>),
    /// Piped stdin
    Stdin(io::Stdin),
    /// Interactive terminal, with a prompt
    Terminal(Term),
}

impl SourceMode {
    pub fn from(argument: Option<String>) -> Self {
        let lines = match argument {
            Some(argument) => Lines::Argument(argument.lines().map(str::to_string).collect()),
            None if io::stdin().is_terminal() => Lines::Terminal(Term::stderr()),
            None => Lines::Stdin(io::stdin()),
        };
        Self {
            lines,
            pending: VecDeque::new(),
            current: String::new(),
        }
    }

    /// Next command, or `None` once the source is exhausted.
    pub fn read(&mut self) -> Option<&str> {
        while self.pending.is_empty() {
            let line = self.lines.next_line()?;
            self.pending.extend(split_commands(&line));
        }
        self.current = self.pending.pop_front()?;

        // A terminal already shows what was typed
        if !matches!(self.lines, Lines::Terminal(_)) {
            dprintln!(Always, Special, "Command: {}", self.current.trim());
        }
        Some(&self.current)
    }
}

impl Lines {
    fn next_line(&mut self) -> Option<String> {
        match self {
            Self::Argument(lines) => lines.pop_front(),
            Self::Stdin(stdin) => {
                let mut line = String::new();
                match stdin.lock().read_line(&mut line) {
                    Ok(0) | Err(_) => None,
                    Ok(_) => Some(line.trim_end_matches(['\n', '\r']).to_string()),
                }
            }
            Self::Terminal(term) => {
                term.write_str(&style("Command: ").cyan().bold().to_string())
                    .ok()?;
                term.read_line().ok()
            }
        }
    }
}

/// `a;b` is two commands, a trailing `;` adds none.
fn split_commands(line: &str) -> Vec<String> {
    let commands: Vec<String> = line.split_terminator(';').map(str::to_string).collect();
    if commands.is_empty() {
        vec![String::new()]
    } else {
        commands
    }
}
