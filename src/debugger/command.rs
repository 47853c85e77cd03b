use std::{error::Error, fmt};

/// Command accepted at the step prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Execute the pending instruction and pause again.
    Step,
    /// Execute the rest of the program without pausing.
    Continue,
    /// End the run now.
    Exit,
    Registers,
    Memory,
    Labels,
    Program,
    Help,
}

/// Error parsing a command.
#[derive(Debug, PartialEq)]
pub enum CommandError {
    InvalidCommand { command_name: String },
    TooManyArguments { command_name: &'static str },
}

impl Error for CommandError {}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCommand { command_name } => {
                write!(f, "Not a command: `{}`", command_name)
            }
            Self::TooManyArguments { command_name } => {
                write!(f, "Command `{}` takes no arguments", command_name)
            }
        }
    }
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Step => "step",
            Self::Continue => "continue",
            Self::Exit => "exit",
            Self::Registers => "registers",
            Self::Memory => "memory",
            Self::Labels => "labels",
            Self::Program => "program",
            Self::Help => "help",
        }
    }
}

impl TryFrom<&str> for Command {
    type Error = CommandError;

    /// An empty line steps.
    fn try_from(line: &str) -> Result<Self, Self::Error> {
        let mut words = line.split_whitespace();
        let Some(command_name) = words.next() else {
            return Ok(Command::Step);
        };

        let command = match command_name.to_lowercase().as_str() {
            "s" | "step" => Command::Step,
            "x" | "c" | "continue" => Command::Continue,
            "q" | "exit" | "quit" => Command::Exit,
            "r" | "registers" => Command::Registers,
            "m" | "memory" => Command::Memory,
            "l" | "labels" => Command::Labels,
            "p" | "program" => Command::Program,
            "h" | "help" => Command::Help,
            _ => {
                return Err(CommandError::InvalidCommand {
                    command_name: command_name.to_string(),
                })
            }
        };

        if words.next().is_some() {
            return Err(CommandError::TooManyArguments {
                command_name: command.name(),
            });
        }
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!(Command::try_from(""), Ok(Command::Step));
        assert_eq!(Command::try_from("   "), Ok(Command::Step));
        assert_eq!(Command::try_from("s"), Ok(Command::Step));
        assert_eq!(Command::try_from("x"), Ok(Command::Continue));
        assert_eq!(Command::try_from(" Continue "), Ok(Command::Continue));
        assert_eq!(Command::try_from("q"), Ok(Command::Exit));
        assert_eq!(Command::try_from("registers"), Ok(Command::Registers));
        assert_eq!(Command::try_from("m"), Ok(Command::Memory));
        assert_eq!(Command::try_from("labels"), Ok(Command::Labels));
        assert_eq!(Command::try_from("program"), Ok(Command::Program));
        assert_eq!(Command::try_from("h"), Ok(Command::Help));
    }

    #[test]
    fn rejects_unknown_and_extra() {
        assert_eq!(
            Command::try_from("jump 4"),
            Err(CommandError::InvalidCommand {
                command_name: "jump".into()
            })
        );
        assert_eq!(
            Command::try_from("step 4"),
            Err(CommandError::TooManyArguments {
                command_name: "step"
            })
        );
        assert_eq!(
            CommandError::InvalidCommand {
                command_name: "jump".into()
            }
            .to_string(),
            "Not a command: `jump`"
        );
    }
}
