// Loading
pub mod loader;
pub mod span;
pub mod instr;
mod store;
pub use store::{Program, ProgramStore};

// Running
mod runtime;
pub use runtime::{BufferIo, ConsoleIo, Flow, Halt, Io, RunEnvironment};
mod debugger;
pub use debugger::DebuggerOptions;
mod state;
pub use state::MachineState;
pub mod output;

mod symbol;
pub use symbol::LabelTable;

pub mod error;

pub mod env;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 8;
