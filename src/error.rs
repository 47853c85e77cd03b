use std::{error::Error, fmt};

use miette::{miette, LabeledSpan, Report, Severity};

use crate::instr::{Label, Opcode};
use crate::span::Span;
use crate::Program;

/// Error decoding a single source line.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// Offending token
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParseErrorKind {
    ExpectedImmediate { opcode: Opcode, found: String },
    ExpectedLabel { opcode: Opcode, found: String },
    ExpectedRegister { opcode: Opcode, found: String },
    MissingOperand { opcode: Opcode },
    UnexpectedOperand { opcode: Opcode, found: String },
    InvalidLiteral { found: String },
    LiteralOutOfRange { found: String },
    NegativeShift { opcode: Opcode },
}

/// Error found while building the label table. Nothing has been executed yet.
#[derive(Clone, Debug, PartialEq)]
pub enum LabelFormatError {
    /// A `NAME:` token is followed by more tokens on the same line.
    NotAlone { index: usize, token: String },
    /// A bare `:`.
    EmptyName { index: usize },
    /// An instruction refers to a label which is never declared.
    Undefined { index: usize, label: Label },
}

/// Computed address does not name a usable value.
#[derive(Clone, Debug, PartialEq)]
pub enum AddressError {
    OutOfRange { addr: i64, len: usize },
    NotAValue { addr: usize, cell: String },
}

/// Failure of one instruction. Aborts the run.
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeError {
    /// Address of the failing cell
    pub pc: usize,
    /// Failing cell, as it would be listed
    pub instr: String,
    pub kind: RuntimeErrorKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RuntimeErrorKind {
    Address(AddressError),
    /// The cell at PC holds data or unrecognised tokens.
    UnknownOpcode { found: String },
    UndefinedLabel(Label),
    /// `IN` found no more input.
    InputExhausted,
    /// Character cannot be stored in, or produced from, a word.
    InvalidCharacter { value: i64 },
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

impl LabelFormatError {
    /// Program store index of the offending cell.
    pub fn index(&self) -> usize {
        match self {
            Self::NotAlone { index, .. }
            | Self::EmptyName { index }
            | Self::Undefined { index, .. } => *index,
        }
    }
}

impl From<AddressError> for RuntimeErrorKind {
    fn from(error: AddressError) -> Self {
        RuntimeErrorKind::Address(error)
    }
}

impl Error for ParseError {}
impl Error for LabelFormatError {}
impl Error for AddressError {}
impl Error for RuntimeError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExpectedImmediate { opcode, found } => {
                write!(f, "`{}` expects an immediate like #5, found `{}`", opcode, found)
            }
            Self::ExpectedLabel { opcode, found } => {
                write!(f, "`{}` expects a label, found `{}`", opcode, found)
            }
            Self::ExpectedRegister { opcode, found } => {
                write!(f, "`{}` expects ACC or IX, found `{}`", opcode, found)
            }
            Self::MissingOperand { opcode } => write!(f, "`{}` is missing its operand", opcode),
            Self::UnexpectedOperand { opcode, found } => {
                write!(f, "unexpected operand `{}` after `{}`", found, opcode)
            }
            Self::InvalidLiteral { found } => write!(f, "invalid literal `{}`", found),
            Self::LiteralOutOfRange { found } => {
                write!(f, "literal `{}` does not fit in 16 bits", found)
            }
            Self::NegativeShift { opcode } => {
                write!(f, "`{}` cannot shift by a negative amount", opcode)
            }
        }
    }
}

impl fmt::Display for LabelFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAlone { index, token } => write!(
                f,
                "label `{}` at address {} must be the last token on its line",
                token, index
            ),
            Self::EmptyName { index } => write!(f, "label at address {} has no name", index),
            Self::Undefined { index, label } => write!(
                f,
                "instruction at address {} refers to undefined label `{}`",
                index, label
            ),
        }
    }
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { addr, len } => write!(
                f,
                "address {} is outside of memory (0 to {})",
                addr,
                len.saturating_sub(1)
            ),
            Self::NotAValue { addr, cell } => {
                write!(f, "address {} holds `{}`, not a number", addr, cell)
            }
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` at address {}: {}", self.instr, self.pc, self.kind)
    }
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(error) => write!(f, "{}", error),
            Self::UnknownOpcode { found } => write!(f, "`{}` is not an instruction", found),
            Self::UndefinedLabel(label) => write!(f, "undefined label `{}`", label),
            Self::InputExhausted => write!(f, "no input left to read"),
            Self::InvalidCharacter { value } => {
                write!(f, "{} is not a valid character code", value)
            }
        }
    }
}

// Diagnostics

pub fn parse_report(error: &ParseError, src: &str) -> Report {
    let help = match error.kind {
        ParseErrorKind::InvalidLiteral { .. } | ParseErrorKind::LiteralOutOfRange { .. } => {
            "ranges from -32,768 to 32,767 or 0 to 65,535 are allowed, written as #n, #Bn or #&n"
        }
        ParseErrorKind::ExpectedImmediate { .. } => "make sure that your immediates start with #",
        ParseErrorKind::ExpectedRegister { .. } => "only ACC and IX can be incremented",
        _ => "check the operands for this instruction",
    };
    miette!(
        severity = Severity::Error,
        code = "parse::operand",
        help = help,
        labels = vec![LabeledSpan::at(error.span, "here")],
        "{}",
        error.kind
    )
    .with_source_code(src.to_string())
}

pub fn label_report(error: &LabelFormatError, program: &Program, src: &str) -> Report {
    let (code, help, label) = match error {
        LabelFormatError::NotAlone { .. } => (
            "label::not_alone",
            "put the label at the end of its line, like `LOOP:`",
            "tokens follow the label",
        ),
        LabelFormatError::EmptyName { .. } => (
            "label::empty",
            "give the label a name before the colon",
            "empty label",
        ),
        LabelFormatError::Undefined { .. } => (
            "label::undefined",
            "declare the label on its own line, ending with `:`",
            "undefined label",
        ),
    };
    let labels = program
        .span(error.index())
        .map(|span| vec![LabeledSpan::at(span, label)])
        .unwrap_or_default();
    miette!(
        severity = Severity::Error,
        code = code,
        help = help,
        labels = labels,
        "{}",
        error
    )
    .with_source_code(src.to_string())
}

pub fn runtime_report(error: &RuntimeError, program: &Program, src: &str) -> Report {
    let help = match &error.kind {
        RuntimeErrorKind::Address(_) => {
            "labels refer to the line after their declaration; check the data stored there"
        }
        RuntimeErrorKind::UnknownOpcode { .. } => {
            "execution ran into data; make sure an `END` comes before your data lines"
        }
        RuntimeErrorKind::InputExhausted => "supply more input with `--input`",
        _ => "check the value of ACC before this instruction",
    };
    let labels = program
        .span(error.pc)
        .map(|span| vec![LabeledSpan::at(span, format!("failed at address {}", error.pc))])
        .unwrap_or_default();
    miette!(
        severity = Severity::Error,
        code = "runtime",
        help = help,
        labels = labels,
        "{}",
        error
    )
    .with_source_code(src.to_string())
}
