use std::fmt;
use std::str::FromStr;

use crate::error::{ParseError, ParseErrorKind};
use crate::loader::{SourceLine, Token};

/// Width of the accumulator, the index register and every memory cell.
pub type Word = i16;

/// Smallest literal accepted by the assembler.
pub const LITERAL_MIN: i32 = Word::MIN as i32;
/// Largest literal accepted by the assembler; values above `Word::MAX` wrap.
pub const LITERAL_MAX: i32 = u16::MAX as i32;

/// Every mnemonic understood by the machine.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Opcode {
    LDM,
    LDD,
    LDI,
    LDX,
    LDR,
    STO,
    STX,
    ADD,
    INC,
    DEC,
    CMP,
    JMP,
    JPE,
    JPN,
    AND,
    OR,
    XOR,
    LSL,
    LSR,
    IN,
    OUT,
    END,
}

impl Opcode {
    const ALL: [Opcode; 22] = [
        Opcode::LDM,
        Opcode::LDD,
        Opcode::LDI,
        Opcode::LDX,
        Opcode::LDR,
        Opcode::STO,
        Opcode::STX,
        Opcode::ADD,
        Opcode::INC,
        Opcode::DEC,
        Opcode::CMP,
        Opcode::JMP,
        Opcode::JPE,
        Opcode::JPN,
        Opcode::AND,
        Opcode::OR,
        Opcode::XOR,
        Opcode::LSL,
        Opcode::LSR,
        Opcode::IN,
        Opcode::OUT,
        Opcode::END,
    ];
}

impl FromStr for Opcode {
    type Err = ();

    // Mnemonics are case sensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Opcode::ALL
            .into_iter()
            .find(|op| op.to_string() == s)
            .ok_or(())
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Registers which may be named by `INC` and `DEC`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Register {
    /// Accumulator
    Acc,
    /// Index register
    Ix,
}

impl FromStr for Register {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACC" => Ok(Register::Acc),
            "IX" => Ok(Register::Ix),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::Acc => write!(f, "ACC"),
            Register::Ix => write!(f, "IX"),
        }
    }
}

/// Name of a label, without the trailing colon.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Label(String);

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Label(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Right-hand side of `CMP`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Comparand {
    Imm(Word),
    Label(Label),
}

/// A decoded instruction. Label operands refer to the cell *after* the label declaration.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Instruction {
    /// Load immediate into ACC
    Ldm(Word),
    /// Load immediate into IX
    Ldr(Word),
    /// Load direct
    Ldd(Label),
    /// Load indirect
    Ldi(Label),
    /// Load indexed
    Ldx(Label),
    /// Store direct
    Sto(Label),
    /// Store indexed
    Stx(Label),
    Add(Label),
    Inc(Register),
    Dec(Register),
    Cmp(Comparand),
    Jmp(Label),
    /// Jump if EQ is set
    Jpe(Label),
    /// Jump if EQ is clear
    Jpn(Label),
    And(Word),
    Or(Word),
    Xor(Word),
    Lsl(Word),
    Lsr(Word),
    In,
    Out,
    End,
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Ldm(_) => Opcode::LDM,
            Self::Ldr(_) => Opcode::LDR,
            Self::Ldd(_) => Opcode::LDD,
            Self::Ldi(_) => Opcode::LDI,
            Self::Ldx(_) => Opcode::LDX,
            Self::Sto(_) => Opcode::STO,
            Self::Stx(_) => Opcode::STX,
            Self::Add(_) => Opcode::ADD,
            Self::Inc(_) => Opcode::INC,
            Self::Dec(_) => Opcode::DEC,
            Self::Cmp(_) => Opcode::CMP,
            Self::Jmp(_) => Opcode::JMP,
            Self::Jpe(_) => Opcode::JPE,
            Self::Jpn(_) => Opcode::JPN,
            Self::And(_) => Opcode::AND,
            Self::Or(_) => Opcode::OR,
            Self::Xor(_) => Opcode::XOR,
            Self::Lsl(_) => Opcode::LSL,
            Self::Lsr(_) => Opcode::LSR,
            Self::In => Opcode::IN,
            Self::Out => Opcode::OUT,
            Self::End => Opcode::END,
        }
    }

    /// Label referenced by the operand, if any.
    pub fn label(&self) -> Option<&Label> {
        match self {
            Self::Ldd(label)
            | Self::Ldi(label)
            | Self::Ldx(label)
            | Self::Sto(label)
            | Self::Stx(label)
            | Self::Add(label)
            | Self::Jmp(label)
            | Self::Jpe(label)
            | Self::Jpn(label)
            | Self::Cmp(Comparand::Label(label)) => Some(label),
            _ => None,
        }
    }

    /// Decode an instruction from its opcode token and the tokens following it.
    pub fn decode(opcode: Opcode, op_tok: &Token, operands: &[Token]) -> Result<Self, ParseError> {
        let mut rest = operands.iter();
        let operand = rest.next();
        if let Some(extra) = rest.next() {
            return Err(ParseError::new(
                ParseErrorKind::UnexpectedOperand {
                    opcode,
                    found: extra.val.clone(),
                },
                extra.span,
            ));
        }

        let operand = Operand {
            opcode,
            op_tok,
            tok: operand,
        };

        let instr = match opcode {
            Opcode::LDM => Self::Ldm(operand.imm()?),
            Opcode::LDR => Self::Ldr(operand.imm()?),
            Opcode::LDD => Self::Ldd(operand.label()?),
            Opcode::LDI => Self::Ldi(operand.label()?),
            Opcode::LDX => Self::Ldx(operand.label()?),
            Opcode::STO => Self::Sto(operand.label()?),
            Opcode::STX => Self::Stx(operand.label()?),
            Opcode::ADD => Self::Add(operand.label()?),
            Opcode::INC => Self::Inc(operand.register()?),
            Opcode::DEC => Self::Dec(operand.register()?),
            Opcode::CMP => {
                if operand.required()?.val.starts_with('#') {
                    Self::Cmp(Comparand::Imm(operand.imm()?))
                } else {
                    Self::Cmp(Comparand::Label(operand.label()?))
                }
            }
            Opcode::JMP => Self::Jmp(operand.label()?),
            Opcode::JPE => Self::Jpe(operand.label()?),
            Opcode::JPN => Self::Jpn(operand.label()?),
            Opcode::AND => Self::And(operand.imm()?),
            Opcode::OR => Self::Or(operand.imm()?),
            Opcode::XOR => Self::Xor(operand.imm()?),
            Opcode::LSL => Self::Lsl(operand.shift()?),
            Opcode::LSR => Self::Lsr(operand.shift()?),
            Opcode::IN => operand.none(Self::In)?,
            Opcode::OUT => operand.none(Self::Out)?,
            Opcode::END => operand.none(Self::End)?,
        };
        Ok(instr)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode())?;
        match self {
            Self::Ldm(n)
            | Self::Ldr(n)
            | Self::And(n)
            | Self::Or(n)
            | Self::Xor(n)
            | Self::Lsl(n)
            | Self::Lsr(n)
            | Self::Cmp(Comparand::Imm(n)) => write!(f, " #{}", n),
            Self::Inc(reg) | Self::Dec(reg) => write!(f, " {}", reg),
            Self::In | Self::Out | Self::End => Ok(()),
            _ => match self.label() {
                Some(label) => write!(f, " {}", label),
                None => Ok(()),
            },
        }
    }
}

/// Single operand slot of an instruction being decoded.
struct Operand<'a> {
    opcode: Opcode,
    op_tok: &'a Token,
    tok: Option<&'a Token>,
}

impl<'a> Operand<'a> {
    fn required(&self) -> Result<&'a Token, ParseError> {
        self.tok.ok_or_else(|| {
            ParseError::new(
                ParseErrorKind::MissingOperand {
                    opcode: self.opcode,
                },
                self.op_tok.span,
            )
        })
    }

    fn none(&self, instr: Instruction) -> Result<Instruction, ParseError> {
        match self.tok {
            None => Ok(instr),
            Some(tok) => Err(ParseError::new(
                ParseErrorKind::UnexpectedOperand {
                    opcode: self.opcode,
                    found: tok.val.clone(),
                },
                tok.span,
            )),
        }
    }

    fn imm(&self) -> Result<Word, ParseError> {
        let tok = self.required()?;
        parse_immediate(&tok.val, self.opcode).map_err(|kind| ParseError::new(kind, tok.span))
    }

    fn shift(&self) -> Result<Word, ParseError> {
        let amount = self.imm()?;
        if amount < 0 {
            let tok = self.required()?;
            return Err(ParseError::new(
                ParseErrorKind::NegativeShift {
                    opcode: self.opcode,
                },
                tok.span,
            ));
        }
        Ok(amount)
    }

    fn label(&self) -> Result<Label, ParseError> {
        let tok = self.required()?;
        if tok.val.starts_with('#') || tok.val.ends_with(':') {
            return Err(ParseError::new(
                ParseErrorKind::ExpectedLabel {
                    opcode: self.opcode,
                    found: tok.val.clone(),
                },
                tok.span,
            ));
        }
        Ok(Label::new(tok.val.as_str()))
    }

    fn register(&self) -> Result<Register, ParseError> {
        let tok = self.required()?;
        tok.val.parse().map_err(|()| {
            ParseError::new(
                ParseErrorKind::ExpectedRegister {
                    opcode: self.opcode,
                    found: tok.val.clone(),
                },
                tok.span,
            )
        })
    }
}

/// Parse an immediate operand such as `#12`, `#-3`, `#B1010` or `#&FF`.
pub fn parse_immediate(tok: &str, opcode: Opcode) -> Result<Word, ParseErrorKind> {
    let Some(body) = tok.strip_prefix('#') else {
        return Err(ParseErrorKind::ExpectedImmediate {
            opcode,
            found: tok.to_string(),
        });
    };
    let (digits, radix) = if let Some(bin) = body.strip_prefix(['B', 'b']) {
        (bin, 2)
    } else if let Some(hex) = body.strip_prefix('&') {
        (hex, 16)
    } else {
        (body, 10)
    };
    let value = i32::from_str_radix(digits, radix).map_err(|_| ParseErrorKind::InvalidLiteral {
        found: tok.to_string(),
    })?;
    to_word(value).ok_or_else(|| ParseErrorKind::LiteralOutOfRange {
        found: tok.to_string(),
    })
}

/// Parse a bare decimal data value such as `42` or `-7`.
fn parse_data(tok: &str) -> Option<Word> {
    tok.parse::<i32>().ok().and_then(to_word)
}

fn to_word(value: i32) -> Option<Word> {
    if (LITERAL_MIN..=LITERAL_MAX).contains(&value) {
        // Reinterpret unsigned literals as their 16-bit pattern
        Some(value as u16 as Word)
    } else {
        None
    }
}

/// One slot of the program store.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Cell {
    Instr(Instruction),
    /// Declaration line; holds no executable opcode
    Label(Label),
    /// Numeric data, either from the source or written by `STO`/`STX`
    Value(Word),
    /// Tokens which are neither an instruction, a label nor a value
    Raw(Vec<String>),
}

impl Cell {
    /// Decode a tokenized source line into a cell.
    pub fn decode(line: &SourceLine) -> Result<Cell, ParseError> {
        let tokens = &line.tokens;
        let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
            return Ok(Cell::Raw(Vec::new()));
        };

        // The last token decides, whatever comes before it
        if let Some(name) = last.val.strip_suffix(':') {
            return Ok(Cell::Label(Label::new(name)));
        }
        if tokens.len() == 1 {
            if let Some(value) = parse_data(&first.val) {
                return Ok(Cell::Value(value));
            }
        }

        match first.val.parse::<Opcode>() {
            Ok(opcode) => Ok(Cell::Instr(Instruction::decode(
                opcode,
                first,
                &tokens[1..],
            )?)),
            Err(()) => Ok(Cell::raw(tokens)),
        }
    }

    fn raw(tokens: &[Token]) -> Cell {
        Cell::Raw(tokens.iter().map(|tok| tok.val.clone()).collect())
    }

    /// Numeric contents of the cell, if it holds a value.
    pub fn value(&self) -> Option<Word> {
        match self {
            Cell::Value(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Instr(instr) => write!(f, "{}", instr),
            Cell::Label(label) => write!(f, "{}:", label),
            Cell::Value(value) => write!(f, "{}", value),
            Cell::Raw(tokens) => write!(f, "{}", tokens.join(" ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::tokenize;

    fn decode(src: &str) -> Result<Cell, ParseError> {
        let lines = tokenize(src);
        Cell::decode(&lines[0])
    }

    #[test]
    fn opcode_names_round_trip() {
        for op in Opcode::ALL {
            assert_eq!(op.to_string().parse::<Opcode>(), Ok(op));
        }
        assert_eq!("ldm".parse::<Opcode>(), Err(()));
    }

    #[test]
    fn immediate_literals() {
        assert_eq!(parse_immediate("#12", Opcode::LDM), Ok(12));
        assert_eq!(parse_immediate("#-3", Opcode::LDM), Ok(-3));
        assert_eq!(parse_immediate("#B1010", Opcode::LDM), Ok(10));
        assert_eq!(parse_immediate("#&FF", Opcode::LDM), Ok(255));
        assert_eq!(parse_immediate("#&FFFF", Opcode::LDM), Ok(-1));
        assert_eq!(parse_immediate("#65535", Opcode::LDM), Ok(-1));
        assert!(matches!(
            parse_immediate("#65536", Opcode::LDM),
            Err(ParseErrorKind::LiteralOutOfRange { .. })
        ));
        assert!(matches!(
            parse_immediate("#-32769", Opcode::LDM),
            Err(ParseErrorKind::LiteralOutOfRange { .. })
        ));
        assert!(matches!(
            parse_immediate("#abc", Opcode::LDM),
            Err(ParseErrorKind::InvalidLiteral { .. })
        ));
        assert!(matches!(
            parse_immediate("12", Opcode::LDM),
            Err(ParseErrorKind::ExpectedImmediate { .. })
        ));
    }

    #[test]
    fn decodes_cells() {
        assert_eq!(decode("LDM #5"), Ok(Cell::Instr(Instruction::Ldm(5))));
        assert_eq!(
            decode("LDD NUM"),
            Ok(Cell::Instr(Instruction::Ldd(Label::new("NUM"))))
        );
        assert_eq!(
            decode("INC IX"),
            Ok(Cell::Instr(Instruction::Inc(Register::Ix)))
        );
        assert_eq!(
            decode("CMP #0"),
            Ok(Cell::Instr(Instruction::Cmp(Comparand::Imm(0))))
        );
        assert_eq!(
            decode("CMP NUM"),
            Ok(Cell::Instr(Instruction::Cmp(Comparand::Label(Label::new(
                "NUM"
            )))))
        );
        assert_eq!(decode("END"), Ok(Cell::Instr(Instruction::End)));
        assert_eq!(decode("LOOP:"), Ok(Cell::Label(Label::new("LOOP"))));
        assert_eq!(decode("-7"), Ok(Cell::Value(-7)));
        assert_eq!(
            decode("HALT now"),
            Ok(Cell::Raw(vec!["HALT".into(), "now".into()]))
        );
        assert_eq!(decode("MY LOOP:"), Ok(Cell::Label(Label::new("LOOP"))));
        // A colon token followed by more tokens is left for the label pass
        assert_eq!(
            decode("LOOP: INC ACC"),
            Ok(Cell::Raw(vec!["LOOP:".into(), "INC".into(), "ACC".into()]))
        );
    }

    #[test]
    fn rejects_bad_operands() {
        let err = decode("LDM 5").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::ExpectedImmediate { .. }));

        let err = decode("LDD").unwrap_err();
        assert!(matches!(
            err.kind,
            ParseErrorKind::MissingOperand {
                opcode: Opcode::LDD
            }
        ));

        let err = decode("LDD #4").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::ExpectedLabel { .. }));

        let err = decode("INC R1").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::ExpectedRegister { .. }));

        let err = decode("END NOW").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnexpectedOperand { .. }));

        let err = decode("ADD A B").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::UnexpectedOperand { .. }));

        let err = decode("LSL #-1").unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::NegativeShift { .. }));
    }

    #[test]
    fn error_span_points_at_operand() {
        let src = "LDM 5";
        let err = decode(src).unwrap_err();
        assert_eq!(&src[err.span.as_range()], "5");
    }

    #[test]
    fn display_matches_source_form() {
        for src in ["LDM #5", "LDD NUM", "INC ACC", "CMP #-2", "JPN LOOP", "OUT"] {
            assert_eq!(decode(src).unwrap().to_string(), src);
        }
        assert_eq!(decode("LOOP:").unwrap().to_string(), "LOOP:");
    }
}
