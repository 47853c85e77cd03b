use std::cell::RefCell;
use std::fmt::Write as _;
use std::str::Chars;

use colored::{ColoredString, Colorize};

use crate::instr::{Cell, Instruction, Word};
use crate::state::MachineState;
use crate::store::ProgramStore;
use crate::symbol::LabelTable;

#[macro_export]
macro_rules! print_char {
    ( $ch:expr ) => {{
        $crate::output::Output::Normal.print_char($ch);
    }};
}

#[macro_export]
macro_rules! dprint {
    ( $cond:expr, $category:expr, $fmt:literal $($tt:tt)* ) => {{
        #[allow(unused_imports)]
        use $crate::output::Condition::*;
        #[allow(unused_imports)]
        use $crate::output::Category::*;
        let s = format!(
            $fmt
            $($tt)*
        );
        $crate::output::Output::Debugger($cond, $category).print_str(&s);
    }};
}

#[macro_export]
macro_rules! dprintln {
    ( $cond:expr ) => {{
        #[allow(unused_imports)]
        use $crate::output::Condition::*;
        $crate::output::Output::Debugger($cond, Default::default()).print_str("\n");
    }};
    ( $cond:expr, $category:expr, $fmt:literal $($tt:tt)* ) => {{
        #[allow(unused_imports)]
        use $crate::output::Condition::*;
        #[allow(unused_imports)]
        use $crate::output::Category::*;
        let s = format!(
            concat!($fmt, "\n")
            $($tt)*
        );
        $crate::output::Output::Debugger($cond, $category).print_str(&s);
    }};
}

/// Program output goes to stdout, everything the tool says about the program goes to stderr.
#[derive(Clone, Copy, Debug)]
pub enum Output {
    Normal,
    Debugger(Condition, Category),
}

/// Whether a message survives `--minimal`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    Always,
    Sometimes,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Category {
    #[default]
    Normal,
    Info,
    Warning,
    Error,
    Special,
}

/// Base used to display registers and memory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Radix {
    #[default]
    Decimal,
    /// 16-bit two's complement pattern
    Binary,
}

struct Decolored<'a> {
    chars: Chars<'a>,
}

impl Output {
    thread_local! {
        static IS_LINE_START: RefCell<bool> = const { RefCell::new(true) };
        static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
    }

    pub fn set_line_start(new_value: bool) -> bool {
        Self::IS_LINE_START.with(|value| value.replace(new_value))
    }
    /// Private. Use [`Output::start_new_line`].
    fn is_line_start() -> bool {
        Self::IS_LINE_START.with(|value| *value.borrow())
    }
    pub fn set_minimal(new_value: bool) -> bool {
        Self::IS_MINIMAL.with(|value| value.replace(new_value))
    }
    pub fn is_minimal() -> bool {
        Self::IS_MINIMAL.with(|value| *value.borrow())
    }

    fn set_line_start_from_str(string: &str) {
        let last = Decolored::new(string).last();
        if let Some(ch) = last {
            Output::set_line_start(ch == '\n');
        }
    }

    pub fn print_char(&self, ch: char) {
        match self {
            Self::Normal => {
                print!("{}", ch)
            }
            Self::Debugger(..) => {
                eprint!("{}", ch);
            }
        }
        Output::set_line_start(ch == '\n');
    }

    pub fn print_str(&self, string: &str) {
        match self {
            Self::Normal => {
                print!("{}", string);
                Self::set_line_start_from_str(string);
            }

            Self::Debugger(condition, category) => match (Self::is_minimal(), *condition) {
                (false, _) => {
                    eprint!("{}", category.paint(string));
                    Self::set_line_start_from_str(string);
                }
                // Always remove color if `--minimal`
                (true, Condition::Always) => {
                    eprint_colorless(string);
                    Self::set_line_start_from_str(string);
                }
                (true, Condition::Sometimes) => (),
            },
        }
    }

    pub fn start_new_line(&self) {
        if !Self::is_line_start() {
            self.print_char('\n');
        }
    }

    pub fn print_cpu(&self, state: &MachineState, radix: Radix) {
        self.print_str(&render_cpu(state, radix));
    }

    pub fn print_memory(&self, store: &ProgramStore, radix: Radix) {
        self.print_str(&render_memory(store, radix));
    }

    pub fn print_program(&self, store: &ProgramStore) {
        self.print_str(&render_program(store));
    }

    pub fn print_labels(&self, labels: &LabelTable) {
        self.print_str(&render_labels(labels));
    }
}

impl Category {
    fn paint(&self, string: &str) -> ColoredString {
        let string = ColoredString::from(string);
        match self {
            Self::Normal => string,
            Self::Info => string.blue(),
            Self::Warning => string.yellow(),
            Self::Error => string.red(),
            Self::Special => string.cyan().bold(),
        }
    }
}

pub fn format_word(value: Word, radix: Radix) -> String {
    match radix {
        Radix::Decimal => value.to_string(),
        Radix::Binary => format!("{:016b}", value as u16),
    }
}

pub fn format_flag(flag: bool, radix: Radix) -> String {
    match radix {
        Radix::Decimal => flag.to_string(),
        Radix::Binary => (flag as u8).to_string(),
    }
}

fn format_cell(cell: &Cell, radix: Radix) -> String {
    match cell {
        Cell::Value(value) => format_word(*value, radix),
        _ => cell.to_string(),
    }
}

pub fn render_cpu(state: &MachineState, radix: Radix) -> String {
    let mut out = String::new();
    // Writing to a `String` cannot fail
    let _ = writeln!(out, "\x1b[1mProgram Counter:\x1b[0m {}", state.pc());
    let _ = writeln!(out);
    let _ = writeln!(out, "\x1b[1mRegisters:\x1b[0m");
    let _ = writeln!(out, "ACC : {}", format_word(state.acc(), radix));
    let _ = writeln!(out, "IX : {}", format_word(state.ix(), radix));
    let _ = writeln!(out);
    let _ = writeln!(out, "\x1b[1mComparison States:\x1b[0m");
    let _ = writeln!(out, "EQ : {}", format_flag(state.eq(), radix));
    out
}

/// Data region: every cell after the first `END`, or the whole store without one.
pub fn render_memory(store: &ProgramStore, radix: Radix) -> String {
    let start = store
        .iter()
        .position(|cell| matches!(cell, Cell::Instr(Instruction::End)))
        .map(|end| end + 1)
        .unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(out, "\x1b[1mMemory:\x1b[0m");
    for (addr, cell) in store.iter().enumerate().skip(start) {
        let _ = writeln!(out, "\x1b[2m{:>4}\x1b[0m  {}", addr, format_cell(cell, radix));
    }
    out
}

pub fn render_program(store: &ProgramStore) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\x1b[1mProgram:\x1b[0m");
    for (addr, cell) in store.iter().enumerate() {
        let indent = if matches!(cell, Cell::Label(_)) { "" } else { "  " };
        let _ = writeln!(out, "\x1b[2m{:>4}\x1b[0m  {}{}", addr, indent, cell);
    }
    out
}

pub fn render_labels(labels: &LabelTable) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\x1b[1mLabels:\x1b[0m");
    for (name, index) in labels.iter() {
        let _ = writeln!(out, "{} : {}", name, index);
    }
    out
}

impl<'a> Decolored<'a> {
    pub fn new(string: &'a str) -> Self {
        Self {
            chars: string.chars(),
        }
    }
}

impl<'a> Iterator for Decolored<'a> {
    type Item = char;
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(ch) = self.chars.next() {
            // Skip everything between '\x1b' and 'm' (inclusive)
            if ch == '\x1b' {
                while self.chars.next().is_some_and(|ch| ch != 'm') {}
                continue;
            }
            return Some(ch);
        }
        None
    }
}

/// Remove terminal escape sequences.
pub fn decolor(string: &str) -> String {
    Decolored::new(string).collect()
}

fn eprint_colorless(string: &str) {
    eprint!("{}", decolor(string));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Program;

    #[test]
    fn decolored() {
        assert_eq!(Decolored::new("abcdef").collect::<String>(), "abcdef");
        assert_eq!(
            Decolored::new("abc\x1b[0;2mdef\x1b[0m").collect::<String>(),
            "abcdef"
        );
        assert_eq!(Decolored::new("abc\x1b[0xyz").collect::<String>(), "abc");
        assert_eq!(
            Decolored::new("abc\x1bw[0bxyzmdef").collect::<String>(),
            "abcdef"
        );
    }

    #[test]
    fn words_in_both_radixes() {
        assert_eq!(format_word(5, Radix::Decimal), "5");
        assert_eq!(format_word(-1, Radix::Decimal), "-1");
        assert_eq!(format_word(5, Radix::Binary), "0000000000000101");
        assert_eq!(format_word(-1, Radix::Binary), "1111111111111111");
        assert_eq!(format_flag(true, Radix::Binary), "1");
        assert_eq!(format_flag(false, Radix::Decimal), "false");
    }

    #[test]
    fn cpu_view() {
        let cpu = decolor(&render_cpu(&MachineState::default(), Radix::Decimal));
        assert_eq!(
            cpu,
            "Program Counter: 0\n\nRegisters:\nACC : 0\nIX : 0\n\nComparison States:\nEQ : false\n"
        );
    }

    #[test]
    fn memory_view_starts_after_end() {
        let store = Program::parse("LDM #1\nEND\nNUM:\n42\n").unwrap().store();
        let memory = decolor(&render_memory(&store, Radix::Decimal));
        assert_eq!(memory, "Memory:\n   2  NUM:\n   3  42\n");

        let memory = decolor(&render_memory(&store, Radix::Binary));
        assert!(memory.ends_with("   3  0000000000101010\n"));
    }

    #[test]
    fn memory_view_without_end_shows_everything() {
        let store = Program::parse("LDM #1\n7\n").unwrap().store();
        let memory = decolor(&render_memory(&store, Radix::Decimal));
        assert_eq!(memory, "Memory:\n   0  LDM #1\n   1  7\n");
    }

    #[test]
    fn program_listing_indents_instructions() {
        let store = Program::parse("LOOP:\nJMP LOOP\n").unwrap().store();
        let listing = decolor(&render_program(&store));
        assert_eq!(listing, "Program:\n   0  LOOP:\n   1    JMP LOOP\n");
    }
}
