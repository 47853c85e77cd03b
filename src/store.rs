use std::ops::Index;

use crate::error::{AddressError, ParseError};
use crate::instr::{Cell, Word};
use crate::loader::{tokenize, SourceLine};
use crate::span::Span;

/// Decoded program, together with where each cell came from in the source.
///
/// A `Program` is never executed directly; every run takes a fresh [`ProgramStore`] from it.
#[derive(Clone, Debug, Default)]
pub struct Program {
    cells: Vec<Cell>,
    spans: Vec<Span>,
}

impl Program {
    /// Tokenize and decode source text.
    pub fn parse(src: &str) -> Result<Self, ParseError> {
        Self::from_lines(&tokenize(src))
    }

    /// Decode already tokenized lines. Immediates must keep their `#` marker.
    pub fn from_lines(lines: &[SourceLine]) -> Result<Self, ParseError> {
        let mut program = Program::default();
        for line in lines {
            program.cells.push(Cell::decode(line)?);
            program.spans.push(line.span());
        }
        Ok(program)
    }

    /// Source span of the cell at `index`.
    pub fn span(&self, index: usize) -> Option<Span> {
        self.spans.get(index).copied()
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Fresh memory image for a single run.
    pub fn store(&self) -> ProgramStore {
        ProgramStore::from(self.cells.clone())
    }
}

/// Memory of the machine. Holds the program listing and any data it reads or writes.
///
/// Indices never change during a run. The store only grows, through [`ProgramStore::grow_to`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgramStore {
    cells: Vec<Cell>,
}

impl ProgramStore {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, addr: usize) -> Option<&Cell> {
        self.cells.get(addr)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// Check that a computed address is inside the store.
    pub fn address(&self, addr: i64) -> Result<usize, AddressError> {
        usize::try_from(addr)
            .ok()
            .filter(|addr| *addr < self.len())
            .ok_or(AddressError::OutOfRange {
                addr,
                len: self.len(),
            })
    }

    /// Numeric value held at `addr`.
    pub fn value(&self, addr: i64) -> Result<Word, AddressError> {
        let addr = self.address(addr)?;
        let cell = &self.cells[addr];
        cell.value().ok_or_else(|| AddressError::NotAValue {
            addr,
            cell: cell.to_string(),
        })
    }

    /// Overwrite the cell at `addr` with a value, whatever it held before.
    pub fn set_value(&mut self, addr: i64, value: Word) -> Result<(), AddressError> {
        let addr = self.address(addr)?;
        self.cells[addr] = Cell::Value(value);
        Ok(())
    }

    /// Extend the store with zero cells until `addr` is a valid address.
    ///
    /// Negative addresses are left for [`ProgramStore::address`] to reject.
    pub fn grow_to(&mut self, addr: i64) {
        if let Ok(addr) = usize::try_from(addr) {
            if addr >= self.cells.len() {
                self.cells.resize(addr + 1, Cell::Value(0));
            }
        }
    }
}

impl From<Vec<Cell>> for ProgramStore {
    fn from(cells: Vec<Cell>) -> Self {
        Self { cells }
    }
}

impl Index<usize> for ProgramStore {
    type Output = Cell;
    fn index(&self, addr: usize) -> &Self::Output {
        &self.cells[addr]
    }
}

impl<'a> IntoIterator for &'a ProgramStore {
    type Item = &'a Cell;
    type IntoIter = std::slice::Iter<'a, Cell>;
    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::Instruction;

    fn store() -> ProgramStore {
        Program::parse("LDM #1\nEND\nNUM:\n42\n").unwrap().store()
    }

    #[test]
    fn reads_values() {
        let store = store();
        assert_eq!(store.value(3), Ok(42));
        assert_eq!(
            store.value(1),
            Err(AddressError::NotAValue {
                addr: 1,
                cell: "END".into()
            })
        );
        assert_eq!(
            store.value(4),
            Err(AddressError::OutOfRange { addr: 4, len: 4 })
        );
        assert_eq!(
            store.value(-1),
            Err(AddressError::OutOfRange { addr: -1, len: 4 })
        );
    }

    #[test]
    fn writes_replace_instructions() {
        let mut store = store();
        store.set_value(0, 9).unwrap();
        assert_eq!(store[0], Cell::Value(9));
        assert_eq!(store[1], Cell::Instr(Instruction::End));
        assert!(store.set_value(10, 1).is_err());
    }

    #[test]
    fn grows_with_zero_cells() {
        let mut store = store();
        store.grow_to(6);
        assert_eq!(store.len(), 7);
        assert_eq!(store.value(5), Ok(0));
        assert_eq!(store.value(6), Ok(0));

        // Never truncates
        store.grow_to(2);
        store.grow_to(-3);
        assert_eq!(store.len(), 7);
    }

    #[test]
    fn each_run_gets_fresh_memory() {
        let program = Program::parse("END\nNUM:\n1\n").unwrap();
        let mut first = program.store();
        first.set_value(2, 5).unwrap();
        assert_eq!(program.store().value(2), Ok(1));
    }

    #[test]
    fn keeps_source_spans() {
        let src = "@ comment\nLDM #1\n\nEND\n";
        let program = Program::parse(src).unwrap();
        assert_eq!(program.len(), 2);
        assert_eq!(&src[program.span(1).unwrap().as_range()], "END");
        assert_eq!(program.span(2), None);
    }
}
