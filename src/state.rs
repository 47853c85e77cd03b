use crate::instr::{Register, Word};

/// Represents complete register state during a run.
///
/// Only the runtime mutates it; everything else gets a shared reference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MachineState {
    /// Accumulator
    acc: Word,
    /// Index register
    ix: Word,
    /// Set by `CMP`
    eq: bool,
    /// Program counter
    pc: usize,
    /// Instructions fetched so far
    steps: u64,
}

impl MachineState {
    pub fn acc(&self) -> Word {
        self.acc
    }

    pub fn ix(&self) -> Word {
        self.ix
    }

    pub fn eq(&self) -> bool {
        self.eq
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn register(&self, reg: Register) -> Word {
        match reg {
            Register::Acc => self.acc,
            Register::Ix => self.ix,
        }
    }

    pub(crate) fn register_mut(&mut self, reg: Register) -> &mut Word {
        match reg {
            Register::Acc => &mut self.acc,
            Register::Ix => &mut self.ix,
        }
    }

    pub(crate) fn acc_mut(&mut self) -> &mut Word {
        &mut self.acc
    }

    pub(crate) fn set_eq(&mut self, eq: bool) {
        self.eq = eq;
    }

    pub(crate) fn pc_mut(&mut self) -> &mut usize {
        &mut self.pc
    }

    pub(crate) fn count_step(&mut self) {
        self.steps += 1;
    }
}
