use crate::memory::PROGRAM_ADDR;

/// index of the flags register
pub const VF: usize = 0xf;

/// nesting depth of CALL
pub const STACK_DEPTH: usize = 16;

/// The register file. Owned by the CPU thread only, so there's no locking.
///
/// `sp` points at the most recently pushed entry. Neither overflow nor
/// underflow is checked: the pointer wraps as a u8 and indexes the stack
/// modulo its depth.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registers {
    pub v: [u8; 16],
    pub i: u16,
    pub pc: u16,
    pub sp: u8,
    pub stack: [u16; STACK_DEPTH],
}

impl Registers {
    pub fn new() -> Self {
        Registers {
            v: [0; 16],
            i: 0,
            pc: PROGRAM_ADDR,
            sp: 0,
            stack: [0; STACK_DEPTH],
        }
    }

    /// push a return address
    pub fn push(&mut self, addr: u16) {
        self.sp = self.sp.wrapping_add(1);
        self.stack[self.sp as usize % STACK_DEPTH] = addr;
    }

    /// pop a return address
    pub fn pop(&mut self) -> u16 {
        let addr = self.stack[self.sp as usize % STACK_DEPTH];
        self.sp = self.sp.wrapping_sub(1);
        addr
    }

    /// set VF to 1 or 0
    pub fn set_flag(&mut self, flag: bool) {
        self.v[VF] = flag as u8;
    }

    /// move on to the next instruction
    pub fn advance(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }

    /// move past the next instruction
    pub fn skip(&mut self) {
        self.pc = self.pc.wrapping_add(4);
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
