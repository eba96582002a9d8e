use std::fmt;

/// # Instructions
///
/// CHIP-8 instructions are 16 bits, fetched big-endian. Their behaviour is
/// cased on the top nibble; families 0x8, 0xE and 0xF further case on the
/// bottom nibble or byte. The remaining nibbles carry operands:
///
/// - `[_nnn]` a 12-bit address
/// - `[__kk]` an immediate byte
/// - `[_x__]` register Vx, or the range V0..=Vx
/// - `[__y_]` register Vy
/// - `[___n]` a 4-bit immediate (sprite height)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction(u16);

impl Instruction {
    pub fn new(opcode: u16) -> Self {
        Instruction(opcode)
    }

    pub fn opcode(self) -> u16 {
        self.0
    }

    /// `[o___]`
    pub fn op(self) -> u8 {
        (self.0 >> 12) as u8
    }

    /// `[_x__]`
    pub fn x(self) -> usize {
        ((self.0 & 0x0F00) >> 8) as usize
    }

    /// `[__y_]`
    pub fn y(self) -> usize {
        ((self.0 & 0x00F0) >> 4) as usize
    }

    /// `[___n]`
    pub fn n(self) -> u8 {
        (self.0 & 0x000F) as u8
    }

    /// `[__kk]`
    pub fn kk(self) -> u8 {
        (self.0 & 0x00FF) as u8
    }

    /// `[_nnn]`
    pub fn nnn(self) -> u16 {
        self.0 & 0x0FFF
    }
}

impl From<u16> for Instruction {
    fn from(opcode: u16) -> Self {
        Instruction(opcode)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}
