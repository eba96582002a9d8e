use crate::error::{Chip8Error, Result};
use std::io;

// NB. addresses are u16 as per the chip-8; lengths are usize to stop endless casting

/// how much RAM we have
pub const MEMORY_SIZE: usize = 4096;

/// where the program is loaded
pub const PROGRAM_ADDR: u16 = 0x0200;

/// where the hex digit glyphs live; Fx29 relies on this being zero
pub const GLYPH_ADDR: u16 = 0x0000;

/// each glyph is 8 pixels wide and 5 rows tall
pub const GLYPH_BYTES: u16 = 5;

const ADDR_MASK: u16 = (MEMORY_SIZE - 1) as u16;

/// Represents the addressable memory of the machine.
///
/// Single-byte and word accessors wrap at the top of memory, the same way a
/// 12-bit address bus would; slice accessors do not and will panic if asked
/// for something out of range.
pub trait MemoryMap {
    /// write unknown len of data into memory at a particular address
    fn write_any(&mut self, reader: &mut impl io::Read, addr: u16) -> Result<usize> {
        let mut buf = Vec::new();
        let len = reader.read_to_end(&mut buf)?;
        self.write(buf.as_slice(), addr)?;
        Ok(len)
    }

    /// write a chunk of bytes into "RAM"
    fn write(&mut self, data: &[u8], addr: u16) -> Result<()> {
        let max = MEMORY_SIZE.saturating_sub(addr as usize);
        if data.len() > max {
            return Err(Chip8Error::ProgramTooLarge {
                size: data.len(),
                max,
            });
        }
        self.get_rw_slice(addr, data.len()).copy_from_slice(data);
        Ok(())
    }

    /// get a two-byte big-endian word (an opcode)
    fn get_word(&self, addr: u16) -> u16 {
        u16::from_be_bytes([self.read_byte(addr), self.read_byte(addr.wrapping_add(1))])
    }

    fn read_byte(&self, addr: u16) -> u8 {
        self.get_ro_slice(addr & ADDR_MASK, 1)[0]
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        self.get_rw_slice(addr & ADDR_MASK, 1)[0] = value;
    }

    /// get a r/w slice of the underlying memory
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> &mut [u8];

    /// get a r/o slice of the underlying memory
    fn get_ro_slice(&self, addr: u16, len: usize) -> &[u8];
}

/// CHIP-8 memory map, 4K configuration:
///   0x0000-0x004f  hex digit glyphs
///   0x0050-0x01ff  unused (the interpreter lived here on the COSMAC VIP)
///   0x0200-0x0fff  program
///
/// the stack and registers are kept outside of memory, see `Registers`
pub struct Chip8MemoryMap {
    bytes: Box<[u8]>,
}

impl MemoryMap for Chip8MemoryMap {
    fn get_rw_slice(&mut self, addr: u16, len: usize) -> &mut [u8] {
        let a = addr as usize;
        &mut self.bytes[a..(a + len)]
    }
    fn get_ro_slice(&self, addr: u16, len: usize) -> &[u8] {
        let a = addr as usize;
        &self.bytes[a..(a + len)]
    }
}

impl Chip8MemoryMap {
    /// zeroed memory with the glyphs baked in
    pub fn new() -> Self {
        let mut bytes = vec![0u8; MEMORY_SIZE].into_boxed_slice();
        let glyphs = GLYPH_ADDR as usize;
        bytes[glyphs..glyphs + CHIP8_FONT.len()].copy_from_slice(&CHIP8_FONT);
        Chip8MemoryMap { bytes }
    }

    /// load a CHIP-8 program at 0x200, returning its length
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize> {
        match self.write_any(reader, PROGRAM_ADDR)? {
            0 => Err(Chip8Error::EmptyProgram),
            len => Ok(len),
        }
    }

    /// address of the glyph for `digit`; past 0xF this points beyond the
    /// font, as it did on the original machines
    pub fn glyph_addr(digit: u8) -> u16 {
        GLYPH_ADDR + digit as u16 * GLYPH_BYTES
    }
}

impl Default for Chip8MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

#[rustfmt::skip]
pub const CHIP8_FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];
