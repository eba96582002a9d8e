use std::io;
use thiserror::Error;

/// Everything that can stop an interpreter from starting. Once running,
/// nothing in the execute cycle reports an error.
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("program is empty")]
    EmptyProgram,

    #[error("program is {size} bytes, at most {max} bytes fit above 0x200")]
    ProgramTooLarge { size: usize, max: usize },

    #[error("0x{0:02x} is not a key on the hex keypad")]
    InvalidKey(u8),
}

pub type Result<T> = std::result::Result<T, Chip8Error>;
