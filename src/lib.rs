///
/// ## Design
///
/// * CHIP-8 and SUPER-CHIP instruction sets; they differ only in the shift
///   and register-range quirks, picked once in `Config`
/// * 500 instructions a second: run a batch of 10, then sleep out the rest
///   of the 20ms window
/// * delay and sound timers tick at 60Hz, each on its own long-lived thread
///   that parks while the timer is zero
/// * abstract display, input and audio so alternatives can be plugged in;
///   starting with TUI in-console and the PC speaker
///
/// Model
///
/// Environment (main thread)
///  |-- display, input: the presentation side, see `environment::present`
///  `-- interpreter(config, sound) -- run on its own thread
///       |-- memory, registers: owned, never shared
///       |-- framebuffer: Arc<Mutex<_>>, written by DRW/CLS, read per frame
///       |-- keypad: keys + running flag under one lock; LD Vx,K waits on it
///       `-- delay timer, sound timer(sound)
///
/// The presentation side only ever talks to the interpreter through a
/// `Handle`: press/release keys, present a frame, stop. Stopping wakes every
/// thread that might be parked so shutdown is prompt.
pub mod config;
pub mod display;
pub mod environment;
pub mod error;
pub mod framebuffer;
pub mod input;
pub mod interpreter;
pub mod keypad;
pub mod memory;
pub mod opcode;
pub mod registers;
pub mod sound;
pub mod timer;

pub use config::{Config, EdgePolicy, Fading, Variant};
pub use error::{Chip8Error, Result};
pub use interpreter::{Chip8Interpreter, Handle};
