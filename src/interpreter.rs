/// # interpreter
///
/// Owns the memory and register file outright and runs on a single thread.
/// Everything other threads can see goes through `Handle`:
///
///  - the framebuffer, behind a mutex; DRW and CLS only touch it under the lock
///  - the keypad, whose lock also carries the running flag
///  - the two timers, each counting down on its own thread
///
/// Instructions are run in batches of ten and then the thread sleeps out the
/// rest of a 20ms window, i.e. 500 instructions a second. Batching keeps the
/// rate steady in the face of coarse OS sleeps.
use crate::config::{Config, Variant};
use crate::error::Result;
use crate::framebuffer::{self, Framebuffer, SharedFramebuffer};
use crate::keypad::{Keypad, PressedKey};
use crate::memory::{Chip8MemoryMap, MemoryMap};
use crate::opcode::Instruction;
use crate::registers::{Registers, VF};
use crate::sound::Sound;
use crate::timer::{Timer, TimerControl};
use log::{debug, info, trace};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const INSTRUCTIONS_PER_BATCH: usize = 10;

/// 10 instructions at 2ms each
pub const BATCH_WINDOW: Duration = Duration::from_millis(20);

/// where the program counter goes after an instruction
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Next,
    Skip,
    Jump(u16),
}

impl Flow {
    fn skip_if(condition: bool) -> Self {
        if condition {
            Flow::Skip
        } else {
            Flow::Next
        }
    }
}

pub struct Chip8Interpreter {
    memory: Chip8MemoryMap,
    registers: Registers,
    display: SharedFramebuffer,
    keypad: Arc<Keypad>,
    delay: Timer,
    sound: Timer,
    config: Config,
    rng: StdRng,
    cycles: u64,
}

/// What the presentation and input side hold on to. Clone freely.
#[derive(Clone, Debug)]
pub struct Handle {
    display: SharedFramebuffer,
    keypad: Arc<Keypad>,
    delay: TimerControl,
    sound: TimerControl,
}

impl Handle {
    pub fn press(&self, key: u8) -> Result<()> {
        self.keypad.press(key)
    }

    pub fn release(&self, key: u8) -> Result<()> {
        self.keypad.release(key)
    }

    pub fn pressed_key(&self) -> PressedKey {
        self.keypad.pressed_key()
    }

    /// Stop the run. Wakes anything blocked on a key or an idle timer.
    pub fn stop(&self) {
        self.keypad.shutdown();
        self.delay.shutdown();
        self.sound.shutdown();
    }

    pub fn is_running(&self) -> bool {
        self.keypad.is_running()
    }

    /// Present one frame: age the fading pixels by a frame and hand a copy
    /// of the framebuffer to `render`. The lock is dropped before `render`
    /// runs, so slow terminal output never holds up DRW or CLS.
    pub fn present<F, R>(&self, render: F) -> R
    where
        F: FnOnce(&Framebuffer) -> R,
    {
        let frame = {
            let mut fb = framebuffer::lock(&self.display);
            fb.decay();
            fb.clone()
        };
        render(&frame)
    }

    /// copy of the framebuffer as it is right now
    pub fn snapshot(&self) -> Framebuffer {
        framebuffer::lock(&self.display).clone()
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay.value()
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound.value()
    }
}

impl Chip8Interpreter {
    /// Set up a machine and start its timer threads. `sound` is driven by
    /// the sound timer.
    pub fn new(config: Config, sound: Box<dyn Sound>) -> Result<Self> {
        Ok(Chip8Interpreter {
            memory: Chip8MemoryMap::new(),
            registers: Registers::new(),
            display: Framebuffer::shared(config.fading.max_level()),
            keypad: Arc::new(Keypad::new()),
            delay: Timer::spawn("delay", None)?,
            sound: Timer::spawn("sound", Some(sound))?,
            config,
            rng: StdRng::from_entropy(),
            cycles: 0,
        })
    }

    /// reseed the random source, for reproducible runs
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// load a chip8 program
    pub fn load_program(&mut self, reader: &mut impl io::Read) -> Result<usize> {
        let len = self.memory.load_program(reader)?;
        info!("loaded program [size: {} bytes]", len);
        Ok(len)
    }

    pub fn handle(&self) -> Handle {
        Handle {
            display: Arc::clone(&self.display),
            keypad: Arc::clone(&self.keypad),
            delay: self.delay.control(),
            sound: self.sound.control(),
        }
    }

    pub fn config(&self) -> Config {
        self.config
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn memory(&self) -> &Chip8MemoryMap {
        &self.memory
    }

    /// instructions executed so far
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn stop(&self) {
        self.handle().stop();
    }

    /// Run until stopped, at 500 instructions a second.
    pub fn run(&mut self) {
        info!(
            "running [variant: {:?}, edge: {:?}, fading: {:?}]",
            self.config.variant, self.config.edge, self.config.fading
        );
        while self.keypad.is_running() {
            let start = Instant::now();
            for _ in 0..INSTRUCTIONS_PER_BATCH {
                if !self.keypad.is_running() {
                    break;
                }
                self.step();
            }
            spin_sleep::sleep(BATCH_WINDOW.saturating_sub(start.elapsed()));
        }
        info!("stopped after {} instructions", self.cycles);
    }

    /// fetch and execute one instruction
    pub fn step(&mut self) {
        let instruction = Instruction::new(self.memory.get_word(self.registers.pc));
        trace!(
            "{} pc{:04X} i{:04X} v{:02X?}",
            instruction,
            self.registers.pc,
            self.registers.i,
            self.registers.v
        );
        self.execute(instruction);
    }

    /// Apply one instruction. Opcodes that mean nothing are skipped over.
    pub fn execute(&mut self, instruction: Instruction) {
        let flow = match instruction.op() {
            0x0 => self.exec_system(instruction),
            0x1 => Flow::Jump(instruction.nnn()),
            0x2 => {
                self.registers.push(self.registers.pc);
                Flow::Jump(instruction.nnn())
            }
            0x3 => Flow::skip_if(self.registers.v[instruction.x()] == instruction.kk()),
            0x4 => Flow::skip_if(self.registers.v[instruction.x()] != instruction.kk()),
            0x5 if instruction.n() == 0 => {
                let (x, y) = (instruction.x(), instruction.y());
                Flow::skip_if(self.registers.v[x] == self.registers.v[y])
            }
            0x6 => {
                self.registers.v[instruction.x()] = instruction.kk();
                Flow::Next
            }
            0x7 => {
                let x = instruction.x();
                self.registers.v[x] = self.registers.v[x].wrapping_add(instruction.kk());
                Flow::Next
            }
            0x8 => self.exec_alu(instruction),
            0x9 if instruction.n() == 0 => {
                let (x, y) = (instruction.x(), instruction.y());
                Flow::skip_if(self.registers.v[x] != self.registers.v[y])
            }
            0xA => {
                self.registers.i = instruction.nnn();
                Flow::Next
            }
            0xB => Flow::Jump(instruction.nnn().wrapping_add(self.registers.v[0] as u16)),
            0xC => {
                let random: u8 = self.rng.gen();
                self.registers.v[instruction.x()] = random & instruction.kk();
                Flow::Next
            }
            0xD => {
                self.draw(instruction);
                Flow::Next
            }
            0xE => self.exec_keys(instruction),
            0xF => self.exec_misc(instruction),
            _ => self.unknown(instruction),
        };

        match flow {
            Flow::Next => self.registers.advance(),
            Flow::Skip => self.registers.skip(),
            Flow::Jump(addr) => self.registers.pc = addr,
        }
        self.cycles += 1;
    }

    fn unknown(&self, instruction: Instruction) -> Flow {
        debug!(
            "ignoring unknown instruction {} at {:04X}",
            instruction, self.registers.pc
        );
        Flow::Next
    }

    /// 00E0, 00EE; everything else in the family (0nnn SYS) is ignored
    fn exec_system(&mut self, instruction: Instruction) -> Flow {
        match instruction.opcode() {
            0x00E0 => {
                framebuffer::lock(&self.display).clear();
                Flow::Next
            }
            0x00EE => {
                // back to the CALL, then on past it
                let addr = self.registers.pop();
                Flow::Jump(addr.wrapping_add(2))
            }
            _ => self.unknown(instruction),
        }
    }

    /// 8xyN register arithmetic
    fn exec_alu(&mut self, instruction: Instruction) -> Flow {
        let (x, y) = (instruction.x(), instruction.y());
        let vx = self.registers.v[x];
        let vy = self.registers.v[y];
        let chip8 = self.config.variant == Variant::Chip8;

        // the flag is written last so VF as an operand gets overwritten by it
        let (result, flag) = match instruction.n() {
            0x0 => (vy, None),
            0x1 => (vx | vy, None),
            0x2 => (vx & vy, None),
            0x3 => (vx ^ vy, None),
            0x4 => {
                let sum = vx.wrapping_add(vy);
                (sum, Some(sum < vy))
            }
            0x5 => (vx.wrapping_sub(vy), Some(vx >= vy)),
            0x6 => {
                let src = if chip8 { vy } else { vx };
                (src >> 1, Some(src & 0x01 != 0))
            }
            0x7 => (vy.wrapping_sub(vx), Some(vy >= vx)),
            0xE => {
                let src = if chip8 { vy } else { vx };
                (src << 1, Some(src & 0x80 != 0))
            }
            _ => return self.unknown(instruction),
        };

        self.registers.v[x] = result;
        if let Some(flag) = flag {
            self.registers.set_flag(flag);
        }
        Flow::Next
    }

    /// Dxyn: n rows of sprite from I, at (Vx, Vy)
    fn draw(&mut self, instruction: Instruction) {
        let base = self.registers.i;
        let sprite: Vec<u8> = (0..instruction.n() as u16)
            .map(|row| self.memory.read_byte(base.wrapping_add(row)))
            .collect();
        let x = self.registers.v[instruction.x()] as usize;
        let y = self.registers.v[instruction.y()] as usize;

        let collided = framebuffer::lock(&self.display).blit(&sprite, x, y, self.config.edge);
        self.registers.v[VF] = collided as u8;
    }

    /// Ex9E, ExA1
    fn exec_keys(&mut self, instruction: Instruction) -> Flow {
        let key = self.registers.v[instruction.x()];
        match instruction.kk() {
            0x9E => Flow::skip_if(self.keypad.is_pressed(key)),
            0xA1 => Flow::skip_if(!self.keypad.is_pressed(key)),
            _ => self.unknown(instruction),
        }
    }

    /// FxNN timers, keys, I and memory
    fn exec_misc(&mut self, instruction: Instruction) -> Flow {
        let x = instruction.x();
        let vx = self.registers.v[x];
        match instruction.kk() {
            0x07 => self.registers.v[x] = self.delay.value(),
            0x0A => {
                // blocks the CPU thread; a stop leaves Vx alone
                if let Some(key) = self.keypad.wait_for_key() {
                    self.registers.v[x] = key;
                }
            }
            0x15 => self.delay.set(vx),
            0x18 => self.sound.set(vx),
            0x1E => self.registers.i = self.registers.i.wrapping_add(vx as u16),
            0x29 => self.registers.i = Chip8MemoryMap::glyph_addr(vx),
            0x33 => {
                let i = self.registers.i;
                self.memory.write_byte(i, vx / 100);
                self.memory.write_byte(i.wrapping_add(1), vx / 10 % 10);
                self.memory.write_byte(i.wrapping_add(2), vx % 10);
            }
            0x55 => {
                let mut cursor = self.registers.i;
                for r in 0..=x {
                    self.memory.write_byte(cursor, self.registers.v[r]);
                    cursor = cursor.wrapping_add(1);
                }
                if self.config.variant == Variant::Chip8 {
                    self.registers.i = cursor;
                }
            }
            0x65 => {
                let mut cursor = self.registers.i;
                for r in 0..=x {
                    self.registers.v[r] = self.memory.read_byte(cursor);
                    cursor = cursor.wrapping_add(1);
                }
                if self.config.variant == Variant::Chip8 {
                    self.registers.i = cursor;
                }
            }
            _ => return self.unknown(instruction),
        }
        Flow::Next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EdgePolicy, Fading};
    use crate::sound::{Mute, ToneCallbacks};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn interpreter(config: Config) -> Chip8Interpreter {
        Chip8Interpreter::new(config, Box::new(Mute::new()))
            .unwrap()
            .with_seed(8)
    }

    fn chip8() -> Chip8Interpreter {
        interpreter(Config::default())
    }

    fn schip8() -> Chip8Interpreter {
        interpreter(Config::default().with_variant(Variant::SuperChip8))
    }

    fn exec(c: &mut Chip8Interpreter, opcode: u16) {
        c.execute(Instruction::new(opcode));
    }

    #[test]
    fn test_program_load_ok() -> Result<()> {
        let mut c = chip8();
        let mut prog: &[u8] = &[0x00, 0xe0]; // clear screen
        assert_eq!(c.load_program(&mut prog)?, 2);
        Ok(())
    }

    #[test]
    fn test_step_fetches_big_endian() -> Result<()> {
        let mut c = chip8();
        let mut prog: &[u8] = &[0x6A, 0x42, 0x7A, 0x01];
        c.load_program(&mut prog)?;
        c.step();
        c.step();
        assert_eq!(c.registers.v[0xA], 0x43);
        assert_eq!(c.registers.pc, 0x204);
        assert_eq!(c.cycles(), 2);
        Ok(())
    }

    #[test]
    fn test_add_carry() {
        for (a, b, sum, carry) in [
            (0xFF, 0x01, 0x00, 1),
            (0x01, 0x01, 0x02, 0),
            (0x80, 0x80, 0x00, 1),
            (0xF0, 0x0F, 0xFF, 0),
        ] {
            let mut c = chip8();
            c.registers.v[1] = a;
            c.registers.v[2] = b;
            exec(&mut c, 0x8124);
            assert_eq!(c.registers.v[1], sum, "{:02x} + {:02x}", a, b);
            assert_eq!(c.registers.v[VF], carry, "{:02x} + {:02x}", a, b);
        }
    }

    #[test]
    fn test_sub_borrow() {
        for (a, b, diff, no_borrow) in [
            (0x05, 0x03, 0x02, 1),
            (0x03, 0x05, 0xFE, 0),
            (0x07, 0x07, 0x00, 1),
        ] {
            let mut c = chip8();
            c.registers.v[3] = a;
            c.registers.v[4] = b;
            exec(&mut c, 0x8345);
            assert_eq!(c.registers.v[3], diff);
            assert_eq!(c.registers.v[VF], no_borrow);
        }
    }

    #[test]
    fn test_subn_borrow() {
        let mut c = chip8();
        c.registers.v[3] = 0x03;
        c.registers.v[4] = 0x05;
        exec(&mut c, 0x8347);
        assert_eq!(c.registers.v[3], 0x02);
        assert_eq!(c.registers.v[VF], 1);

        c.registers.v[3] = 0x06;
        exec(&mut c, 0x8347);
        assert_eq!(c.registers.v[3], 0xFF);
        assert_eq!(c.registers.v[VF], 0);
    }

    #[test]
    fn test_flag_overwrites_vf_operand() {
        let mut c = chip8();
        c.registers.v[VF] = 0xFF;
        c.registers.v[1] = 0x01;
        exec(&mut c, 0x8F14);
        assert_eq!(c.registers.v[VF], 1);
    }

    #[test]
    fn test_bitwise() {
        let mut c = chip8();
        c.registers.v[0] = 0b1100;
        c.registers.v[1] = 0b1010;
        exec(&mut c, 0x8011);
        assert_eq!(c.registers.v[0], 0b1110);
        exec(&mut c, 0x8012);
        assert_eq!(c.registers.v[0], 0b1010);
        exec(&mut c, 0x8013);
        assert_eq!(c.registers.v[0], 0);
        exec(&mut c, 0x8010);
        assert_eq!(c.registers.v[0], 0b1010);
    }

    #[test]
    fn test_shifts_differ_by_variant() {
        let mut c = chip8();
        c.registers.v[1] = 0x10;
        c.registers.v[2] = 0x81;
        exec(&mut c, 0x8126);
        assert_eq!(c.registers.v[1], 0x40);
        assert_eq!(c.registers.v[2], 0x81);
        assert_eq!(c.registers.v[VF], 1);

        let mut s = schip8();
        s.registers.v[1] = 0x10;
        s.registers.v[2] = 0x81;
        s.execute(Instruction::new(0x8126));
        assert_eq!(s.registers.v[1], 0x08);
        assert_eq!(s.registers.v[2], 0x81);
        assert_eq!(s.registers.v[VF], 0);

        let mut c = chip8();
        c.registers.v[1] = 0x01;
        c.registers.v[2] = 0x81;
        exec(&mut c, 0x812E);
        assert_eq!(c.registers.v[1], 0x02);
        assert_eq!(c.registers.v[VF], 1);

        let mut s = schip8();
        s.registers.v[1] = 0x01;
        s.registers.v[2] = 0x81;
        exec(&mut s, 0x812E);
        assert_eq!(s.registers.v[1], 0x02);
        assert_eq!(s.registers.v[VF], 0);
    }

    #[test]
    fn test_add_immediate_leaves_flag() {
        let mut c = chip8();
        c.registers.v[5] = 0xFF;
        exec(&mut c, 0x7502);
        assert_eq!(c.registers.v[5], 0x01);
        assert_eq!(c.registers.v[VF], 0);
    }

    #[test]
    fn test_skips() {
        let mut c = chip8();
        c.registers.v[1] = 0x33;
        c.registers.v[2] = 0x33;
        exec(&mut c, 0x3133);
        assert_eq!(c.registers.pc, 0x204);
        exec(&mut c, 0x4133);
        assert_eq!(c.registers.pc, 0x206);
        exec(&mut c, 0x5120);
        assert_eq!(c.registers.pc, 0x20A);
        exec(&mut c, 0x9120);
        assert_eq!(c.registers.pc, 0x20C);
    }

    #[test]
    fn test_jumps() {
        let mut c = chip8();
        exec(&mut c, 0x1ABC);
        assert_eq!(c.registers.pc, 0xABC);
        c.registers.v[0] = 0x10;
        exec(&mut c, 0xB300);
        assert_eq!(c.registers.pc, 0x310);
    }

    #[test]
    fn test_call_then_return() {
        let mut c = chip8();
        c.registers.pc = 0x240;
        exec(&mut c, 0x2400);
        assert_eq!(c.registers.pc, 0x400);
        assert_eq!(c.registers.sp, 1);
        exec(&mut c, 0x00EE);
        assert_eq!(c.registers.pc, 0x242);
        assert_eq!(c.registers.sp, 0);
    }

    #[test]
    fn test_unknown_opcodes_advance() {
        let mut c = chip8();
        for opcode in [0x0123, 0x5121, 0x8128, 0x9121, 0xE100, 0xF1FF] {
            let before = c.registers.clone();
            exec(&mut c, opcode);
            assert_eq!(c.registers.pc, before.pc + 2, "{:04x}", opcode);
            assert_eq!(c.registers.v, before.v, "{:04x}", opcode);
        }
    }

    #[test]
    fn test_random_masked() {
        let mut c = chip8();
        exec(&mut c, 0xC300);
        assert_eq!(c.registers.v[3], 0);
        for _ in 0..32 {
            exec(&mut c, 0xC30F);
            assert_eq!(c.registers.v[3] & 0xF0, 0);
        }
    }

    #[test]
    fn test_random_reproducible() {
        let mut a = chip8();
        let mut b = chip8();
        for _ in 0..8 {
            exec(&mut a, 0xC4FF);
            exec(&mut b, 0xC4FF);
            assert_eq!(a.registers.v[4], b.registers.v[4]);
        }
    }

    #[test]
    fn test_draw_glyph_twice() {
        let mut c = chip8();
        c.registers.v[0] = 0;
        exec(&mut c, 0xF029);
        assert_eq!(c.registers.i, 0);
        exec(&mut c, 0xD005);
        assert_eq!(c.registers.v[VF], 0);
        assert_eq!(c.handle().snapshot().lit(), 14);
        exec(&mut c, 0xD005);
        assert_eq!(c.registers.v[VF], 1);
        assert_eq!(c.handle().snapshot().lit(), 0);
    }

    #[test]
    fn test_glyph_address_not_masked() {
        let mut c = chip8();
        c.registers.v[3] = 0xA;
        exec(&mut c, 0xF329);
        assert_eq!(c.registers.i, 50);
        c.registers.v[3] = 0x12;
        exec(&mut c, 0xF329);
        assert_eq!(c.registers.i, 0x12 * 5);
        assert_eq!(c.registers.v[VF], 0);
    }

    #[test]
    fn test_draw_edge_policy() {
        for (edge, lit) in [(EdgePolicy::Wrap, 8), (EdgePolicy::Clip, 4)] {
            let mut c = interpreter(Config::default().with_edge(edge));
            c.memory.write_byte(0x300, 0xFF);
            c.registers.i = 0x300;
            c.registers.v[1] = 60;
            c.registers.v[2] = 0;
            exec(&mut c, 0xD121);
            let fb = c.handle().snapshot();
            assert_eq!(fb.lit(), lit);
            assert!(fb.pixel(0, 63).is_on());
            assert_eq!(fb.pixel(0, 0).is_on(), edge == EdgePolicy::Wrap);
        }
    }

    #[test]
    fn test_clear_screen() {
        let mut c = interpreter(Config::default().with_fading(Fading::On { frames: 9 }));
        exec(&mut c, 0xD005);
        exec(&mut c, 0x00E0);
        assert_eq!(c.handle().snapshot(), Framebuffer::new(9));
        assert_eq!(c.registers.pc, 0x204);
    }

    #[test]
    fn test_bcd() {
        let mut c = chip8();
        c.registers.v[7] = 234;
        c.registers.i = 0x300;
        exec(&mut c, 0xF733);
        assert_eq!(c.memory.get_ro_slice(0x300, 3), &[2, 3, 4]);
        c.registers.v[7] = 7;
        exec(&mut c, 0xF733);
        assert_eq!(c.memory.get_ro_slice(0x300, 3), &[0, 0, 7]);
    }

    #[test]
    fn test_add_to_index_leaves_flag() {
        let mut c = chip8();
        c.registers.i = 0x0FFF;
        c.registers.v[2] = 0x02;
        exec(&mut c, 0xF21E);
        assert_eq!(c.registers.i, 0x1001);
        assert_eq!(c.registers.v[VF], 0);
    }

    #[test]
    fn test_store_load_round_trip_chip8() {
        let mut c = chip8();
        let values = [9, 8, 7, 6, 5];
        c.registers.v[..5].copy_from_slice(&values);
        c.registers.i = 0x400;
        exec(&mut c, 0xF455);
        assert_eq!(c.registers.i, 0x405);
        assert_eq!(c.memory.get_ro_slice(0x400, 5), &values);

        c.registers.v = [0; 16];
        c.registers.i = 0x400;
        exec(&mut c, 0xF465);
        assert_eq!(c.registers.i, 0x405);
        assert_eq!(c.registers.v[..5], values);
        assert_eq!(c.registers.v[5], 0);
    }

    #[test]
    fn test_store_load_round_trip_schip8() {
        let mut c = schip8();
        let values = [1, 2, 3];
        c.registers.v[..3].copy_from_slice(&values);
        c.registers.i = 0x400;
        exec(&mut c, 0xF255);
        assert_eq!(c.registers.i, 0x400);

        c.registers.v = [0; 16];
        exec(&mut c, 0xF265);
        assert_eq!(c.registers.i, 0x400);
        assert_eq!(c.registers.v[..3], values);
    }

    #[test]
    fn test_keys_skip() -> Result<()> {
        let mut c = chip8();
        let h = c.handle();
        c.registers.v[1] = 0xB;
        exec(&mut c, 0xE19E);
        assert_eq!(c.registers.pc, 0x202);
        exec(&mut c, 0xE1A1);
        assert_eq!(c.registers.pc, 0x206);

        h.press(0xB)?;
        exec(&mut c, 0xE19E);
        assert_eq!(c.registers.pc, 0x20A);
        exec(&mut c, 0xE1A1);
        assert_eq!(c.registers.pc, 0x20C);
        Ok(())
    }

    #[test]
    fn test_wait_for_key_stopped() {
        let mut c = chip8();
        let h = c.handle();
        c.registers.v[4] = 0x77;
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            h.stop();
        });
        exec(&mut c, 0xF40A);
        assert_eq!(c.registers.v[4], 0x77);
        assert_eq!(c.registers.pc, 0x202);
        stopper.join().unwrap();
    }

    #[test]
    fn test_wait_for_key_pressed() {
        let mut c = chip8();
        let h = c.handle();
        let presser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            h.press(0xE).unwrap();
        });
        exec(&mut c, 0xF40A);
        assert_eq!(c.registers.v[4], 0xE);
        presser.join().unwrap();
    }

    #[test]
    fn test_delay_timer_round_trip() {
        let mut c = chip8();
        c.registers.v[2] = 30;
        exec(&mut c, 0xF215);
        exec(&mut c, 0xF307);
        let seen = c.registers.v[3];
        assert!(seen > 0 && seen <= 30);
        thread::sleep(Duration::from_millis(800));
        exec(&mut c, 0xF307);
        assert_eq!(c.registers.v[3], 0);
        assert_eq!(c.handle().delay_timer(), 0);
    }

    #[test]
    fn test_sound_timer_starts_tone() -> Result<()> {
        let starts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&starts);
        let tone = ToneCallbacks::new(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            || {},
        );
        let mut c = Chip8Interpreter::new(Config::default(), Box::new(tone))?;
        c.registers.v[0] = 6;
        exec(&mut c, 0xF018);
        // reloading while it's already sounding doesn't restart the tone
        exec(&mut c, 0xF018);
        thread::sleep(Duration::from_millis(300));
        assert_eq!(c.handle().sound_timer(), 0);
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[test]
    fn test_run_paced_and_stoppable() -> Result<()> {
        let mut c = chip8();
        // 1200: jump to self, forever
        let mut prog: &[u8] = &[0x12, 0x00];
        c.load_program(&mut prog)?;
        let h = c.handle();
        let cpu = thread::spawn(move || {
            c.run();
            c
        });
        thread::sleep(Duration::from_millis(200));
        h.stop();
        let c = cpu.join().unwrap();
        assert!(!h.is_running());
        // 500Hz for 200ms is 100 instructions; be forgiving of slow machines
        assert!(c.cycles() >= 30, "only {} cycles", c.cycles());
        assert!(c.cycles() <= 200, "{} cycles", c.cycles());
        Ok(())
    }

    #[test]
    fn test_present_decays() {
        let mut c = interpreter(Config::default().with_fading(Fading::On { frames: 4 }));
        exec(&mut c, 0xD001);
        exec(&mut c, 0xD001);
        let h = c.handle();
        assert_eq!(h.present(|fb| fb.pixel(0, 0).fade), 3);
        assert_eq!(h.present(|fb| fb.pixel(0, 0).fade), 2);
    }

    #[test]
    fn test_draw_while_presenting() {
        let mut c = chip8();
        let h = c.handle();
        let lit = h.present(|_| {
            // the cpu gets the display while a frame is still being rendered
            exec(&mut c, 0xD005);
            h.snapshot().lit()
        });
        assert_eq!(lit, 14);
    }
}
