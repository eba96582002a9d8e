use crate::config::EdgePolicy;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// sprites are one byte wide
const SPRITE_WIDTH: usize = 8;

/// The framebuffer shared between the CPU thread (writer) and whatever is
/// presenting it (reader). Hold the lock for the whole of a read so a blit is
/// never seen half done.
pub type SharedFramebuffer = Arc<Mutex<Framebuffer>>;

/// lock a shared framebuffer, carrying on if a previous holder panicked
pub fn lock(fb: &SharedFramebuffer) -> MutexGuard<'_, Framebuffer> {
    fb.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Off,
    On,
}

/// A single pixel. `fade` only means anything while the pixel is off; it is
/// purely cosmetic and never feeds back into collision detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Pixel {
    pub status: Status,
    pub fade: u32,
}

impl Pixel {
    pub fn is_on(&self) -> bool {
        self.status == Status::On
    }

    /// XOR a sprite bit into the pixel; true if that turned it off
    fn toggle(&mut self, bit: bool, max_fade: u32) -> bool {
        if !bit {
            return false;
        }
        match self.status {
            Status::On => {
                self.status = Status::Off;
                self.fade = max_fade;
                true
            }
            Status::Off => {
                self.status = Status::On;
                self.fade = 0;
                false
            }
        }
    }
}

/// 64x32 monochrome display, indexed `[row][column]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Framebuffer {
    rows: [[Pixel; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
    max_fade: u32,
}

impl Framebuffer {
    /// a blank display; `max_fade` of 0 disables fading
    pub fn new(max_fade: u32) -> Self {
        Framebuffer {
            rows: [[Pixel::default(); DISPLAY_WIDTH]; DISPLAY_HEIGHT],
            max_fade,
        }
    }

    pub fn shared(max_fade: u32) -> SharedFramebuffer {
        Arc::new(Mutex::new(Self::new(max_fade)))
    }

    pub fn max_fade(&self) -> u32 {
        self.max_fade
    }

    pub fn pixel(&self, row: usize, column: usize) -> Pixel {
        self.rows[row][column]
    }

    pub fn rows(&self) -> &[[Pixel; DISPLAY_WIDTH]; DISPLAY_HEIGHT] {
        &self.rows
    }

    /// blank the whole grid, keeping the fade configuration
    pub fn clear(&mut self) {
        *self = Framebuffer::new(self.max_fade);
    }

    /// XOR `sprite` onto the display with its top-left corner at `(x, y)`,
    /// which are reduced onto the display first. Returns true if any pixel
    /// went from on to off.
    pub fn blit(&mut self, sprite: &[u8], x: usize, y: usize, edge: EdgePolicy) -> bool {
        let x = x % DISPLAY_WIDTH;
        let y = y % DISPLAY_HEIGHT;
        let max_fade = self.max_fade;
        let mut collided = false;

        for (offset, &line) in sprite.iter().enumerate() {
            let row = match edge {
                EdgePolicy::Wrap => (y + offset) % DISPLAY_HEIGHT,
                EdgePolicy::Clip if y + offset < DISPLAY_HEIGHT => y + offset,
                EdgePolicy::Clip => break,
            };
            for bit in 0..SPRITE_WIDTH {
                let column = match edge {
                    EdgePolicy::Wrap => (x + bit) % DISPLAY_WIDTH,
                    EdgePolicy::Clip if x + bit < DISPLAY_WIDTH => x + bit,
                    EdgePolicy::Clip => break,
                };
                let set = line & (0x80 >> bit) != 0;
                collided |= self.rows[row][column].toggle(set, max_fade);
            }
        }
        collided
    }

    /// one presented frame has passed: every fading pixel gets a bit darker
    pub fn decay(&mut self) {
        for pixel in self.rows.iter_mut().flatten() {
            if pixel.status == Status::Off && pixel.fade > 0 {
                pixel.fade -= 1;
            }
        }
    }

    /// how many pixels are on; handy for quick sanity checks
    pub fn lit(&self) -> usize {
        self.rows.iter().flatten().filter(|p| p.is_on()).count()
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Framebuffer::new(0)
    }
}
