use crate::error::{Chip8Error, Result};
use log::{debug, info};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

pub const KEY_COUNT: usize = 16;

/// The most recent key to go down that is still held.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PressedKey {
    #[default]
    NoKey,
    Key(u8),
}

#[derive(Debug)]
struct KeypadState {
    pressed: [bool; KEY_COUNT],
    last: PressedKey,
    running: bool,
}

/// Hex keypad state shared between the input collaborator (writer) and the
/// CPU thread (reader).
///
/// The running flag lives under the same lock as the keys: a stop and a key
/// press both notify the one condition variable that `wait_for_key` sleeps
/// on, so neither wakeup can be lost.
#[derive(Debug)]
pub struct Keypad {
    state: Mutex<KeypadState>,
    signal: Condvar,
}

impl Keypad {
    pub fn new() -> Self {
        Keypad {
            state: Mutex::new(KeypadState {
                pressed: [false; KEY_COUNT],
                last: PressedKey::NoKey,
                running: true,
            }),
            signal: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, KeypadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(key: u8) -> Result<usize> {
        if (key as usize) < KEY_COUNT {
            Ok(key as usize)
        } else {
            Err(Chip8Error::InvalidKey(key))
        }
    }

    pub fn press(&self, key: u8) -> Result<()> {
        let index = Self::check(key)?;
        let mut state = self.lock();
        state.pressed[index] = true;
        state.last = PressedKey::Key(key);
        self.signal.notify_all();
        Ok(())
    }

    pub fn release(&self, key: u8) -> Result<()> {
        let index = Self::check(key)?;
        let mut state = self.lock();
        state.pressed[index] = false;
        if state.last == PressedKey::Key(key) {
            // fall back to anything else still held down
            state.last = match state.pressed.iter().position(|&down| down) {
                Some(other) => PressedKey::Key(other as u8),
                None => PressedKey::NoKey,
            };
        }
        Ok(())
    }

    pub fn is_pressed(&self, key: u8) -> bool {
        let state = self.lock();
        state.pressed.get(key as usize).copied().unwrap_or(false)
    }

    pub fn pressed_key(&self) -> PressedKey {
        self.lock().last
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Terminal: once stopped, the keypad never reports running again.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        if state.running {
            info!("keypad: stop requested");
        }
        state.running = false;
        self.signal.notify_all();
    }

    /// Block until a key is down or the keypad is shut down. `None` means
    /// shutdown won the race.
    pub fn wait_for_key(&self) -> Option<u8> {
        let state = self.lock();
        let state = self
            .signal
            .wait_while(state, |s| s.running && s.last == PressedKey::NoKey)
            .unwrap_or_else(PoisonError::into_inner);
        match state.last {
            PressedKey::Key(key) => {
                debug!("keypad: got key {:x}", key);
                Some(key)
            }
            PressedKey::NoKey => None,
        }
    }
}

impl Default for Keypad {
    fn default() -> Self {
        Self::new()
    }
}
