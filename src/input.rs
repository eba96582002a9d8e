use crossterm::event::{poll, read, Event, KeyCode, KeyModifiers};
use crossterm::terminal;
use log::warn;
use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

/// map of terminal keys to the hex keypad, using the left-hand side of a
/// qwerty keyboard in the COSMAC VIP layout:
///
/// ```text
/// 1 2 3 C      1 2 3 4
/// 4 5 6 D      q w e r
/// 7 8 9 E      a s d f
/// A 0 B F      z x c v
/// ```
const CHIP8_CONVENTIONAL_KEYMAP: [(char, u8); 16] = [
    ('x', 0x00),
    ('1', 0x01),
    ('2', 0x02),
    ('3', 0x03),
    ('q', 0x04),
    ('w', 0x05),
    ('e', 0x06),
    ('a', 0x07),
    ('s', 0x08),
    ('d', 0x09),
    ('z', 0x0a),
    ('c', 0x0b),
    ('4', 0x0c),
    ('r', 0x0d),
    ('f', 0x0e),
    ('v', 0x0f),
];

/// terminals don't report key-up; a key counts as held for this long after
/// its last press (auto-repeat keeps refreshing it)
const HOLD: Duration = Duration::from_millis(250);

/// what the input side tells the interpreter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeypadEvent {
    Press(u8),
    Release(u8),
    Quit,
}

/// reads keypresses and turns them into keypad events
pub trait Input {
    /// everything that has happened since the last call, without blocking
    fn poll_events(&mut self) -> Result<Vec<KeypadEvent>, io::Error>;
}

/// simple implementation of Input, reading the terminal in raw mode
pub struct StdinInput {
    keymap: HashMap<char, u8>,
    held: HashMap<u8, Instant>,
}

impl StdinInput {
    pub fn new() -> Result<Self, io::Error> {
        terminal::enable_raw_mode()?;
        Ok(StdinInput {
            keymap: HashMap::from(CHIP8_CONVENTIONAL_KEYMAP),
            held: HashMap::new(),
        })
    }

    /// held keys that have gone quiet are released
    fn expire(&mut self, now: Instant, events: &mut Vec<KeypadEvent>) {
        let expired: Vec<u8> = self
            .held
            .iter()
            .filter(|(_, at)| now.duration_since(**at) >= HOLD)
            .map(|(&key, _)| key)
            .collect();
        for key in expired {
            self.held.remove(&key);
            events.push(KeypadEvent::Release(key));
        }
    }

    fn translate(
        &mut self,
        code: KeyCode,
        modifiers: KeyModifiers,
        now: Instant,
    ) -> Option<KeypadEvent> {
        match code {
            KeyCode::Esc => Some(KeypadEvent::Quit),
            // raw mode swallows the usual SIGINT
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                Some(KeypadEvent::Quit)
            }
            KeyCode::Char(key) => match self.keymap.get(&key.to_ascii_lowercase()) {
                Some(&mapped_key) => {
                    let fresh = self.held.insert(mapped_key, now).is_none();
                    if fresh {
                        Some(KeypadEvent::Press(mapped_key))
                    } else {
                        None
                    }
                }
                None => {
                    warn!("can't map {:?} to a COSMAC key", key);
                    None
                }
            },
            _ => None,
        }
    }
}

impl Drop for StdinInput {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

impl Input for StdinInput {
    fn poll_events(&mut self) -> Result<Vec<KeypadEvent>, io::Error> {
        let mut events = Vec::new();
        while poll(Duration::from_millis(0))? {
            if let Event::Key(evt) = read()? {
                if let Some(event) = self.translate(evt.code, evt.modifiers, Instant::now()) {
                    events.push(event);
                }
            }
        }
        self.expire(Instant::now(), &mut events);
        Ok(events)
    }
}

/// dummy Input implementation for testing: hands out a script, one batch per poll
pub struct DummyInput {
    script: Vec<Vec<KeypadEvent>>,
}

impl DummyInput {
    pub fn new(script: &[&[KeypadEvent]]) -> Self {
        DummyInput {
            script: script.iter().rev().map(|batch| batch.to_vec()).collect(),
        }
    }
}

impl Input for DummyInput {
    fn poll_events(&mut self) -> Result<Vec<KeypadEvent>, io::Error> {
        Ok(self.script.pop().unwrap_or_default())
    }
}
