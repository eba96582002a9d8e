use beep::beep;
use std::error::Error;

/// The audio collaborator. The sound timer calls `beep` when it starts
/// counting down and `stop` once it reaches zero, from its own thread.
pub trait Sound: Send {
    fn beep(&mut self) -> Result<(), Box<dyn Error>>;
    fn stop(&mut self) -> Result<(), Box<dyn Error>>;
}

const SIMPLEBEEP_PITCH: u16 = 2093; // C

/// square wave through the PC speaker
pub struct SimpleBeep {
    is_beeping: bool,
}

impl SimpleBeep {
    pub fn new() -> Self {
        SimpleBeep { is_beeping: false }
    }

    pub fn is_beeping(&self) -> bool {
        self.is_beeping
    }
}

impl Default for SimpleBeep {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for SimpleBeep {
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        beep(SIMPLEBEEP_PITCH)?;
        self.is_beeping = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        beep(0)?;
        self.is_beeping = false;
        Ok(())
    }
}

impl Drop for SimpleBeep {
    fn drop(&mut self) {
        if self.is_beeping {
            let _ = beep(0);
        }
    }
}

pub struct Mute {}

impl Mute {
    pub fn new() -> Self {
        Mute {}
    }
}

impl Default for Mute {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for Mute {
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        Ok(())
    }
}

/// start-tone/stop-tone callback pair, for hosts that own their own audio
/// device and just want to be told when to play
pub struct ToneCallbacks<S, T> {
    start: S,
    stop: T,
}

impl<S, T> ToneCallbacks<S, T>
where
    S: FnMut() + Send,
    T: FnMut() + Send,
{
    pub fn new(start: S, stop: T) -> Self {
        ToneCallbacks { start, stop }
    }
}

impl<S, T> Sound for ToneCallbacks<S, T>
where
    S: FnMut() + Send,
    T: FnMut() + Send,
{
    fn beep(&mut self) -> Result<(), Box<dyn Error>> {
        (self.start)();
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        (self.stop)();
        Ok(())
    }
}
