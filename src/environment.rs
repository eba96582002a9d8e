use crate::display::Display;
use crate::error::Result;
use crate::input::{Input, KeypadEvent};
use crate::interpreter::Handle;
use log::{info, warn};
use std::time::{Duration, Instant};

/// 60 frames a second, same as the timers
pub const FRAME: Duration = Duration::from_nanos(1_000_000_000 / 60);

/// The presentation loop, run on whichever thread owns the display: feed
/// input to the keypad, present a frame, sleep out the rest of the frame.
/// Returns once the interpreter is stopped, by the input side or otherwise.
pub fn present(
    handle: &Handle,
    display: &mut impl Display,
    input: &mut impl Input,
) -> Result<()> {
    let mut frames: u64 = 0;
    while handle.is_running() {
        let start = Instant::now();

        for event in input.poll_events()? {
            let outcome = match event {
                KeypadEvent::Press(key) => handle.press(key),
                KeypadEvent::Release(key) => handle.release(key),
                KeypadEvent::Quit => {
                    handle.stop();
                    Ok(())
                }
            };
            if let Err(e) = outcome {
                warn!("dropped {:?}: {}", event, e);
            }
        }

        handle.present(|frame| display.draw(frame))?;
        frames += 1;

        spin_sleep::sleep(FRAME.saturating_sub(start.elapsed()));
    }
    info!("presented {} frames", frames);
    Ok(())
}
