use crate::sound::Sound;
use log::{debug, info, warn};
use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub const TIMER_HZ: u32 = 60;

/// nominal time between two decrements
pub const TICK: Duration = Duration::from_nanos(1_000_000_000 / TIMER_HZ as u64);

#[derive(Debug)]
struct TimerState {
    value: u8,
    /// true while the worker is counting down
    ticking: bool,
    /// cleared once, on shutdown
    alive: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<TimerState>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set(&self, value: u8) {
        let mut state = self.lock();
        state.value = value;
        if value == 0 {
            state.ticking = false;
        } else if !state.ticking {
            state.ticking = true;
            self.wake.notify_all();
        }
    }

    fn shutdown(&self) {
        let mut state = self.lock();
        state.alive = false;
        self.wake.notify_all();
    }
}

/// A countdown register decremented at 60Hz by its own long-lived thread.
///
/// While the value is zero the thread is Idle, parked on a condition
/// variable; setting a nonzero value wakes it and it runs until the value
/// hits zero again. If a `Sound` is attached it is started on the way into
/// Running and stopped on the way out.
pub struct Timer {
    name: &'static str,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

/// Cheap handle on a timer for other threads; can read it and shut it down.
#[derive(Clone, Debug)]
pub struct TimerControl {
    shared: Arc<Shared>,
}

impl TimerControl {
    pub fn value(&self) -> u8 {
        self.shared.lock().value
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().ticking
    }

    pub fn shutdown(&self) {
        self.shared.shutdown();
    }
}

impl Timer {
    pub fn spawn(name: &'static str, sound: Option<Box<dyn Sound>>) -> Result<Self, io::Error> {
        let shared = Arc::new(Shared {
            state: Mutex::new(TimerState {
                value: 0,
                ticking: false,
                alive: true,
            }),
            wake: Condvar::new(),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name(format!("{}-timer", name))
            .spawn(move || countdown(name, &worker_shared, sound))?;
        Ok(Timer {
            name,
            shared,
            worker: Some(worker),
        })
    }

    /// set the value; a nonzero value (re)starts the countdown
    pub fn set(&self, value: u8) {
        self.shared.set(value);
    }

    pub fn value(&self) -> u8 {
        self.shared.lock().value
    }

    /// Running (true) or Idle (false)
    pub fn is_running(&self) -> bool {
        self.shared.lock().ticking
    }

    pub fn control(&self) -> TimerControl {
        TimerControl {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn shutdown(&self) {
        self.shared.shutdown();
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.shared.shutdown();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("{} timer: worker panicked", self.name);
            }
        }
    }
}

fn notify_sound(name: &str, sound: &mut Option<Box<dyn Sound>>, start: bool) {
    if let Some(sound) = sound.as_mut() {
        let result = if start { sound.beep() } else { sound.stop() };
        if let Err(e) = result {
            warn!("{} timer: sound failed: {}", name, e);
        }
    }
}

/// the worker: Idle until woken, then Running until zero, until shut down
fn countdown(name: &str, shared: &Shared, mut sound: Option<Box<dyn Sound>>) {
    info!("{} timer: started", name);
    loop {
        {
            let state = shared
                .wake
                .wait_while(shared.lock(), |s| s.alive && !s.ticking)
                .unwrap_or_else(PoisonError::into_inner);
            if !state.alive {
                break;
            }
            debug!("{} timer: running from {}", name, state.value);
        }

        notify_sound(name, &mut sound, true);

        // decrement on a fixed 60Hz grid: sleeping towards the next deadline
        // rather than for a whole tick absorbs the time spent doing the work
        let mut deadline = Instant::now();
        loop {
            deadline += TICK;
            spin_sleep::sleep(deadline.saturating_duration_since(Instant::now()));

            let mut state = shared.lock();
            if !state.alive || !state.ticking {
                break;
            }
            state.value = state.value.saturating_sub(1);
            if state.value == 0 {
                state.ticking = false;
                break;
            }
        }

        notify_sound(name, &mut sound, false);
        debug!("{} timer: idle", name);
    }
    info!("{} timer: exited", name);
}
