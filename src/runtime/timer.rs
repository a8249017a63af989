/*!
 * Timer Facility
 *
 * One-shot timers behind an `arm(duration, callback)` / cancel boundary.
 * Arming returns a [`TimerGuard`]; the timer stays armed only as long as
 * the guard lives, so dropping it on any exit path releases the timer.
 *
 * # Backends
 *
 * - `ThreadTimer`: a named thread per armed timer, parked on a
 *   `parking_lot::Condvar` until the deadline or cancellation
 * - `TokioTimer`: a `tokio::time::sleep` task, aborted on cancel
 */

use crate::core::limits::{DEFAULT_TIMER_THREAD_NAME, MIN_TIMER_DELAY};
use miette::Diagnostic;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, trace};

/// Callback fired when the timer expires
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Timer errors
#[derive(Error, Debug, Diagnostic)]
pub enum TimerError {
    #[error("Failed to spawn timer thread: {0}")]
    #[diagnostic(
        code(timer::spawn),
        help("The OS refused a new thread. Consider the tokio timer backend.")
    )]
    Spawn(#[from] std::io::Error),
}

/// Timer boundary
pub trait Timer: Send + Sync {
    /// Fire `callback` once after `delay` unless the guard is cancelled or
    /// dropped first
    fn arm(&self, delay: Duration, callback: TimerCallback) -> Result<TimerGuard, TimerError>;

    /// Backend name for debugging
    fn name(&self) -> &'static str;
}

/// Scoped ownership of an armed timer
///
/// Cancelling is idempotent and a no-op once the timer fired.
pub struct TimerGuard {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl TimerGuard {
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Guard for a timer that needs no cleanup
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    /// Disarm the timer now
    pub fn cancel(mut self) {
        self.disarm();
    }

    #[inline]
    fn disarm(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.disarm();
    }
}

impl std::fmt::Debug for TimerGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerGuard")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Armed,
    Cancelled,
    Fired,
}

struct TimerSlot {
    state: Mutex<SlotState>,
    condvar: Condvar,
}

/// Thread-backed timer
#[derive(Debug, Clone)]
pub struct ThreadTimer {
    thread_name: String,
}

impl ThreadTimer {
    pub fn new() -> Self {
        Self::with_thread_name(DEFAULT_TIMER_THREAD_NAME)
    }

    pub fn with_thread_name(name: impl Into<String>) -> Self {
        Self {
            thread_name: name.into(),
        }
    }
}

impl Default for ThreadTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for ThreadTimer {
    fn arm(&self, delay: Duration, callback: TimerCallback) -> Result<TimerGuard, TimerError> {
        if delay < MIN_TIMER_DELAY {
            callback();
            return Ok(TimerGuard::detached());
        }

        let slot = Arc::new(TimerSlot {
            state: Mutex::new(SlotState::Armed),
            condvar: Condvar::new(),
        });
        let deadline = Instant::now() + delay;

        let worker = slot.clone();
        thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                let mut state = worker.state.lock();
                while *state == SlotState::Armed && Instant::now() < deadline {
                    worker.condvar.wait_until(&mut state, deadline);
                }
                if *state != SlotState::Armed {
                    trace!("timer cancelled before deadline");
                    return;
                }
                *state = SlotState::Fired;
                drop(state);
                callback();
            })?;

        debug!(delay_ms = delay.as_millis() as u64, "thread timer armed");
        Ok(TimerGuard::new(move || {
            let mut state = slot.state.lock();
            if *state == SlotState::Armed {
                *state = SlotState::Cancelled;
                slot.condvar.notify_one();
            }
        }))
    }

    fn name(&self) -> &'static str {
        "thread"
    }
}

/// Tokio-backed timer
#[derive(Debug, Clone)]
pub struct TokioTimer {
    handle: Handle,
}

impl TokioTimer {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime of the calling context
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Timer for TokioTimer {
    fn arm(&self, delay: Duration, callback: TimerCallback) -> Result<TimerGuard, TimerError> {
        let task = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        debug!(delay_ms = delay.as_millis() as u64, "tokio timer armed");
        Ok(TimerGuard::new(move || task.abort()))
    }

    fn name(&self) -> &'static str {
        "tokio"
    }
}
