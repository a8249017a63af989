/*!
 * Delay Process
 *
 * Completes after a duration. Built on [`Suspend`]: the armed timer's
 * guard is the cancel hook, so the timer is released on success, failure
 * and kill alike. With an executor attached, the timer callback submits
 * the resumption to it instead of resuming on the timer thread.
 */

use super::suspend::{CancelHook, Suspend};
use crate::core::errors::{ProcessError, ProtocolResult};
use crate::core::types::ProcessState;
use crate::process::{Completion, Process};
use crate::runtime::executor::Executor;
use crate::runtime::timer::{ThreadTimer, Timer};
use std::sync::Arc;
use std::time::Duration;

/// Timed suspension
pub struct Delay {
    suspend: Suspend,
    duration: Duration,
}

impl Delay {
    /// Delay on a dedicated timer thread
    pub fn new(duration: Duration) -> Self {
        Self::with_timer(duration, Arc::new(ThreadTimer::new()), None)
    }

    #[inline]
    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Delay on the given timer, optionally resuming on `executor`
    pub fn with_timer(
        duration: Duration,
        timer: Arc<dyn Timer>,
        executor: Option<Arc<dyn Executor>>,
    ) -> Self {
        let suspend = Suspend::named("delay", move |resume| {
            let on_error = resume.clone();
            let callback = Box::new(move || match executor {
                Some(executor) => executor.submit(Box::new(move || {
                    resume.done();
                })),
                None => {
                    resume.done();
                }
            });

            match timer.arm(duration, callback) {
                Ok(guard) => Some(Box::new(move || guard.cancel()) as CancelHook),
                Err(err) => {
                    tracing::error!(error = %err, timer = timer.name(), "failed to arm delay timer");
                    on_error.throw(ProcessError::exception(err));
                    None
                }
            }
        });

        Self { suspend, duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Process for Delay {
    fn invoke(&self, completion: Completion) -> ProtocolResult<()> {
        self.suspend.invoke(completion)
    }

    fn kill(&self) {
        self.suspend.kill()
    }

    fn state(&self) -> ProcessState {
        self.suspend.state()
    }

    fn name(&self) -> &'static str {
        self.suspend.name()
    }
}
