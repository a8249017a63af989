/*!
 * Process Lifecycle
 *
 * Per-instance state machine backing the single-invocation,
 * single-completion contract:
 *
 * ```text
 * NotStarted --invoke--> Running --finish--> Completed
 *     |                                         ^
 *     +--kill (deferred), then invoke ----------+
 * ```
 *
 * The completion lives inside the `Running` state. `finish` moves it out
 * under the lock and fires it after the lock is released, so whichever of
 * the racing paths (normal exit, failure, kill) arrives first wins and the
 * others are dropped.
 */

use super::completion::Completion;
use crate::core::errors::{ProcessError, ProtocolError, ProtocolResult};
use crate::core::types::{Exit, ProcessState};
use parking_lot::Mutex;
use std::mem;
use tracing::{debug, trace, warn};

enum Phase {
    NotStarted { kill_pending: bool },
    Running(Completion),
    Completed,
}

/// Outcome of [`Lifecycle::start`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Start {
    /// The caller should begin its work
    Run,
    /// A deferred kill was consumed; the completion already fired `Killed`
    Killed,
}

/// Outcome of [`Lifecycle::request_kill`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillRequest {
    /// Not invoked yet; the kill is recorded for the next `start`
    Deferred,
    /// Running; the caller must perform its cancellation behaviour
    Running,
    /// Already completed; nothing to do
    Completed,
}

/// Lifecycle state machine owned by every process variant
pub struct Lifecycle {
    name: &'static str,
    phase: Mutex<Phase>,
}

impl Lifecycle {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            phase: Mutex::new(Phase::NotStarted {
                kill_pending: false,
            }),
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Move to `Running`, taking ownership of the completion
    pub fn start(&self, completion: Completion) -> ProtocolResult<Start> {
        let mut phase = self.phase.lock();
        match *phase {
            Phase::NotStarted {
                kill_pending: false,
            } => {
                *phase = Phase::Running(completion);
                drop(phase);
                debug!(process = self.name, "invoked");
                Ok(Start::Run)
            }
            Phase::NotStarted { kill_pending: true } => {
                *phase = Phase::Completed;
                drop(phase);
                debug!(process = self.name, "invoked after kill, failing immediately");
                completion.throw(ProcessError::Killed);
                Ok(Start::Killed)
            }
            Phase::Running(_) | Phase::Completed => {
                drop(phase);
                warn!(process = self.name, "rejected second invoke");
                Err(ProtocolError::AlreadyInvoked(self.name))
            }
        }
    }

    /// Deliver the exit if still running
    ///
    /// Returns `false` when the process had already completed; the exit is
    /// dropped in that case.
    pub fn finish(&self, exit: Exit) -> bool {
        let completion = {
            let mut phase = self.phase.lock();
            match mem::replace(&mut *phase, Phase::Completed) {
                Phase::Running(completion) => completion,
                other => {
                    *phase = other;
                    trace!(process = self.name, "dropping late completion signal");
                    return false;
                }
            }
        };

        match &exit {
            Ok(()) => debug!(process = self.name, "completed"),
            Err(err) => debug!(process = self.name, error = %err, "failed"),
        }
        completion.complete(exit);
        true
    }

    /// Record a kill request and report what the caller must do
    pub fn request_kill(&self) -> KillRequest {
        let mut phase = self.phase.lock();
        let request = match &mut *phase {
            Phase::NotStarted { kill_pending } => {
                *kill_pending = true;
                KillRequest::Deferred
            }
            Phase::Running(_) => KillRequest::Running,
            Phase::Completed => KillRequest::Completed,
        };
        drop(phase);
        trace!(process = self.name, ?request, "kill requested");
        request
    }

    pub fn state(&self) -> ProcessState {
        match *self.phase.lock() {
            Phase::NotStarted { .. } => ProcessState::NotStarted,
            Phase::Running(_) => ProcessState::Running,
            Phase::Completed => ProcessState::Completed,
        }
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.state().is_completed()
    }
}
