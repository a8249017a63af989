/*!
 * Completion Continuation
 *
 * One-shot result channel handed to a process at invoke time. Firing
 * consumes the value, so a single `Completion` can never signal twice.
 */

use crate::core::errors::ProcessError;
use crate::core::types::Exit;
use std::fmt;

type Continuation = Box<dyn FnOnce(Exit) + Send + 'static>;

/// Continuation receiving a process exit
pub struct Completion {
    continuation: Continuation,
}

impl Completion {
    /// Wrap a continuation
    pub fn new<F>(continuation: F) -> Self
    where
        F: FnOnce(Exit) + Send + 'static,
    {
        Self {
            continuation: Box::new(continuation),
        }
    }

    /// Completion that discards the exit
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Split handlers for success and failure
    pub fn from_handlers<D, T>(on_done: D, on_throw: T) -> Self
    where
        D: FnOnce() + Send + 'static,
        T: FnOnce(ProcessError) + Send + 'static,
    {
        Self::new(move |exit| match exit {
            Ok(()) => on_done(),
            Err(err) => on_throw(err),
        })
    }

    /// Deliver an exit
    #[inline]
    pub fn complete(self, exit: Exit) {
        (self.continuation)(exit)
    }

    #[inline]
    pub fn done(self) {
        self.complete(Ok(()))
    }

    #[inline]
    pub fn throw(self, err: ProcessError) {
        self.complete(Err(err))
    }
}

impl Default for Completion {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion").finish_non_exhaustive()
    }
}
