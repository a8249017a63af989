/*!
 * Suspend Process
 *
 * Wraps a single externally triggered completion. On invoke the handler
 * receives a [`Resume`] and may hand back a cancel hook. The external
 * event later calls `Resume::done`/`Resume::throw`; a kill runs the hook
 * and fails with `Killed`. Whichever path reaches the lifecycle first
 * wins, the other is dropped.
 *
 * The cancel hook is released on every exit path: called on kill,
 * dropped (without being called) on normal completion. A hook returned by
 * a handler that was killed while arming is called as soon as it is handed
 * back.
 */

use super::func::guarded;
use crate::core::errors::{ProcessError, ProtocolResult};
use crate::core::types::{Exit, ProcessState};
use crate::process::{Completion, KillRequest, Lifecycle, Process, Start};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Disarms the external trigger
pub type CancelHook = Box<dyn FnOnce() + Send + 'static>;

type Handler = Box<dyn FnOnce(Resume) -> Option<CancelHook> + Send + 'static>;

struct SuspendInner {
    lifecycle: Lifecycle,
    handler: Mutex<Option<Handler>>,
    cancel: Mutex<Option<CancelHook>>,
    killed: AtomicBool,
}

impl SuspendInner {
    fn complete(&self, exit: Exit) -> bool {
        let finished = self.lifecycle.finish(exit);
        if finished {
            // Release the trigger without firing it
            drop(self.cancel.lock().take());
        }
        finished
    }
}

/// Resumption handle passed to the suspend handler
///
/// Clonable; the first `done`/`throw` across all clones wins.
#[derive(Clone)]
pub struct Resume {
    inner: Arc<SuspendInner>,
}

impl Resume {
    /// Complete successfully; returns `false` if the process had already
    /// completed (killed or resumed before)
    pub fn done(&self) -> bool {
        self.inner.complete(Ok(()))
    }

    /// Fail with the given error; same return convention as `done`
    pub fn throw(&self, err: ProcessError) -> bool {
        self.inner.complete(Err(err))
    }

    pub fn is_pending(&self) -> bool {
        self.inner.lifecycle.state().is_running()
    }
}

impl std::fmt::Debug for Resume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resume")
            .field("state", &self.inner.lifecycle.state())
            .finish()
    }
}

/// Externally triggered process
pub struct Suspend {
    inner: Arc<SuspendInner>,
}

impl Suspend {
    /// Build from a handler that arms the external trigger
    pub fn new<F>(handler: F) -> Self
    where
        F: FnOnce(Resume) -> Option<CancelHook> + Send + 'static,
    {
        Self::named("suspend", handler)
    }

    pub(crate) fn named<F>(name: &'static str, handler: F) -> Self
    where
        F: FnOnce(Resume) -> Option<CancelHook> + Send + 'static,
    {
        Self {
            inner: Arc::new(SuspendInner {
                lifecycle: Lifecycle::new(name),
                handler: Mutex::new(Some(Box::new(handler))),
                cancel: Mutex::new(None),
                killed: AtomicBool::new(false),
            }),
        }
    }
}

impl Process for Suspend {
    fn invoke(&self, completion: Completion) -> ProtocolResult<()> {
        if self.inner.lifecycle.start(completion)? == Start::Killed {
            return Ok(());
        }

        let handler = self.inner.handler.lock().take();
        let Some(handler) = handler else {
            return Ok(());
        };

        let resume = Resume {
            inner: self.inner.clone(),
        };
        match guarded(move || handler(resume)) {
            Ok(Some(hook)) => {
                *self.inner.cancel.lock() = Some(hook);
                // Killed while the handler was still arming: disarm now
                if self.inner.killed.load(Ordering::SeqCst) {
                    let hook = self.inner.cancel.lock().take();
                    if let Some(hook) = hook {
                        hook();
                    }
                } else if self.inner.lifecycle.is_completed() {
                    drop(self.inner.cancel.lock().take());
                }
            }
            Ok(None) => {}
            Err(err) => {
                self.inner.complete(Err(err));
            }
        }
        Ok(())
    }

    fn kill(&self) {
        if self.inner.lifecycle.request_kill() != KillRequest::Running {
            return;
        }
        self.inner.killed.store(true, Ordering::SeqCst);
        let hook = self.inner.cancel.lock().take();
        if let Some(hook) = hook {
            hook();
        }
        self.inner.lifecycle.finish(Err(ProcessError::Killed));
    }

    fn state(&self) -> ProcessState {
        self.inner.lifecycle.state()
    }

    fn name(&self) -> &'static str {
        self.inner.lifecycle.name()
    }
}
