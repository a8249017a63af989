/*!
 * Closure Combinator
 *
 * Defers construction of its child until invoke time. The factory runs
 * exactly once, during `invoke`, never at construction; this lets callers
 * capture fresh state per run and return "the process to wait on" without
 * building it until someone waits.
 */

use super::func::guarded;
use crate::core::errors::{ProcessError, ProtocolResult};
use crate::core::types::{Exit, ProcessState};
use crate::process::{BoxProcess, Completion, KillRequest, Lifecycle, Process, Start};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Factory = Box<dyn FnOnce() -> BoxProcess + Send + 'static>;

struct ClosureInner {
    lifecycle: Lifecycle,
    factory: Mutex<Option<Factory>>,
    child: Mutex<Option<Arc<dyn Process>>>,
    killed: AtomicBool,
}

impl ClosureInner {
    fn on_child_exit(&self, exit: Exit) {
        match exit {
            Ok(()) if self.killed.load(Ordering::Acquire) => {
                self.lifecycle.finish(Err(ProcessError::Killed))
            }
            exit => self.lifecycle.finish(exit),
        };
    }
}

/// Lazily constructed process
pub struct Closure {
    inner: Arc<ClosureInner>,
}

impl Closure {
    pub fn new<F>(factory: F) -> Self
    where
        F: FnOnce() -> BoxProcess + Send + 'static,
    {
        Self {
            inner: Arc::new(ClosureInner {
                lifecycle: Lifecycle::new("closure"),
                factory: Mutex::new(Some(Box::new(factory))),
                child: Mutex::new(None),
                killed: AtomicBool::new(false),
            }),
        }
    }
}

impl Process for Closure {
    fn invoke(&self, completion: Completion) -> ProtocolResult<()> {
        if self.inner.lifecycle.start(completion)? == Start::Killed {
            return Ok(());
        }

        let factory = self.inner.factory.lock().take();
        let Some(factory) = factory else {
            return Ok(());
        };
        let child = match guarded(factory) {
            Ok(child) => Arc::<dyn Process>::from(child),
            Err(err) => {
                self.inner.lifecycle.finish(Err(err));
                return Ok(());
            }
        };
        *self.inner.child.lock() = Some(child.clone());

        // Killed while the factory was running
        if self.inner.killed.load(Ordering::Acquire) {
            self.inner.lifecycle.finish(Err(ProcessError::Killed));
            return Ok(());
        }

        let this = self.inner.clone();
        if let Err(err) = child.invoke(Completion::new(move |exit| this.on_child_exit(exit))) {
            self.inner.lifecycle.finish(Err(err.into()));
        }
        Ok(())
    }

    fn kill(&self) {
        if self.inner.lifecycle.request_kill() != KillRequest::Running {
            return;
        }
        self.inner.killed.store(true, Ordering::Release);

        let child = self.inner.child.lock().clone();
        if let Some(child) = child {
            child.kill();
        }
    }

    fn state(&self) -> ProcessState {
        self.inner.lifecycle.state()
    }

    fn name(&self) -> &'static str {
        self.inner.lifecycle.name()
    }
}
