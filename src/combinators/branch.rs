/*!
 * If Combinator
 *
 * Evaluates the predicate once at invoke time and runs the selected
 * branch. The other branch is never invoked. A kill that arrives before
 * the predicate has been evaluated is deferred by the lifecycle; one that
 * arrives after goes to the active branch.
 */

use super::empty::Empty;
use super::func::guarded;
use crate::core::errors::{ProcessError, ProtocolResult};
use crate::core::types::{Exit, ProcessState};
use crate::process::{BoxProcess, Completion, KillRequest, Lifecycle, Process, ProcessExt, Start};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Predicate = Box<dyn FnOnce() -> bool + Send + 'static>;

/// Which branch `If` selected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Then,
    Else,
}

struct IfInner {
    lifecycle: Lifecycle,
    predicate: Mutex<Option<Predicate>>,
    then_branch: BoxProcess,
    else_branch: BoxProcess,
    active: Mutex<Option<Branch>>,
    killed: AtomicBool,
}

impl IfInner {
    fn branch(&self, branch: Branch) -> &BoxProcess {
        match branch {
            Branch::Then => &self.then_branch,
            Branch::Else => &self.else_branch,
        }
    }

    fn on_branch_exit(&self, exit: Exit) {
        match exit {
            Ok(()) if self.killed.load(Ordering::Acquire) => {
                self.lifecycle.finish(Err(ProcessError::Killed))
            }
            exit => self.lifecycle.finish(exit),
        };
    }
}

/// Conditional composition
pub struct If {
    inner: Arc<IfInner>,
}

impl If {
    pub fn new<P>(predicate: P, then_branch: BoxProcess, else_branch: BoxProcess) -> Self
    where
        P: FnOnce() -> bool + Send + 'static,
    {
        Self {
            inner: Arc::new(IfInner {
                lifecycle: Lifecycle::new("if"),
                predicate: Mutex::new(Some(Box::new(predicate))),
                then_branch,
                else_branch,
                active: Mutex::new(None),
                killed: AtomicBool::new(false),
            }),
        }
    }

    /// Conditional with an `Empty` else branch
    pub fn then<P>(predicate: P, then_branch: BoxProcess) -> Self
    where
        P: FnOnce() -> bool + Send + 'static,
    {
        Self::new(predicate, then_branch, Empty::new().boxed())
    }

    /// Branch selected by the last invoke, if any
    pub fn active_branch(&self) -> Option<Branch> {
        *self.inner.active.lock()
    }
}

impl Process for If {
    fn invoke(&self, completion: Completion) -> ProtocolResult<()> {
        if self.inner.lifecycle.start(completion)? == Start::Killed {
            return Ok(());
        }

        let predicate = self.inner.predicate.lock().take();
        let Some(predicate) = predicate else {
            return Ok(());
        };
        let branch = match guarded(predicate) {
            Ok(true) => Branch::Then,
            Ok(false) => Branch::Else,
            Err(err) => {
                self.inner.lifecycle.finish(Err(err));
                return Ok(());
            }
        };
        *self.inner.active.lock() = Some(branch);

        if self.inner.killed.load(Ordering::Acquire) {
            self.inner.lifecycle.finish(Err(ProcessError::Killed));
            return Ok(());
        }

        let this = self.inner.clone();
        let child = self.inner.branch(branch);
        if let Err(err) = child.invoke(Completion::new(move |exit| this.on_branch_exit(exit))) {
            self.inner.lifecycle.finish(Err(err.into()));
        }
        Ok(())
    }

    fn kill(&self) {
        if self.inner.lifecycle.request_kill() != KillRequest::Running {
            return;
        }
        self.inner.killed.store(true, Ordering::Release);

        let active = *self.inner.active.lock();
        if let Some(branch) = active {
            self.inner.branch(branch).kill();
        }
    }

    fn state(&self) -> ProcessState {
        self.inner.lifecycle.state()
    }

    fn name(&self) -> &'static str {
        self.inner.lifecycle.name()
    }
}
