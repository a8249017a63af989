/*!
 * Sequence Combinator
 *
 * Runs children one at a time in list order. Child `i + 1` is never
 * invoked before child `i` completes; the first failure is relayed and the
 * remaining children are never invoked.
 *
 * # Kill
 *
 * Sets `killed` and forwards to the child at the cursor. A child that
 * honours the kill fails with `Killed`, which is relayed. A child that
 * ignores it (Func) completes normally; the step then sees `killed` and
 * fails the sequence with `Killed` instead of advancing.
 */

use super::trampoline::Trampoline;
use crate::core::errors::{ProcessError, ProtocolResult};
use crate::core::types::{Exit, ProcessState};
use crate::process::{BoxProcess, Completion, KillRequest, Lifecycle, Process, Start};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::trace;

struct SequenceInner {
    lifecycle: Lifecycle,
    children: Vec<BoxProcess>,
    cursor: AtomicUsize,
    killed: AtomicBool,
    trampoline: Trampoline,
}

impl SequenceInner {
    /// Invoke children starting at the cursor until one suspends
    fn drive(self: &Arc<Self>) {
        loop {
            if self.killed.load(Ordering::SeqCst) {
                self.lifecycle.finish(Err(ProcessError::Killed));
                return;
            }

            let index = self.cursor.load(Ordering::SeqCst);
            let Some(child) = self.children.get(index) else {
                self.lifecycle.finish(Ok(()));
                return;
            };
            trace!(index, child = child.name(), "sequence step");

            let this = self.clone();
            self.trampoline.enter();
            if let Err(err) = child.invoke(Completion::new(move |exit| this.on_child_exit(exit))) {
                self.trampoline.settle();
                self.lifecycle.finish(Err(err.into()));
                return;
            }

            if !self.trampoline.settle() {
                return;
            }
        }
    }

    fn on_child_exit(self: &Arc<Self>, exit: Exit) {
        if let Err(err) = exit {
            self.lifecycle.finish(Err(err));
            return;
        }

        self.cursor.fetch_add(1, Ordering::SeqCst);
        if !self.trampoline.bounce() {
            self.drive();
        }
    }
}

/// Ordered composition
pub struct Sequence {
    inner: Arc<SequenceInner>,
}

impl Sequence {
    pub fn new(children: Vec<BoxProcess>) -> Self {
        Self {
            inner: Arc::new(SequenceInner {
                lifecycle: Lifecycle::new("sequence"),
                children,
                cursor: AtomicUsize::new(0),
                killed: AtomicBool::new(false),
                trampoline: Trampoline::new(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.children.is_empty()
    }
}

impl FromIterator<BoxProcess> for Sequence {
    fn from_iter<I: IntoIterator<Item = BoxProcess>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Process for Sequence {
    fn invoke(&self, completion: Completion) -> ProtocolResult<()> {
        if self.inner.lifecycle.start(completion)? == Start::Run {
            self.inner.drive();
        }
        Ok(())
    }

    fn kill(&self) {
        if self.inner.lifecycle.request_kill() != KillRequest::Running {
            return;
        }
        // Either the driver sees `killed` or this sees the advanced cursor
        self.inner.killed.store(true, Ordering::SeqCst);

        let index = self.inner.cursor.load(Ordering::SeqCst);
        if let Some(child) = self.inner.children.get(index) {
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
