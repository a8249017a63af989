/*!
 * Parallel Combinator
 *
 * Starts every child in list order and completes once all of them have
 * completed. Children race; no ordering among their completions is
 * guaranteed.
 *
 * # Failure policy
 *
 * The first child failure is relayed immediately. Siblings are NOT
 * cancelled and keep running; their later exits are dropped by the
 * lifecycle. Callers wanting fail-fast cleanup kill the parallel from
 * their `on_throw` handler.
 *
 * # Kill
 *
 * Forwarded to every child unconditionally. If every child ignores the
 * kill and completes normally, the parallel still fails with `Killed`.
 */

use crate::core::errors::{ProcessError, ProtocolResult};
use crate::core::types::{Exit, ProcessState};
use crate::process::{BoxProcess, Completion, KillRequest, Lifecycle, Process, Start};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::trace;

struct ParallelInner {
    lifecycle: Lifecycle,
    children: Vec<BoxProcess>,
    done_count: AtomicUsize,
    killed: AtomicBool,
}

impl ParallelInner {
    fn on_child_exit(&self, exit: Exit) {
        if let Err(err) = exit {
            self.lifecycle.finish(Err(err));
            return;
        }

        let done = self.done_count.fetch_add(1, Ordering::AcqRel) + 1;
        trace!(done, total = self.children.len(), "parallel child done");
        if done == self.children.len() {
            if self.killed.load(Ordering::Acquire) {
                self.lifecycle.finish(Err(ProcessError::Killed));
            } else {
                self.lifecycle.finish(Ok(()));
            }
        }
    }
}

/// Concurrent composition (fan-out / fan-in)
pub struct Parallel {
    inner: Arc<ParallelInner>,
}

impl Parallel {
    pub fn new(children: Vec<BoxProcess>) -> Self {
        Self {
            inner: Arc::new(ParallelInner {
                lifecycle: Lifecycle::new("parallel"),
                children,
                done_count: AtomicUsize::new(0),
                killed: AtomicBool::new(false),
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

impl FromIterator<BoxProcess> for Parallel {
    fn from_iter<I: IntoIterator<Item = BoxProcess>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Process for Parallel {
    fn invoke(&self, completion: Completion) -> ProtocolResult<()> {
        if self.inner.lifecycle.start(completion)? == Start::Killed {
            return Ok(());
        }
        if self.inner.children.is_empty() {
            self.inner.lifecycle.finish(Ok(()));
            return Ok(());
        }

        for child in &self.inner.children {
            let this = self.inner.clone();
            if let Err(err) = child.invoke(Completion::new(move |exit| this.on_child_exit(exit))) {
                self.inner.lifecycle.finish(Err(err.into()));
                break;
            }
        }
        Ok(())
    }

    fn kill(&self) {
        if self.inner.lifecycle.request_kill() != KillRequest::Running {
            return;
        }
        self.inner.killed.store(true, Ordering::Release);
        for child in &self.inner.children {
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
