/*!
 * While Combinator
 *
 * Re-runs a body while a predicate holds. Processes are single-use, so the
 * body is given as a factory and a fresh body is built for every
 * iteration. The predicate is evaluated before each iteration, including
 * the first; a predicate that is false immediately completes the loop
 * without building a body.
 *
 * # Kill
 *
 * Sets `killed` and forwards to the running body. The loop then fails with
 * `Killed`: either relayed from a body that honours the kill, or raised at
 * the next predicate check if the body completes normally anyway. A body
 * built after the kill landed is never invoked.
 */

use super::func::guarded;
use super::sequence::Sequence;
use super::trampoline::Trampoline;
use crate::core::errors::{ProcessError, ProtocolResult};
use crate::core::types::{Exit, ProcessState};
use crate::process::{BoxProcess, Completion, KillRequest, Lifecycle, Process, ProcessExt, Start};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

type Predicate = Box<dyn Fn() -> bool + Send + Sync + 'static>;
type BodyFactory = Box<dyn Fn() -> BoxProcess + Send + Sync + 'static>;

struct WhileInner {
    lifecycle: Lifecycle,
    predicate: Predicate,
    body: BodyFactory,
    current: Mutex<Option<Arc<dyn Process>>>,
    iterations: AtomicU64,
    killed: AtomicBool,
    trampoline: Trampoline,
}

impl WhileInner {
    fn drive(self: &Arc<Self>) {
        loop {
            if self.killed.load(Ordering::SeqCst) {
                self.lifecycle.finish(Err(ProcessError::Killed));
                return;
            }

            match guarded(|| (self.predicate)()) {
                Ok(true) => {}
                Ok(false) => {
                    trace!(
                        iterations = self.iterations.load(Ordering::Relaxed),
                        "loop exit"
                    );
                    self.lifecycle.finish(Ok(()));
                    return;
                }
                Err(err) => {
                    self.lifecycle.finish(Err(err));
                    return;
                }
            }

            let body = match guarded(|| (self.body)()) {
                Ok(body) => Arc::<dyn Process>::from(body),
                Err(err) => {
                    self.lifecycle.finish(Err(err));
                    return;
                }
            };
            *self.current.lock() = Some(body.clone());

            // Killed between the check above and publishing the new body
            if self.killed.load(Ordering::SeqCst) {
                self.lifecycle.finish(Err(ProcessError::Killed));
                return;
            }
            self.iterations.fetch_add(1, Ordering::Relaxed);

            let this = self.clone();
            self.trampoline.enter();
            if let Err(err) = body.invoke(Completion::new(move |exit| this.on_body_exit(exit))) {
                self.trampoline.settle();
                self.lifecycle.finish(Err(err.into()));
                return;
            }

            if !self.trampoline.settle() {
                return;
            }
        }
    }

    fn on_body_exit(self: &Arc<Self>, exit: Exit) {
        if let Err(err) = exit {
            self.lifecycle.finish(Err(err));
            return;
        }
        if !self.trampoline.bounce() {
            self.drive();
        }
    }
}

/// Bounded loop
pub struct While {
    inner: Arc<WhileInner>,
}

impl While {
    /// Loop building a fresh body from `body` each iteration
    pub fn new<P, B>(predicate: P, body: B) -> Self
    where
        P: Fn() -> bool + Send + Sync + 'static,
        B: Fn() -> BoxProcess + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(WhileInner {
                lifecycle: Lifecycle::new("while"),
                predicate: Box::new(predicate),
                body: Box::new(body),
                current: Mutex::new(None),
                iterations: AtomicU64::new(0),
                killed: AtomicBool::new(false),
                trampoline: Trampoline::new(),
            }),
        }
    }

    /// Loop whose body is a Sequence of the steps built by `steps`
    pub fn sequence<P, S>(predicate: P, steps: S) -> Self
    where
        P: Fn() -> bool + Send + Sync + 'static,
        S: Fn() -> Vec<BoxProcess> + Send + Sync + 'static,
    {
        Self::new(predicate, move || Sequence::new(steps()).boxed())
    }

    /// Number of bodies started so far
    pub fn iterations(&self) -> u64 {
        self.inner.iterations.load(Ordering::Relaxed)
    }
}

impl Process for While {
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
        self.inner.killed.store(true, Ordering::SeqCst);

        let body = self.inner.current.lock().clone();
        if let Some(body) = body {
            body.kill();
        }
    }

    fn state(&self) -> ProcessState {
        self.inner.lifecycle.state()
    }

    fn name(&self) -> &'static str {
        self.inner.lifecycle.name()
    }
}
