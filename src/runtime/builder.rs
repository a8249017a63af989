/*!
 * Process Builder
 *
 * Shorthand constructors for process trees bound to one executor and one
 * timer. Every Delay built here arms on the builder's timer and, when an
 * executor is set, resumes on it. [`Builder::starter`] wraps a whole tree
 * so that its first invocation is itself submitted to the executor.
 *
 * ```ignore
 * let builder = Builder::new().with_executor(Arc::new(TokioExecutor::current()));
 * let root = builder.starter(|b| {
 *     b.seq(vec![
 *         b.func(|| println!("hello")),
 *         b.delay(Duration::from_secs(1)),
 *         b.func(|| println!("hello again")),
 *     ])
 * });
 * invoke_blocking(&root)?;
 * ```
 */

use super::executor::Executor;
use super::timer::{ThreadTimer, Timer};
use crate::combinators::{
    CancelHook, Closure, Delay, Empty, Func, If, Parallel, Resume, Sequence, Suspend, While,
};
use crate::config::RuntimeConfig;
use crate::core::errors::{ProcessError, ProtocolResult};
use crate::core::types::{Exit, ProcessState};
use crate::process::{BoxProcess, Completion, KillRequest, Lifecycle, Process, ProcessExt, Start};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Factory for process trees sharing an executor and a timer
#[derive(Clone)]
pub struct Builder {
    executor: Option<Arc<dyn Executor>>,
    timer: Arc<dyn Timer>,
}

impl Builder {
    /// Inline execution, thread-backed timer
    pub fn new() -> Self {
        Self {
            executor: None,
            timer: Arc::new(ThreadTimer::new()),
        }
    }

    /// Builder whose timer is selected by `config`
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            executor: None,
            timer: config.build_timer(),
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = timer;
        self
    }

    pub fn executor(&self) -> Option<&Arc<dyn Executor>> {
        self.executor.as_ref()
    }

    pub fn timer(&self) -> &Arc<dyn Timer> {
        &self.timer
    }

    pub fn seq(&self, children: Vec<BoxProcess>) -> BoxProcess {
        Sequence::new(children).boxed()
    }

    pub fn par(&self, children: Vec<BoxProcess>) -> BoxProcess {
        Parallel::new(children).boxed()
    }

    pub fn func<F>(&self, f: F) -> BoxProcess
    where
        F: FnOnce() + Send + 'static,
    {
        Func::infallible(f).boxed()
    }

    pub fn try_func<F>(&self, f: F) -> BoxProcess
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        Func::new(f).boxed()
    }

    pub fn delay(&self, duration: Duration) -> BoxProcess {
        Delay::with_timer(duration, self.timer.clone(), self.executor.clone()).boxed()
    }

    #[inline]
    pub fn delay_millis(&self, millis: u64) -> BoxProcess {
        self.delay(Duration::from_millis(millis))
    }

    pub fn closure<F>(&self, factory: F) -> BoxProcess
    where
        F: FnOnce() -> BoxProcess + Send + 'static,
    {
        Closure::new(factory).boxed()
    }

    pub fn while_loop<P, B>(&self, predicate: P, body: B) -> BoxProcess
    where
        P: Fn() -> bool + Send + Sync + 'static,
        B: Fn() -> BoxProcess + Send + Sync + 'static,
    {
        While::new(predicate, body).boxed()
    }

    /// Loop over a Sequence of the steps built by `steps`
    pub fn loop_seq<P, S>(&self, predicate: P, steps: S) -> BoxProcess
    where
        P: Fn() -> bool + Send + Sync + 'static,
        S: Fn() -> Vec<BoxProcess> + Send + Sync + 'static,
    {
        While::sequence(predicate, steps).boxed()
    }

    pub fn if_else<P>(
        &self,
        predicate: P,
        then_branch: BoxProcess,
        else_branch: BoxProcess,
    ) -> BoxProcess
    where
        P: FnOnce() -> bool + Send + 'static,
    {
        If::new(predicate, then_branch, else_branch).boxed()
    }

    pub fn if_then<P>(&self, predicate: P, then_branch: BoxProcess) -> BoxProcess
    where
        P: FnOnce() -> bool + Send + 'static,
    {
        If::then(predicate, then_branch).boxed()
    }

    pub fn suspend<F>(&self, handler: F) -> BoxProcess
    where
        F: FnOnce(Resume) -> Option<CancelHook> + Send + 'static,
    {
        Suspend::new(handler).boxed()
    }

    pub fn empty(&self) -> BoxProcess {
        Empty::new().boxed()
    }

    /// Build a tree and wrap it so its invocation runs on the executor
    pub fn starter<F>(&self, build: F) -> BoxProcess
    where
        F: FnOnce(&Builder) -> BoxProcess,
    {
        let child = build(self);
        Starter::new(child, self.executor.clone()).boxed()
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

struct StarterInner {
    lifecycle: Lifecycle,
    child: BoxProcess,
    killed: AtomicBool,
}

impl StarterInner {
    fn launch(self: &Arc<Self>) {
        let this = self.clone();
        let completion = Completion::new(move |exit: Exit| match exit {
            Ok(()) if this.killed.load(Ordering::Acquire) => {
                this.lifecycle.finish(Err(ProcessError::Killed));
            }
            exit => {
                this.lifecycle.finish(exit);
            }
        });
        if let Err(err) = self.child.invoke(completion) {
            self.lifecycle.finish(Err(err.into()));
        }
    }
}

/// Root wrapper that hands the first invocation to an executor
pub struct Starter {
    inner: Arc<StarterInner>,
    executor: Option<Arc<dyn Executor>>,
}

impl Starter {
    pub fn new(child: BoxProcess, executor: Option<Arc<dyn Executor>>) -> Self {
        Self {
            inner: Arc::new(StarterInner {
                lifecycle: Lifecycle::new("starter"),
                child,
                killed: AtomicBool::new(false),
            }),
            executor,
        }
    }
}

impl Process for Starter {
    fn invoke(&self, completion: Completion) -> ProtocolResult<()> {
        if self.inner.lifecycle.start(completion)? == Start::Killed {
            return Ok(());
        }

        match &self.executor {
            Some(executor) => {
                trace!(executor = executor.name(), "submitting root invocation");
                let inner = self.inner.clone();
                executor.submit(Box::new(move || inner.launch()));
            }
            None => self.inner.launch(),
        }
        Ok(())
    }

    fn kill(&self) {
        if self.inner.lifecycle.request_kill() != KillRequest::Running {
            return;
        }
        self.inner.killed.store(true, Ordering::Release);
        // Not yet launched: the child records a deferred kill
        self.inner.child.kill();
    }

    fn state(&self) -> ProcessState {
        self.inner.lifecycle.state()
    }

    fn name(&self) -> &'static str {
        self.inner.lifecycle.name()
    }
}
