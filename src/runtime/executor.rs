/*!
 * Execution Context
 *
 * The single capability the core consumes from a dispatcher: submit a
 * zero-argument callback for later execution. Without an executor,
 * completions run synchronously on whichever thread triggers them.
 */

use tokio::runtime::Handle;
use tracing::trace;

/// Unit of work handed to an executor
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Work-dispatch boundary
pub trait Executor: Send + Sync {
    /// Schedule `task` for execution
    fn submit(&self, task: Task);

    /// Executor name for debugging
    fn name(&self) -> &'static str;
}

/// Runs every task immediately on the submitting thread
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    #[inline]
    fn submit(&self, task: Task) {
        task()
    }

    fn name(&self) -> &'static str {
        "inline"
    }
}

/// Submits tasks onto a tokio runtime
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime of the calling context
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Executor for TokioExecutor {
    fn submit(&self, task: Task) {
        trace!("submitting task to tokio runtime");
        self.handle.spawn(async move { task() });
    }

    fn name(&self) -> &'static str {
        "tokio"
    }
}
