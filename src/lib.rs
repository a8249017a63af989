/*!
 * Procflow
 * Composable, cancellable asynchronous processes
 *
 * A process is a single-use unit of work that is invoked once and reports
 * exactly one exit through its completion: success, `Killed`, or an
 * exception. Combinators (Sequence, Parallel, While, If, Closure) build
 * trees out of leaves (Func, Suspend, Delay, Empty); bridges drive a tree
 * to completion from blocking or async code.
 */

pub mod collections;
pub mod combinators;
pub mod config;
pub mod core;
pub mod monitoring;
pub mod process;
pub mod runtime;

// Re-exports
pub use collections::WaitList;
pub use combinators::{
    Branch, CancelHook, Closure, Delay, Empty, Func, If, Parallel, Resume, Sequence, Suspend,
    While,
};
pub use config::{ConfigError, RuntimeConfig, TimerKind};
pub use crate::core::{
    Exit, PResult, ProcessError, ProcessState, ProtocolError, ProtocolResult, ResultKind,
};
pub use monitoring::init_tracing;
pub use process::{BoxProcess, Completion, Process, ProcessExt};
pub use runtime::{
    into_future, invoke_blocking, invoke_blocking_timeout, run_blocking, Builder, Executor,
    InlineExecutor, ProcessFuture, ThreadTimer, Timer, TimerGuard, TokioExecutor, TokioTimer,
};
