/*!
 * Runtime Boundary
 * Executor and timer backends, blocking and async bridges, tree builder
 */

pub mod blocking;
pub mod builder;
pub mod executor;
pub mod future;
pub mod timer;

// Re-export for convenience
pub use blocking::{invoke_blocking, invoke_blocking_timeout, run_blocking};
pub use builder::{Builder, Starter};
pub use executor::{Executor, InlineExecutor, Task, TokioExecutor};
pub use future::{into_future, ProcessFuture};
pub use timer::{ThreadTimer, Timer, TimerCallback, TimerError, TimerGuard, TokioTimer};
