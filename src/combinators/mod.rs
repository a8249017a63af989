/*!
 * Combinators
 * Process variants: leaves (Func, Suspend, Delay, Empty) and composites
 * (Sequence, Parallel, Closure, While, If)
 */

pub mod branch;
pub mod closure;
pub mod delay;
pub mod empty;
pub mod func;
pub mod parallel;
pub mod sequence;
pub mod suspend;
pub mod while_loop;

mod trampoline;

// Re-export for convenience
pub use branch::{Branch, If};
pub use closure::Closure;
pub use delay::Delay;
pub use empty::Empty;
pub use func::Func;
pub use parallel::Parallel;
pub use sequence::Sequence;
pub use suspend::{CancelHook, Resume, Suspend};
pub use while_loop::While;
