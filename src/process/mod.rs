/*!
 * Process Module
 * Process contract, completion continuation and lifecycle state machine
 */

pub mod completion;
pub mod lifecycle;
pub mod traits;

// Re-export for convenience
pub use completion::Completion;
pub use lifecycle::{KillRequest, Lifecycle, Start};
pub use traits::{BoxProcess, Process, ProcessExt};
