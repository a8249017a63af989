/*!
 * Process Traits
 * The composable unit of asynchronous work
 */

use super::completion::Completion;
use crate::core::errors::ProtocolResult;
use crate::core::types::ProcessState;

/// A single-use, single-completion computation
///
/// The owner hands a [`Completion`] to `invoke`; exactly one exit is
/// delivered through it, synchronously or from another thread. `kill` may
/// be called in any state and from any thread:
///
/// - before `invoke`: the kill is deferred (variant-specific, see each type)
/// - while running: the variant's cancellation behaviour runs
/// - after completion: no-op
///
/// Implementations must not hold internal locks while calling children or
/// firing completions.
pub trait Process: Send + Sync + 'static {
    /// Start the computation
    ///
    /// Returns `Err` only when the process was already invoked; the given
    /// completion is then dropped without firing.
    fn invoke(&self, completion: Completion) -> ProtocolResult<()>;

    /// Request cancellation
    fn kill(&self);

    /// Current lifecycle state
    fn state(&self) -> ProcessState;

    /// Static variant name for logging/debugging
    fn name(&self) -> &'static str;
}

/// Owned, type-erased process; the only form combinators accept as children
pub type BoxProcess = Box<dyn Process>;

impl<P> Process for Box<P>
where
    P: Process + ?Sized,
{
    #[inline]
    fn invoke(&self, completion: Completion) -> ProtocolResult<()> {
        (**self).invoke(completion)
    }

    #[inline]
    fn kill(&self) {
        (**self).kill()
    }

    #[inline]
    fn state(&self) -> ProcessState {
        (**self).state()
    }

    #[inline]
    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Shared handle to a process
///
/// Extra clones are for observing `state` and for `kill` only. A process
/// still runs under at most one parent: a second `invoke` through any
/// clone is rejected with [`ProtocolError::AlreadyInvoked`].
///
/// [`ProtocolError::AlreadyInvoked`]: crate::core::errors::ProtocolError::AlreadyInvoked
impl<P> Process for std::sync::Arc<P>
where
    P: Process + ?Sized,
{
    #[inline]
    fn invoke(&self, completion: Completion) -> ProtocolResult<()> {
        (**self).invoke(completion)
    }

    #[inline]
    fn kill(&self) {
        (**self).kill()
    }

    #[inline]
    fn state(&self) -> ProcessState {
        (**self).state()
    }

    #[inline]
    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Convenience conversions for concrete processes
pub trait ProcessExt: Process + Sized {
    /// Erase the concrete type
    fn boxed(self) -> BoxProcess {
        Box::new(self)
    }
}

impl<P: Process + Sized> ProcessExt for P {}
