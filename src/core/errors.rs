/*!
 * Error Types
 * Process failure taxonomy and protocol violations, with thiserror and miette
 */

use miette::Diagnostic;
use std::sync::Arc;
use thiserror::Error;

/// Runtime failure of a process
///
/// Every combinator relays these unchanged. `Exception` carries the user
/// failure behind an `Arc` so the error can be cloned into results and
/// relayed through shared completion paths.
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum ProcessError {
    #[error("Process was killed")]
    #[diagnostic(
        code(process::killed),
        help("A kill request reached the process before it completed.")
    )]
    Killed,

    #[error("Process failed: {0}")]
    #[diagnostic(
        code(process::exception),
        help("The wrapped computation or external trigger reported a failure.")
    )]
    Exception(Arc<anyhow::Error>),

    #[error("Protocol violation: {0}")]
    #[diagnostic(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ProcessError {
    /// Wrap any error as an `Exception`
    pub fn exception<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        ProcessError::Exception(Arc::new(err.into()))
    }

    /// Build an `Exception` from a plain message
    pub fn msg(message: impl std::fmt::Display) -> Self {
        ProcessError::Exception(Arc::new(anyhow::anyhow!("{}", message)))
    }

    /// Check whether this is the distinguished cancellation error
    #[inline]
    pub fn is_killed(&self) -> bool {
        matches!(self, ProcessError::Killed)
    }
}

impl From<anyhow::Error> for ProcessError {
    fn from(err: anyhow::Error) -> Self {
        ProcessError::Exception(Arc::new(err))
    }
}

/// Misuse of the single-invocation contract
///
/// These are programming errors, never produced by a correctly composed tree.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Diagnostic)]
pub enum ProtocolError {
    #[error("{0} was invoked more than once")]
    #[diagnostic(
        code(protocol::already_invoked),
        help("Processes are single-use. Build a fresh one (see Closure) for every run.")
    )]
    AlreadyInvoked(&'static str),

    #[error("{0} dropped its completion without signalling")]
    #[diagnostic(
        code(protocol::completion_dropped),
        help("A process must fire its completion exactly once, even when killed.")
    )]
    CompletionDropped(&'static str),
}

/// Result type for `Process::invoke`
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;
