/*!
 * Core Types
 * Common types shared by processes, combinators and the bridges
 */

use super::errors::ProcessError;
use serde::{Deserialize, Serialize};

/// What a process reports when it finishes
pub type Exit = Result<(), ProcessError>;

/// Lifecycle of a single process instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessState {
    /// Constructed, `invoke` not called yet
    NotStarted,
    /// Invoked, completion not signalled yet
    Running,
    /// Completion signalled; further signals are dropped
    Completed,
}

impl ProcessState {
    #[inline(always)]
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, ProcessState::Running)
    }

    #[inline(always)]
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, ProcessState::Completed)
    }
}

/// Kind tag of a [`PResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Done,
    Killed,
    Exception,
}

/// Tagged outcome of driving a process to completion
///
/// Serializes as `{"kind": ..., "error": ...}`; an exception's error is
/// carried as its message only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "PResultRepr", from = "PResultRepr")]
pub enum PResult {
    Done,
    Killed,
    Exception(ProcessError),
}

impl PResult {
    /// Classify an exit
    pub fn from_exit(exit: Exit) -> Self {
        match exit {
            Ok(()) => PResult::Done,
            Err(ProcessError::Killed) => PResult::Killed,
            Err(err) => PResult::Exception(err),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ResultKind {
        match self {
            PResult::Done => ResultKind::Done,
            PResult::Killed => ResultKind::Killed,
            PResult::Exception(_) => ResultKind::Exception,
        }
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        matches!(self, PResult::Done)
    }

    /// Return normally for `Done`, raise the captured error otherwise
    pub fn into_result(self) -> Exit {
        match self {
            PResult::Done => Ok(()),
            PResult::Killed => Err(ProcessError::Killed),
            PResult::Exception(err) => Err(err),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct PResultRepr {
    kind: ResultKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<PResult> for PResultRepr {
    fn from(result: PResult) -> Self {
        let kind = result.kind();
        let error = match result {
            PResult::Exception(ProcessError::Exception(err)) => Some(err.to_string()),
            PResult::Exception(err) => Some(err.to_string()),
            _ => None,
        };
        Self { kind, error }
    }
}

impl From<PResultRepr> for PResult {
    fn from(repr: PResultRepr) -> Self {
        match repr.kind {
            ResultKind::Done => PResult::Done,
            ResultKind::Killed => PResult::Killed,
            ResultKind::Exception => {
                PResult::Exception(ProcessError::msg(repr.error.unwrap_or_default()))
            }
        }
    }
}

impl From<Exit> for PResult {
    fn from(exit: Exit) -> Self {
        PResult::from_exit(exit)
    }
}
