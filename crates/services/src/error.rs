//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{QuestionId, SessionSummaryError};
use storage::StorageError;

/// Errors emitted by the adaptive selector.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SelectError {
    /// Every question is excluded; reset the exclusion set or end the session.
    #[error("no eligible questions remain")]
    Exhausted,
}

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("session has not been started")]
    NotStarted,
    #[error("session already started")]
    AlreadyStarted,
    #[error("session already completed")]
    Completed,
    #[error("session is still in progress")]
    NotCompleted,
    #[error("option {selected} is out of range for {options} options")]
    InvalidInput { selected: usize, options: usize },
    #[error("question {0} is not in the bank")]
    UnknownQuestion(QuestionId),
    #[error(transparent)]
    Select(#[from] SelectError),
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
