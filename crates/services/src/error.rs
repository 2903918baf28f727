//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{AnswerError, QuestionKey, SessionSummaryError};
use storage::repository::StorageError;

/// Errors emitted by quiz sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("session already completed")]
    Completed,
    #[error("no answer is expected right now")]
    NotAwaitingAnswer,
    #[error("the current question has already been answered")]
    AlreadyAnswered,
    #[error("the current question has not been answered yet")]
    NotAnswered,
    #[error("session is still in progress")]
    InProgress,
    #[error("no verification question is pending")]
    NoVerification,
    #[error("question {0} is no longer in the bank")]
    UnknownQuestion(QuestionKey),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the SQL trainer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TrainerError {
    #[error("no SQL commands loaded")]
    NoCommands,
    #[error("command index {index} is out of range for {len} commands")]
    OutOfRange { index: usize, len: usize },
    #[error("command {0} has no fragments to drill")]
    NoFragments(String),
    #[error("this drill is already finished")]
    Finished,
}
