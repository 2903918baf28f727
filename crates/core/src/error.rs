use thiserror::Error;

use crate::mastery::MasteryPolicyError;
use crate::model::{CommandError, QuestionError, SessionSummaryError, SettingsError};

/// Umbrella error for callers that mix several domain validations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Mastery(#[from] MasteryPolicyError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
}
