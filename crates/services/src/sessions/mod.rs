mod plan;
mod progress;
mod service;
mod workflow;

// Public API of the quiz session subsystem.
pub use crate::error::SessionError;
pub use plan::{BankFilter, SessionBuilder, SessionPlan, select};
pub use progress::SessionProgress;
pub use service::{
    AnswerFeedback, QuestionResult, QuestionView, QuizSession, SessionState, VerificationKind,
    VerificationOutcome, VerificationPrompt,
};
pub use workflow::{Advanced, CompletedSession, InputResult, QuizLoopService, StartedSession};
