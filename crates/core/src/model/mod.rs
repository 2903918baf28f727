pub mod answer;
mod command;
mod ids;
mod progress;
mod question;
mod session;
mod settings;

pub use answer::{AnswerError, AnswerInput, Presentation, is_correct, session_score};
pub use command::{CommandCategory, CommandError, CommandPart, SqlCommand};
pub use ids::{ParseIdError, QuestionId, QuestionKey};
pub use progress::{
    Achievement, COMMAND_HISTORY_LIMIT, CommandCompletion, CommandTally, QuestionTally, QuizStats,
    SqlStats, StudyDays, UserProgress,
};
pub use question::{
    Metrics, MetricsParseError, NOTE_SEPARATOR, QuestionDraft, QuestionError, QuestionRecord,
    SecondaryQuestion, append_note, note_entries,
};
pub use session::{SessionSummary, SessionSummaryError};
pub use settings::{SelectionPolicy, SessionSize, SettingsError, VerificationPolicy};
