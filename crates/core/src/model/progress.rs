use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Completed SQL drills kept in the rolling history.
pub const COMMAND_HISTORY_LIMIT: usize = 100;

/// Persisted study progress across quiz and SQL trainer sessions.
///
/// Every field defaults so files written by older builds still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProgress {
    pub sessions_started: u32,
    pub sessions_completed: u32,
    pub study_minutes: f64,
    pub quiz: QuizStats,
    pub sql: SqlStats,
    pub study_days: StudyDays,
    pub achievements: Vec<Achievement>,
}

impl UserProgress {
    #[must_use]
    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.iter().any(|a| a.id == id)
    }

    /// Quiz accuracy in percent; `0.0` before the first answer.
    #[must_use]
    pub fn quiz_accuracy(&self) -> f64 {
        percent(self.quiz.correct, self.quiz.answered)
    }

    /// Share of SQL attempts that were not errors, in percent.
    #[must_use]
    pub fn sql_accuracy(&self) -> f64 {
        percent(
            self.sql.attempts.saturating_sub(self.sql.errors),
            self.sql.attempts,
        )
    }
}

fn percent(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    100.0 * f64::from(part) / f64::from(whole)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizStats {
    pub answered: u32,
    pub correct: u32,
    pub current_streak: u32,
    pub best_streak: u32,
    /// Keyed by `"<file stem>/<section>/<id>"`.
    pub questions: BTreeMap<String, QuestionTally>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionTally {
    pub correct: u32,
    pub incorrect: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlStats {
    pub attempts: u32,
    pub errors: u32,
    pub completed: u32,
    pub completed_ids: BTreeSet<String>,
    pub current_streak: u32,
    pub best_streak: u32,
    pub fastest_seconds: Option<f64>,
    pub commands: BTreeMap<String, CommandTally>,
    pub history: Vec<CommandCompletion>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandTally {
    pub attempts: u32,
    pub correct: u32,
    pub errors: u32,
}

/// One finished drill in the rolling history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandCompletion {
    pub command_id: String,
    pub attempts: u32,
    pub errors: u32,
    pub elapsed_seconds: f64,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyDays {
    pub current_streak: u32,
    pub best_streak: u32,
    pub last_study_date: Option<NaiveDate>,
}

impl StudyDays {
    /// Register study activity on `today`.
    ///
    /// The same day twice is a no-op; the day after the last one extends the streak;
    /// any gap (or a clock that went backwards) restarts it at one.
    pub fn touch(&mut self, today: NaiveDate) {
        match self.last_study_date {
            Some(last) if last == today => return,
            Some(last) if last.succ_opt() == Some(today) => {
                self.current_streak = self.current_streak.saturating_add(1);
            }
            _ => self.current_streak = 1,
        }
        self.best_streak = self.best_streak.max(self.current_streak);
        self.last_study_date = Some(today);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub unlocked_at: DateTime<Utc>,
}
