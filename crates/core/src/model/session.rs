use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::answer::session_score;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("correct answers ({correct}) exceed questions asked ({asked})")]
    CountMismatch { asked: u32, correct: u32 },
}

/// Aggregate summary for a finished quiz session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    asked: u32,
    correct: u32,
    verifications_passed: u32,
    verifications_failed: u32,
}

impl SessionSummary {
    /// # Errors
    ///
    /// Returns `SessionSummaryError::InvalidTimeRange` if `completed_at` is before
    /// `started_at`, and `SessionSummaryError::CountMismatch` if `correct > asked`.
    pub fn new(
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        asked: u32,
        correct: u32,
    ) -> Result<Self, SessionSummaryError> {
        if completed_at < started_at {
            return Err(SessionSummaryError::InvalidTimeRange);
        }
        if correct > asked {
            return Err(SessionSummaryError::CountMismatch { asked, correct });
        }
        Ok(Self {
            started_at,
            completed_at,
            asked,
            correct,
            verifications_passed: 0,
            verifications_failed: 0,
        })
    }

    #[must_use]
    pub fn with_verifications(mut self, passed: u32, failed: u32) -> Self {
        self.verifications_passed = passed;
        self.verifications_failed = failed;
        self
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn asked(&self) -> u32 {
        self.asked
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.asked - self.correct
    }

    #[must_use]
    pub fn verifications_passed(&self) -> u32 {
        self.verifications_passed
    }

    #[must_use]
    pub fn verifications_failed(&self) -> u32 {
        self.verifications_failed
    }

    /// Percentage score rounded to two decimals.
    #[must_use]
    pub fn score(&self) -> f64 {
        session_score(self.correct as usize, self.asked as usize)
    }

    /// Wall-clock length of the session in minutes.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn minutes(&self) -> f64 {
        (self.completed_at - self.started_at).num_seconds() as f64 / 60.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn summary_scores_and_measures_duration() {
        let start = fixed_now();
        let end = start + chrono::Duration::minutes(12);
        let summary = SessionSummary::new(start, end, 3, 2).unwrap();

        assert_eq!(summary.incorrect(), 1);
        assert_eq!(summary.score(), 66.67);
        assert!((summary.minutes() - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn summary_rejects_inconsistent_input() {
        let now = fixed_now();
        assert_eq!(
            SessionSummary::new(now, now - chrono::Duration::seconds(1), 1, 1).unwrap_err(),
            SessionSummaryError::InvalidTimeRange
        );
        assert_eq!(
            SessionSummary::new(now, now, 1, 2).unwrap_err(),
            SessionSummaryError::CountMismatch {
                asked: 1,
                correct: 2
            }
        );
    }

    #[test]
    fn empty_session_scores_zero() {
        let now = fixed_now();
        let summary = SessionSummary::new(now, now, 0, 0).unwrap();
        assert_eq!(summary.score(), 0.0);
    }
}
