//! Mastery classification from cumulative answer counters.
//!
//! Two threshold policies are in use across the study flows: the quiz console
//! (`console`, 70% after at least five attempts) and the study platform
//! (`platform`, 80% mastered / 50% learning). Both are exposed as presets and
//! the caller picks one; nothing here defaults silently.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::model::{Metrics, QuestionRecord};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum MasteryPolicyError {
    #[error("threshold {0} must be within [0, 1]")]
    ThresholdOutOfRange(f64),

    #[error("learning threshold {learning} exceeds mastered threshold {mastered}")]
    InvertedThresholds { learning: f64, mastered: f64 },

    #[error("unknown mastery preset {0:?} (expected console or platform)")]
    UnknownPreset(String),
}

//
// ─── LEVEL ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MasteryLevel {
    /// Not enough evidence yet, or accuracy below the learning threshold.
    New,
    Learning,
    Mastered,
}

impl MasteryLevel {
    #[must_use]
    pub fn is_mastered(self) -> bool {
        matches!(self, Self::Mastered)
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Learning => "learning",
            Self::Mastered => "mastered",
        }
    }
}

impl fmt::Display for MasteryLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

//
// ─── POLICY ────────────────────────────────────────────────────────────────────
//

/// Thresholds for [`classify`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MasteryPolicy {
    min_attempts: u32,
    mastered_threshold: f64,
    learning_threshold: f64,
}

impl MasteryPolicy {
    /// # Errors
    ///
    /// Returns `MasteryPolicyError` when a threshold is outside `[0, 1]` or the learning
    /// threshold is above the mastered threshold.
    pub fn new(
        min_attempts: u32,
        mastered_threshold: f64,
        learning_threshold: f64,
    ) -> Result<Self, MasteryPolicyError> {
        for t in [mastered_threshold, learning_threshold] {
            if !(0.0..=1.0).contains(&t) {
                return Err(MasteryPolicyError::ThresholdOutOfRange(t));
            }
        }
        if learning_threshold > mastered_threshold {
            return Err(MasteryPolicyError::InvertedThresholds {
                learning: learning_threshold,
                mastered: mastered_threshold,
            });
        }
        Ok(Self {
            min_attempts,
            mastered_threshold,
            learning_threshold,
        })
    }

    /// Quiz console rule: mastered at >= 70% once answered at least five times.
    #[must_use]
    pub fn console() -> Self {
        Self {
            min_attempts: 5,
            mastered_threshold: 0.70,
            learning_threshold: 0.0,
        }
    }

    /// Study platform rule: >= 80% mastered, >= 50% learning, any attempt counts.
    #[must_use]
    pub fn platform() -> Self {
        Self {
            min_attempts: 1,
            mastered_threshold: 0.80,
            learning_threshold: 0.50,
        }
    }

    #[must_use]
    pub fn min_attempts(&self) -> u32 {
        self.min_attempts
    }

    #[must_use]
    pub fn mastered_threshold(&self) -> f64 {
        self.mastered_threshold
    }

    #[must_use]
    pub fn learning_threshold(&self) -> f64 {
        self.learning_threshold
    }
}

/// Named policies selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MasteryPreset {
    #[default]
    Console,
    Platform,
}

impl MasteryPreset {
    #[must_use]
    pub fn policy(self) -> MasteryPolicy {
        match self {
            Self::Console => MasteryPolicy::console(),
            Self::Platform => MasteryPolicy::platform(),
        }
    }
}

impl FromStr for MasteryPreset {
    type Err = MasteryPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "platform" => Ok(Self::Platform),
            other => Err(MasteryPolicyError::UnknownPreset(other.to_owned())),
        }
    }
}

//
// ─── CLASSIFIER ────────────────────────────────────────────────────────────────
//

/// Classify counters under `policy`. Pure; the same inputs always give the same level.
#[must_use]
pub fn classify(times_correct: u32, times_incorrect: u32, policy: &MasteryPolicy) -> MasteryLevel {
    let metrics = Metrics::new(times_correct, times_incorrect);
    if metrics.total() < policy.min_attempts {
        return MasteryLevel::New;
    }
    let accuracy = metrics.accuracy();
    if accuracy >= policy.mastered_threshold {
        MasteryLevel::Mastered
    } else if accuracy >= policy.learning_threshold && !metrics.is_unattempted() {
        MasteryLevel::Learning
    } else {
        MasteryLevel::New
    }
}

/// Convenience wrapper over [`classify`] for a loaded record.
#[must_use]
pub fn classify_record(record: &QuestionRecord, policy: &MasteryPolicy) -> MasteryLevel {
    let m = record.metrics();
    classify(m.correct(), m.incorrect(), policy)
}

/// Level counts across a set of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MasteryBreakdown {
    pub new: usize,
    pub learning: usize,
    pub mastered: usize,
}

impl MasteryBreakdown {
    pub fn from_records<'a>(
        records: impl IntoIterator<Item = &'a QuestionRecord>,
        policy: &MasteryPolicy,
    ) -> Self {
        records
            .into_iter()
            .fold(Self::default(), |mut acc, record| {
                match classify_record(record, policy) {
                    MasteryLevel::New => acc.new += 1,
                    MasteryLevel::Learning => acc.learning += 1,
                    MasteryLevel::Mastered => acc.mastered += 1,
                }
                acc
            })
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.new + self.learning + self.mastered
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_needs_five_attempts() {
        let policy = MasteryPolicy::console();
        assert_eq!(classify(4, 0, &policy), MasteryLevel::New);
        assert_eq!(classify(5, 0, &policy), MasteryLevel::Mastered);
        assert_eq!(classify(0, 0, &policy), MasteryLevel::New);
    }

    #[test]
    fn console_mastery_cutoff_is_seventy_percent() {
        let policy = MasteryPolicy::console();
        assert_eq!(classify(7, 3, &policy), MasteryLevel::Mastered);
        assert_eq!(classify(4, 2, &policy), MasteryLevel::Learning);
        assert!(!classify(4, 2, &policy).is_mastered());
    }

    #[test]
    fn platform_uses_eighty_and_fifty() {
        let policy = MasteryPolicy::platform();
        assert_eq!(classify(0, 0, &policy), MasteryLevel::New);
        assert_eq!(classify(4, 1, &policy), MasteryLevel::Mastered);
        assert_eq!(classify(4, 2, &policy), MasteryLevel::Learning);
        assert_eq!(classify(1, 2, &policy), MasteryLevel::New);
    }

    #[test]
    fn classify_is_deterministic() {
        for policy in [MasteryPolicy::console(), MasteryPolicy::platform()] {
            for (c, i) in [(0, 0), (4, 2), (9, 1), (1, 9)] {
                assert_eq!(classify(c, i, &policy), classify(c, i, &policy));
            }
        }
    }

    #[test]
    fn policy_validation() {
        assert!(matches!(
            MasteryPolicy::new(5, 1.2, 0.5),
            Err(MasteryPolicyError::ThresholdOutOfRange(_))
        ));
        assert!(matches!(
            MasteryPolicy::new(5, 0.5, 0.7),
            Err(MasteryPolicyError::InvertedThresholds { .. })
        ));
        let custom = MasteryPolicy::new(3, 0.9, 0.6).unwrap();
        assert_eq!(classify(3, 0, &custom), MasteryLevel::Mastered);
        assert_eq!(classify(2, 1, &custom), MasteryLevel::Learning);
    }

    #[test]
    fn preset_parsing() {
        assert_eq!("Console".parse::<MasteryPreset>().unwrap(), MasteryPreset::Console);
        assert_eq!(
            "platform".parse::<MasteryPreset>().unwrap().policy(),
            MasteryPolicy::platform()
        );
        assert!("strict".parse::<MasteryPreset>().is_err());
    }
}
