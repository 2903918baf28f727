use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::model::ids::{QuestionId, QuestionKey};

/// Separator between entries of a question's note history.
pub const NOTE_SEPARATOR: char = '|';

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("section cannot be empty")]
    EmptySection,

    #[error("correct index {index} is out of range for {options} options")]
    CorrectOutOfRange { index: usize, options: usize },

    #[error("secondary question needs a prompt and at least two options")]
    IncompleteSecondary,

    #[error("secondary correct index {index} is out of range for {options} options")]
    SecondaryOutOfRange { index: usize, options: usize },
}

/// The `metrics` column did not hold two `;`-separated counters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid metrics field {raw:?}: expected \"<correct>;<incorrect>\"")]
pub struct MetricsParseError {
    raw: String,
}

impl MetricsParseError {
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

//
// ─── METRICS ───────────────────────────────────────────────────────────────────
//

/// Cumulative answer counters for one question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Metrics {
    correct: u32,
    incorrect: u32,
}

impl Metrics {
    #[must_use]
    pub fn new(correct: u32, incorrect: u32) -> Self {
        Self { correct, incorrect }
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn incorrect(&self) -> u32 {
        self.incorrect
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.correct.saturating_add(self.incorrect)
    }

    #[must_use]
    pub fn is_unattempted(&self) -> bool {
        self.total() == 0
    }

    /// Fraction of correct answers in `[0, 1]`; `0.0` when never attempted.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        f64::from(self.correct) / f64::from(total)
    }

    /// Counters after one more answer. Exactly one side moves by one.
    #[must_use]
    pub fn with_outcome(self, was_correct: bool) -> Self {
        if was_correct {
            Self {
                correct: self.correct.saturating_add(1),
                ..self
            }
        } else {
            Self {
                incorrect: self.incorrect.saturating_add(1),
                ..self
            }
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.correct, self.incorrect)
    }
}

impl FromStr for Metrics {
    type Err = MetricsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MetricsParseError { raw: s.to_owned() };
        let mut parts = s.trim().split(';');
        let (Some(correct), Some(incorrect), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(err());
        };
        let correct = correct.trim().parse::<u32>().map_err(|_| err())?;
        let incorrect = incorrect.trim().parse::<u32>().map_err(|_| err())?;
        Ok(Self { correct, incorrect })
    }
}

//
// ─── NOTES ─────────────────────────────────────────────────────────────────────
//

/// Join `note` onto an existing `|`-delimited history.
///
/// An empty history becomes just the note, without a leading separator.
#[must_use]
pub fn append_note(existing: &str, note: &str) -> String {
    let existing = existing.trim();
    let note = note.trim();
    if existing.is_empty() {
        note.to_owned()
    } else {
        format!("{existing}{NOTE_SEPARATOR}{note}")
    }
}

/// Split a note history into its entries, skipping blanks.
pub fn note_entries(notes: &str) -> impl Iterator<Item = &str> {
    notes
        .split(NOTE_SEPARATOR)
        .map(str::trim)
        .filter(|n| !n.is_empty())
}

//
// ─── SECONDARY QUESTION ────────────────────────────────────────────────────────
//

/// Single-choice follow-up used to confirm a correct primary answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryQuestion {
    prompt: String,
    options: Vec<String>,
    correct: usize,
    explanation: String,
}

impl SecondaryQuestion {
    /// # Errors
    ///
    /// Returns `QuestionError::IncompleteSecondary` for an empty prompt or fewer than two
    /// options, and `QuestionError::SecondaryOutOfRange` when `correct` is not an option.
    pub fn new(
        prompt: impl Into<String>,
        options: Vec<String>,
        correct: usize,
        explanation: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() || options.len() < 2 {
            return Err(QuestionError::IncompleteSecondary);
        }
        if correct >= options.len() {
            return Err(QuestionError::SecondaryOutOfRange {
                index: correct,
                options: options.len(),
            });
        }
        Ok(Self {
            prompt,
            options,
            correct,
            explanation: explanation.into(),
        })
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct(&self) -> usize {
        self.correct
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }
}

//
// ─── QUESTION RECORD ───────────────────────────────────────────────────────────
//

/// Unvalidated record fields, as produced by a bank parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    pub source: PathBuf,
    pub section: String,
    pub id: QuestionId,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct: BTreeSet<usize>,
    pub is_multi: bool,
    pub notes: String,
    pub metrics: Metrics,
    pub secondary: Option<SecondaryQuestion>,
}

impl QuestionDraft {
    /// # Errors
    ///
    /// Returns `QuestionError` when the section is blank or a correct index does not
    /// point at an option.
    pub fn validate(self) -> Result<QuestionRecord, QuestionError> {
        let section = self.section.trim().to_owned();
        if section.is_empty() {
            return Err(QuestionError::EmptySection);
        }
        if let Some(&index) = self.correct.iter().find(|&&i| i >= self.options.len()) {
            return Err(QuestionError::CorrectOutOfRange {
                index,
                options: self.options.len(),
            });
        }

        Ok(QuestionRecord {
            key: QuestionKey::new(self.source, section, self.id),
            prompt: self.prompt,
            options: self.options,
            correct: self.correct,
            is_multi: self.is_multi,
            notes: self.notes.trim().to_owned(),
            metrics: self.metrics,
            secondary: self.secondary,
        })
    }
}

/// One multiple-choice question loaded from a bank file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRecord {
    key: QuestionKey,
    prompt: String,
    options: Vec<String>,
    correct: BTreeSet<usize>,
    is_multi: bool,
    notes: String,
    metrics: Metrics,
    secondary: Option<SecondaryQuestion>,
}

impl QuestionRecord {
    #[must_use]
    pub fn key(&self) -> &QuestionKey {
        &self.key
    }

    #[must_use]
    pub fn section(&self) -> &str {
        self.key.section()
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.key.id()
    }

    #[must_use]
    pub fn source(&self) -> &Path {
        self.key.source()
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Zero-based indices of the correct options.
    #[must_use]
    pub fn correct(&self) -> &BTreeSet<usize> {
        &self.correct
    }

    #[must_use]
    pub fn is_multi(&self) -> bool {
        self.is_multi
    }

    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }

    #[must_use]
    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    #[must_use]
    pub fn secondary(&self) -> Option<&SecondaryQuestion> {
        self.secondary.as_ref()
    }

    /// A question with no correct options can never be answered correctly.
    #[must_use]
    pub fn is_answerable(&self) -> bool {
        !self.correct.is_empty()
    }

    /// Bump one counter and return the counters as they were before.
    pub fn record_outcome(&mut self, was_correct: bool) -> Metrics {
        let previous = self.metrics;
        self.metrics = previous.with_outcome(was_correct);
        previous
    }

    /// Append to the note history. Blank notes are ignored and return `false`.
    pub fn append_note(&mut self, note: &str) -> bool {
        if note.trim().is_empty() {
            return false;
        }
        self.notes = append_note(&self.notes, note);
        true
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
