use std::sync::Arc;

use log::warn;
use quiz_core::model::{Metrics, QuestionRecord};
use storage::repository::BankWriter;

/// Whether a change reached the bank file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    Saved,
    /// The in-memory change stands; the file was not touched.
    Skipped(String),
}

impl Persistence {
    #[must_use]
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved)
    }
}

/// Counters before and after one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRecorded {
    pub previous: Metrics,
    pub updated: Metrics,
    pub persistence: Persistence,
}

/// Updates a record in memory, then writes the change back to its source file.
///
/// Write failures are logged and reported as [`Persistence::Skipped`]; they never
/// undo the in-memory update or reach the caller as errors.
#[derive(Clone)]
pub struct MetricsService {
    writer: Arc<dyn BankWriter>,
}

impl MetricsService {
    #[must_use]
    pub fn new(writer: Arc<dyn BankWriter>) -> Self {
        Self { writer }
    }

    pub fn record_outcome(&self, record: &mut QuestionRecord, was_correct: bool) -> OutcomeRecorded {
        let previous = record.record_outcome(was_correct);
        let updated = record.metrics();
        let persistence = match self.writer.write_metrics(record.key(), previous, updated) {
            Ok(()) => Persistence::Saved,
            Err(e) => {
                warn!("metrics for {} not saved: {e}", record.key());
                Persistence::Skipped(e.to_string())
            }
        };
        OutcomeRecorded {
            previous,
            updated,
            persistence,
        }
    }

    /// Append a note; `None` when the note is blank and nothing changed.
    pub fn append_note(&self, record: &mut QuestionRecord, note: &str) -> Option<Persistence> {
        if !record.append_note(note) {
            return None;
        }
        let persistence = match self.writer.append_note(record.key(), note) {
            Ok(()) => Persistence::Saved,
            Err(e) => {
                warn!("note for {} not saved: {e}", record.key());
                Persistence::Skipped(e.to_string())
            }
        };
        Some(persistence)
    }
}
