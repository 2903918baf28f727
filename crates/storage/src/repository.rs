use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use quiz_core::model::{Metrics, QuestionKey, UserProgress};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("{path}: file not found")]
    NotFound { path: PathBuf },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path}: csv error: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: missing required column {column:?}")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("no row matches {key}")]
    MissingRow { key: QuestionKey },

    #[error("{matches} rows match {key}")]
    AmbiguousRow { key: QuestionKey, matches: usize },

    #[error("row {key} changed on disk: expected metrics {expected}, found {found}")]
    StaleRow {
        key: QuestionKey,
        expected: Metrics,
        found: Metrics,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub(crate) fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Write-back of per-question state into the record's source bank file.
pub trait BankWriter {
    /// Replace the metrics of the row behind `key`.
    ///
    /// The row's current metrics must still equal `expected` (the in-memory value
    /// before the update); otherwise nothing is written.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the file is unreadable, the row is missing, ambiguous
    /// or stale, or the rewrite fails.
    fn write_metrics(
        &self,
        key: &QuestionKey,
        expected: Metrics,
        updated: Metrics,
    ) -> Result<(), StorageError>;

    /// Append `note` to the note history currently stored in the row behind `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` when the file is unreadable, the row is missing or
    /// ambiguous, or the rewrite fails.
    fn append_note(&self, key: &QuestionKey, note: &str) -> Result<(), StorageError>;
}

/// Whole-document persistence for [`UserProgress`].
pub trait ProgressRepository {
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` when nothing was saved yet, or other storage
    /// errors for unreadable or corrupt data.
    fn load(&self) -> Result<UserProgress, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be written.
    fn save(&self, progress: &UserProgress) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// A write captured by [`InMemoryRepository`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BankWrite {
    Metrics { key: QuestionKey, metrics: Metrics },
    Note { key: QuestionKey, note: String },
}

/// In-memory backend for tests: records bank writes and keeps progress in a mutex.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    writes: Arc<Mutex<Vec<BankWrite>>>,
    progress: Arc<Mutex<Option<UserProgress>>>,
    fail_writes: bool,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A repository whose writes always fail, for exercising the skip path.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Bank writes captured so far, oldest first.
    #[must_use]
    pub fn writes(&self) -> Vec<BankWrite> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    fn push(&self, write: BankWrite) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Unavailable("writes disabled".into()));
        }
        let mut guard = self
            .writes
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        guard.push(write);
        Ok(())
    }
}

impl BankWriter for InMemoryRepository {
    fn write_metrics(
        &self,
        key: &QuestionKey,
        _expected: Metrics,
        updated: Metrics,
    ) -> Result<(), StorageError> {
        self.push(BankWrite::Metrics {
            key: key.clone(),
            metrics: updated,
        })
    }

    fn append_note(&self, key: &QuestionKey, note: &str) -> Result<(), StorageError> {
        self.push(BankWrite::Note {
            key: key.clone(),
            note: note.to_owned(),
        })
    }
}

impl ProgressRepository for InMemoryRepository {
    fn load(&self) -> Result<UserProgress, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        guard.clone().ok_or_else(|| StorageError::NotFound {
            path: PathBuf::from("<memory>"),
        })
    }

    fn save(&self, progress: &UserProgress) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Unavailable("writes disabled".into()));
        }
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        *guard = Some(progress.clone());
        Ok(())
    }
}
