use log::debug;
use quiz_core::model::{Metrics, QuestionKey, append_note};

use super::{BankTable, columns};
use crate::repository::{BankWriter, StorageError};

/// Writes metrics and notes back into the record's own bank file.
///
/// Each call re-reads the file, changes one cell of one row and rewrites the
/// whole file with its original header order, unknown columns and line endings.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvBankWriter;

impl CsvBankWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// `value` sees the freshly read table and the located row, and either
    /// produces the new cell text or refuses the write.
    fn update_cell(
        &self,
        key: &QuestionKey,
        column: &str,
        value: impl FnOnce(&BankTable, usize) -> Result<String, StorageError>,
    ) -> Result<(), StorageError> {
        let path = key.source();
        let mut table = BankTable::read(path)?;
        let row = table.locate(key)?;
        let value = value(&table, row)?;

        let col = table.ensure_column(column);
        table.set_cell(row, col, value);
        table.write(path)?;
        debug!("{}: updated {column} for {key}", path.display());
        Ok(())
    }
}

impl BankWriter for CsvBankWriter {
    fn write_metrics(
        &self,
        key: &QuestionKey,
        expected: Metrics,
        updated: Metrics,
    ) -> Result<(), StorageError> {
        let check = |table: &BankTable, row: usize| {
            // A row whose metrics cell is blank or malformed loaded as 0;0.
            let found = table
                .column(columns::METRICS)
                .map(|col| table.cell(row, col).trim())
                .and_then(|raw| raw.parse::<Metrics>().ok())
                .unwrap_or_default();
            if found == expected {
                Ok(updated.to_string())
            } else {
                Err(StorageError::StaleRow {
                    key: key.clone(),
                    expected,
                    found,
                })
            }
        };
        self.update_cell(key, columns::METRICS, check)
    }

    fn append_note(&self, key: &QuestionKey, note: &str) -> Result<(), StorageError> {
        self.update_cell(key, columns::NOTES, |table, row| {
            let live = table
                .column(columns::NOTES)
                .map_or("", |col| table.cell(row, col));
            Ok(append_note(live, note))
        })
    }
}
