//! CSV question banks: raw table round-tripping, loading and write-back.
//!
//! A bank file is a headered CSV. Columns are located by name, so extra columns
//! and column order survive a rewrite untouched.

mod loader;
mod writer;

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Terminator, WriterBuilder};
use quiz_core::model::{QuestionId, QuestionKey, QuestionRecord};

use crate::atomic::write_atomic;
use crate::repository::StorageError;

pub use loader::{load_dir, load_files};
pub use writer::CsvBankWriter;

/// Header names understood by the loader and writer.
pub mod columns {
    pub const SECTION: &str = "section";
    pub const ID: &str = "id";
    pub const QUESTION: &str = "question";
    pub const OPTIONS: &str = "options";
    pub const CORRECT: &str = "correct";
    pub const MULTI: &str = "multi";
    pub const NOTES: &str = "notas";
    pub const METRICS: &str = "metrics";
    pub const SECOND_QUESTION: &str = "second_question";
    pub const SECOND_OPTIONS: &str = "second_options";
    pub const SECOND_CORRECT: &str = "second_correct";
    pub const SECOND_EXPLANATION: &str = "second_explanation";

    /// Header written for a brand-new bank.
    pub const STANDARD: [&str; 12] = [
        SECTION,
        ID,
        QUESTION,
        OPTIONS,
        CORRECT,
        MULTI,
        NOTES,
        METRICS,
        SECOND_QUESTION,
        SECOND_OPTIONS,
        SECOND_CORRECT,
        SECOND_EXPLANATION,
    ];
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

//
// ─── RAW TABLE ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    CrLf,
    Lf,
}

/// Byte-level details of a file that a rewrite must reproduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileLayout {
    pub line_ending: LineEnding,
    pub bom: bool,
    pub trailing_newline: bool,
}

impl FileLayout {
    fn detect(bytes: &[u8]) -> Self {
        let bom = bytes.starts_with(UTF8_BOM);
        let line_ending = match bytes.iter().position(|&b| b == b'\n') {
            Some(pos) if pos > 0 && bytes[pos - 1] == b'\r' => LineEnding::CrLf,
            Some(_) => LineEnding::Lf,
            None => LineEnding::CrLf,
        };
        let trailing_newline = bytes.is_empty() || bytes.ends_with(b"\n") || bytes.ends_with(b"\r");
        Self {
            line_ending,
            bom,
            trailing_newline,
        }
    }
}

impl Default for FileLayout {
    fn default() -> Self {
        Self {
            line_ending: LineEnding::CrLf,
            bom: false,
            trailing_newline: true,
        }
    }
}

/// A bank file as strings: header plus rows, short rows kept short.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    layout: FileLayout,
}

impl BankTable {
    /// Empty table with the standard header.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            header: columns::STANDARD.iter().map(|&c| c.to_owned()).collect(),
            rows: Vec::new(),
            layout: FileLayout::default(),
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError::NotFound`/`Io` if the file cannot be read and
    /// `StorageError::Csv` if it is not valid CSV.
    pub fn read(path: &Path) -> Result<Self, StorageError> {
        let bytes = fs::read(path).map_err(|e| StorageError::io(path, e))?;
        Self::parse(path, &bytes)
    }

    /// # Errors
    ///
    /// Returns `StorageError::Csv` if `bytes` are not valid CSV.
    pub fn parse(path: &Path, bytes: &[u8]) -> Result<Self, StorageError> {
        let layout = FileLayout::detect(bytes);
        let body = if layout.bom {
            &bytes[UTF8_BOM.len()..]
        } else {
            bytes
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(body);

        let mut records = reader.records();
        let header = match records.next() {
            Some(record) => record
                .map_err(|e| StorageError::csv(path, e))?
                .iter()
                .map(str::to_owned)
                .collect(),
            None => Vec::new(),
        };
        let rows = records
            .map(|record| {
                record
                    .map(|r| r.iter().map(str::to_owned).collect::<Vec<_>>())
                    .map_err(|e| StorageError::csv(path, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            header,
            rows,
            layout,
        })
    }

    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    #[must_use]
    pub fn layout(&self) -> FileLayout {
        self.layout
    }

    /// Index of the column named `name` (header cells are compared trimmed).
    #[must_use]
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h.trim() == name)
    }

    /// Index of `name`, appending it to the header when absent.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(index) = self.column(name) {
            return index;
        }
        self.header.push(name.to_owned());
        self.header.len() - 1
    }

    /// Cell at `(row, col)`; `""` past the end of a short row.
    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map_or("", String::as_str)
    }

    /// Set a cell, padding a short row with empty cells up to `col`.
    pub fn set_cell(&mut self, row: usize, col: usize, value: impl Into<String>) {
        if let Some(cells) = self.rows.get_mut(row) {
            if cells.len() <= col {
                cells.resize(col + 1, String::new());
            }
            cells[col] = value.into();
        }
    }

    pub fn push_row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    /// Row holding `key`'s `(section, id)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::MissingColumn` without `section`/`id` columns,
    /// `StorageError::MissingRow` when nothing matches and
    /// `StorageError::AmbiguousRow` when several rows do.
    pub fn locate(&self, key: &QuestionKey) -> Result<usize, StorageError> {
        let missing = |column| StorageError::MissingColumn {
            path: key.source().to_path_buf(),
            column,
        };
        let section_col = self
            .column(columns::SECTION)
            .ok_or_else(|| missing(columns::SECTION))?;
        let id_col = self.column(columns::ID).ok_or_else(|| missing(columns::ID))?;

        let matches: Vec<usize> = (0..self.rows.len())
            .filter(|&row| {
                self.cell(row, section_col).trim() == key.section()
                    && self.cell(row, id_col).parse::<QuestionId>().ok() == Some(key.id())
            })
            .collect();

        match matches.as_slice() {
            [row] => Ok(*row),
            [] => Err(StorageError::MissingRow { key: key.clone() }),
            _ => Err(StorageError::AmbiguousRow {
                key: key.clone(),
                matches: matches.len(),
            }),
        }
    }

    /// Serialize with the layout the file was read with.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Csv`/`Io` if serialization fails.
    pub fn to_bytes(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        let terminator = match self.layout.line_ending {
            LineEnding::CrLf => Terminator::CRLF,
            LineEnding::Lf => Terminator::Any(b'\n'),
        };
        let mut out = Vec::new();
        if self.layout.bom {
            out.extend_from_slice(UTF8_BOM);
        }

        let mut writer = WriterBuilder::new()
            .flexible(true)
            .terminator(terminator)
            .from_writer(out);
        if !self.header.is_empty() {
            writer
                .write_record(&self.header)
                .map_err(|e| StorageError::csv(path, e))?;
        }
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|e| StorageError::csv(path, e))?;
        }
        let mut out = writer
            .into_inner()
            .map_err(|e| StorageError::io(path, io::Error::new(e.error().kind(), e.to_string())))?;

        if !self.layout.trailing_newline {
            let cut = match self.layout.line_ending {
                LineEnding::CrLf => b"\r\n".as_slice(),
                LineEnding::Lf => b"\n".as_slice(),
            };
            if out.ends_with(cut) {
                out.truncate(out.len() - cut.len());
            }
        }
        Ok(out)
    }

    /// Rewrite `path` wholesale.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if serialization or the write fails.
    pub fn write(&self, path: &Path) -> Result<(), StorageError> {
        let bytes = self.to_bytes(path)?;
        write_atomic(path, &bytes)
    }
}

//
// ─── LOADED BANK ───────────────────────────────────────────────────────────────
//

/// Counts from one load, for the front-end's load summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub files: usize,
    pub skipped_files: usize,
    pub skipped_rows: usize,
    pub warnings: usize,
}

/// Every question loaded from a set of bank files, plus the raw tables behind them.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    records: Vec<QuestionRecord>,
    tables: BTreeMap<PathBuf, BankTable>,
    report: LoadReport,
}

impl QuestionBank {
    /// A bank with no backing tables, for callers that build records themselves.
    #[must_use]
    pub fn from_records(records: Vec<QuestionRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn records(&self) -> &[QuestionRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn report(&self) -> LoadReport {
        self.report
    }

    #[must_use]
    pub fn find(&self, key: &QuestionKey) -> Option<&QuestionRecord> {
        self.records.iter().find(|r| r.key() == key)
    }

    pub fn find_mut(&mut self, key: &QuestionKey) -> Option<&mut QuestionRecord> {
        self.records.iter_mut().find(|r| r.key() == key)
    }

    /// Distinct section names, sorted.
    #[must_use]
    pub fn sections(&self) -> Vec<&str> {
        self.records
            .iter()
            .map(QuestionRecord::section)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Source files that contributed a table, sorted.
    pub fn sources(&self) -> impl Iterator<Item = &Path> {
        self.tables.keys().map(PathBuf::as_path)
    }

    /// Raw table of `source` as it was at load time.
    #[must_use]
    pub fn table(&self, source: &Path) -> Option<&BankTable> {
        self.tables.get(source)
    }

    /// Records from one source file.
    pub fn records_from<'a>(&'a self, source: &'a Path) -> impl Iterator<Item = &'a QuestionRecord> {
        self.records.iter().filter(move |r| r.source() == source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_detects_crlf_lf_and_bom() {
        let crlf = FileLayout::detect(b"a,b\r\n1,2\r\n");
        assert_eq!(crlf.line_ending, LineEnding::CrLf);
        assert!(crlf.trailing_newline);

        let lf = FileLayout::detect(b"\xEF\xBB\xBFa,b\n1,2");
        assert_eq!(lf.line_ending, LineEnding::Lf);
        assert!(lf.bom);
        assert!(!lf.trailing_newline);
    }

    #[test]
    fn table_round_trips_bytes() {
        let path = Path::new("mem.csv");
        for raw in [
            "section,id,extra\r\nSQL,1,\"a, b\"\r\nSQL,2\r\n".as_bytes(),
            "section,id\nSQL,1\nSQL,2".as_bytes(),
            "\u{feff}section,id\nSQL,\"multi\nline\"\n".as_bytes(),
        ] {
            let table = BankTable::parse(path, raw).unwrap();
            assert_eq!(table.to_bytes(path).unwrap(), raw);
        }
    }

    #[test]
    fn short_rows_stay_short_until_written_past_the_end() {
        let path = Path::new("mem.csv");
        let mut table = BankTable::parse(path, b"section,id,metrics\nSQL,1\n").unwrap();
        assert_eq!(table.rows()[0].len(), 2);
        assert_eq!(table.cell(0, 2), "");

        table.set_cell(0, 2, "1;0");
        assert_eq!(table.to_bytes(path).unwrap(), b"section,id,metrics\nSQL,1,1;0\n");
    }

    #[test]
    fn ensure_column_appends_once() {
        let mut table = BankTable::parse(Path::new("mem.csv"), b"section,id\n").unwrap();
        assert_eq!(table.ensure_column("notas"), 2);
        assert_eq!(table.ensure_column("notas"), 2);
        assert_eq!(table.header().len(), 3);
    }

    #[test]
    fn locate_requires_a_unique_row() {
        let key = QuestionKey::new("mem.csv", "SQL", QuestionId::new(1));
        let path = Path::new("mem.csv");

        let table = BankTable::parse(path, b"section,id\nSQL,1\nKQL,1\n").unwrap();
        assert_eq!(table.locate(&key).unwrap(), 0);

        let dup = BankTable::parse(path, b"section,id\nSQL,1\nSQL, 1\n").unwrap();
        assert!(matches!(
            dup.locate(&key),
            Err(StorageError::AmbiguousRow { matches: 2, .. })
        ));

        let none = BankTable::parse(path, b"section,id\nSQL,2\n").unwrap();
        assert!(matches!(none.locate(&key), Err(StorageError::MissingRow { .. })));

        let no_id = BankTable::parse(path, b"section\nSQL\n").unwrap();
        assert!(matches!(
            no_id.locate(&key),
            Err(StorageError::MissingColumn { column: "id", .. })
        ));
    }
}
