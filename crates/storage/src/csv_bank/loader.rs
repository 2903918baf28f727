use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use quiz_core::model::{Metrics, QuestionDraft, QuestionId, SecondaryQuestion};

use super::{BankTable, LoadReport, QuestionBank, columns};
use crate::repository::StorageError;

/// Load every `*.csv` directly inside `dir`, in sorted file-name order.
///
/// A missing directory yields an empty bank. Files that cannot be read or parsed
/// are logged and skipped; bad rows inside a file are logged and skipped.
///
/// # Errors
///
/// Returns `StorageError::Io` if `dir` exists but cannot be listed.
pub fn load_dir(dir: &Path) -> Result<QuestionBank, StorageError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("bank directory {} does not exist; nothing to load", dir.display());
            return Ok(QuestionBank::default());
        }
        Err(e) => return Err(StorageError::io(dir, e)),
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && has_csv_extension(path))
        .collect();
    paths.sort();

    Ok(load_files(&paths))
}

/// Load the given bank files in the order given.
#[must_use]
pub fn load_files(paths: &[PathBuf]) -> QuestionBank {
    let mut bank = QuestionBank::default();
    for path in paths {
        match BankTable::read(path) {
            Ok(table) => {
                if load_table(path, &table, &mut bank) {
                    bank.tables.insert(path.clone(), table);
                    bank.report.files += 1;
                }
            }
            Err(e) => {
                warn!("skipping bank file: {e}");
                bank.report.skipped_files += 1;
            }
        }
    }
    info!(
        "loaded {} questions from {} bank files ({} skipped rows)",
        bank.records.len(),
        bank.report.files,
        bank.report.skipped_rows
    );
    bank
}

fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

//
// ─── ROWS ──────────────────────────────────────────────────────────────────────
//

/// Column positions resolved once per file.
struct Columns {
    section: usize,
    id: usize,
    question: Option<usize>,
    options: Option<usize>,
    correct: Option<usize>,
    multi: Option<usize>,
    notes: Option<usize>,
    metrics: Option<usize>,
    second_question: Option<usize>,
    second_options: Option<usize>,
    second_correct: Option<usize>,
    second_explanation: Option<usize>,
}

impl Columns {
    fn resolve(path: &Path, table: &BankTable) -> Result<Self, StorageError> {
        let required = |name: &'static str| {
            table.column(name).ok_or_else(|| StorageError::MissingColumn {
                path: path.to_path_buf(),
                column: name,
            })
        };
        Ok(Self {
            section: required(columns::SECTION)?,
            id: required(columns::ID)?,
            question: table.column(columns::QUESTION),
            options: table.column(columns::OPTIONS),
            correct: table.column(columns::CORRECT),
            multi: table.column(columns::MULTI),
            notes: table.column(columns::NOTES),
            metrics: table.column(columns::METRICS),
            second_question: table.column(columns::SECOND_QUESTION),
            second_options: table.column(columns::SECOND_OPTIONS),
            second_correct: table.column(columns::SECOND_CORRECT),
            second_explanation: table.column(columns::SECOND_EXPLANATION),
        })
    }
}

/// Reads cells of one row, treating absent columns as empty.
struct Row<'a> {
    table: &'a BankTable,
    index: usize,
}

impl<'a> Row<'a> {
    fn get(&self, col: Option<usize>) -> &'a str {
        col.map_or("", |c| self.table.cell(self.index, c)).trim()
    }

    /// Human-facing row number (the header is line 1).
    fn line(&self) -> usize {
        self.index + 2
    }
}

/// Returns `false` when the file lacks a required column and was skipped.
fn load_table(path: &Path, table: &BankTable, bank: &mut QuestionBank) -> bool {
    let cols = match Columns::resolve(path, table) {
        Ok(cols) => cols,
        Err(e) => {
            warn!("skipping bank file: {e}");
            bank.report.skipped_files += 1;
            return false;
        }
    };

    let mut seen = HashSet::new();
    for index in 0..table.rows().len() {
        let row = Row { table, index };
        let location = format!("{}:{}", path.display(), row.line());

        let Some(draft) = parse_row(path, &row, &cols, &location, &mut bank.report) else {
            bank.report.skipped_rows += 1;
            continue;
        };

        match draft.validate() {
            Ok(record) => {
                if !record.is_answerable() {
                    warn!(
                        "{location}: question {} has no valid correct option and can never be answered correctly",
                        record.key()
                    );
                    bank.report.warnings += 1;
                }
                if !seen.insert((record.section().to_owned(), record.id())) {
                    warn!(
                        "{location}: duplicate {}#{}; write-back to this row will be refused",
                        record.section(),
                        record.id()
                    );
                    bank.report.warnings += 1;
                }
                bank.records.push(record);
            }
            Err(e) => {
                warn!("{location}: skipping row: {e}");
                bank.report.skipped_rows += 1;
            }
        }
    }
    debug!("{}: {} rows read", path.display(), table.rows().len());
    true
}

fn parse_row(
    path: &Path,
    row: &Row<'_>,
    cols: &Columns,
    location: &str,
    report: &mut LoadReport,
) -> Option<QuestionDraft> {
    let raw_id = row.get(Some(cols.id));
    let id = match raw_id.parse::<QuestionId>() {
        Ok(id) => id,
        Err(_) => {
            warn!("{location}: skipping row with invalid id {raw_id:?}");
            return None;
        }
    };
    let section = row.get(Some(cols.section));
    if section.is_empty() {
        warn!("{location}: skipping row {id} with empty section");
        return None;
    }

    let options = split_options(row.get(cols.options));
    let correct = parse_correct(row.get(cols.correct), options.len(), location, report);

    let mut is_multi = row.get(cols.multi).eq_ignore_ascii_case("true");
    if !is_multi && correct.len() > 1 {
        warn!("{location}: question {id} lists several correct options; treating it as multi-select");
        report.warnings += 1;
        is_multi = true;
    }

    Some(QuestionDraft {
        source: path.to_path_buf(),
        section: section.to_owned(),
        id,
        prompt: row.get(cols.question).to_owned(),
        options,
        correct,
        is_multi,
        notes: row.get(cols.notes).to_owned(),
        metrics: metrics_or_default(row.get(cols.metrics), location, report),
        secondary: parse_secondary(row, cols, location, report),
    })
}

fn split_options(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(';').map(|o| o.trim().to_owned()).collect()
}

/// 1-based `;`-separated indices into zero-based ones, dropping bad entries.
fn parse_correct(
    raw: &str,
    options: usize,
    location: &str,
    report: &mut LoadReport,
) -> BTreeSet<usize> {
    let mut correct = BTreeSet::new();
    for token in raw.split(';').map(str::trim).filter(|t| !t.is_empty()) {
        match token.parse::<usize>() {
            Ok(n) if (1..=options).contains(&n) => {
                correct.insert(n - 1);
            }
            Ok(n) => {
                warn!("{location}: correct option {n} is outside 1-{options}; dropped");
                report.warnings += 1;
            }
            Err(_) => {
                warn!("{location}: non-numeric correct value {token:?}; dropped");
                report.warnings += 1;
            }
        }
    }
    correct
}

/// Blank metrics are simply unattempted; malformed ones are reset with a warning.
pub(super) fn metrics_or_default(raw: &str, location: &str, report: &mut LoadReport) -> Metrics {
    if raw.is_empty() {
        return Metrics::default();
    }
    match raw.parse::<Metrics>() {
        Ok(metrics) => metrics,
        Err(e) => {
            warn!("{location}: {e}; using 0;0");
            report.warnings += 1;
            Metrics::default()
        }
    }
}

fn parse_secondary(
    row: &Row<'_>,
    cols: &Columns,
    location: &str,
    report: &mut LoadReport,
) -> Option<SecondaryQuestion> {
    let prompt = row.get(cols.second_question);
    if prompt.is_empty() {
        return None;
    }

    let raw_correct = row.get(cols.second_correct);
    let correct = match raw_correct.parse::<usize>() {
        Ok(n) if n >= 1 => n - 1,
        _ => {
            warn!("{location}: secondary question has invalid correct value {raw_correct:?}; ignored");
            report.warnings += 1;
            return None;
        }
    };

    match SecondaryQuestion::new(
        prompt,
        split_options(row.get(cols.second_options)),
        correct,
        row.get(cols.second_explanation),
    ) {
        Ok(secondary) => Some(secondary),
        Err(e) => {
            warn!("{location}: secondary question ignored: {e}");
            report.warnings += 1;
            None
        }
    }
}
