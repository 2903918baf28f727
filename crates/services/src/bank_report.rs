use std::path::PathBuf;

use quiz_core::mastery::{MasteryBreakdown, MasteryPolicy};
use storage::QuestionBank;

/// Accuracy above which a question counts as studied.
pub const STUDIED_ACCURACY: f64 = 0.8;

/// Study metrics for one bank file.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleReport {
    /// File stem of the bank.
    pub module: String,
    pub source: PathBuf,
    pub total_questions: usize,
    pub studied: usize,
    pub attempts: u64,
    pub correct: u64,
    pub mastery: MasteryBreakdown,
}

impl ModuleReport {
    /// Share of questions studied, in percent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn study_progress(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        100.0 * self.studied as f64 / self.total_questions as f64
    }

    /// Share of all attempts that were correct, in percent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn performance(&self) -> f64 {
        if self.attempts == 0 {
            return 0.0;
        }
        100.0 * self.correct as f64 / self.attempts as f64
    }
}

/// One report per loaded bank file, in load order.
#[must_use]
pub fn module_reports(bank: &QuestionBank, policy: &MasteryPolicy) -> Vec<ModuleReport> {
    bank.sources()
        .map(|source| {
            let records: Vec<_> = bank.records_from(source).collect();
            let (attempts, correct) = records.iter().fold((0u64, 0u64), |(a, c), r| {
                let m = r.metrics();
                (a + u64::from(m.total()), c + u64::from(m.correct()))
            });
            ModuleReport {
                module: source
                    .file_stem()
                    .map_or_else(|| source.display().to_string(), |s| s.to_string_lossy().into_owned()),
                source: source.to_path_buf(),
                total_questions: records.len(),
                studied: records
                    .iter()
                    .filter(|r| r.metrics().total() > 0 && r.metrics().accuracy() > STUDIED_ACCURACY)
                    .count(),
                attempts,
                correct,
                mastery: MasteryBreakdown::from_records(records.iter().copied(), policy),
            }
        })
        .collect()
}
