//! SQL-writing drills over [`SqlCommand`] exercises.
//!
//! Free-text answers are checked with [`check_sql`]; the guided fragment drill is
//! driven by [`FragmentDrill`]; [`SqlTrainer`] walks a list of commands and records
//! completions into the user progress.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use log::debug;
use quiz_core::Clock;
use quiz_core::model::{Achievement, CommandPart, SqlCommand};

use crate::error::TrainerError;
use crate::progress_service::ProgressService;

/// Errors tolerated before a fragment drill starts over.
pub const MAX_FRAGMENT_ERRORS: u32 = 3;

//
// ─── CHECKING ──────────────────────────────────────────────────────────────────
//

/// Lowercase, collapse whitespace and drop `;`, `[` and `]`.
#[must_use]
pub fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .replace([';', '[', ']'], "")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityTier {
    Almost,
    OnTrack,
    Incorrect,
}

impl SimilarityTier {
    #[must_use]
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio > 0.85 {
            Self::Almost
        } else if ratio > 0.6 {
            Self::OnTrack
        } else {
            Self::Incorrect
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Almost => "Almost there. Check the small syntax details.",
            Self::OnTrack => "On the right track, but the structure has errors.",
            Self::Incorrect => "The query is incorrect.",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Correct,
    /// Part texts absent from the answer, as written in the command.
    MissingKeywords(Vec<String>),
    Similar { tier: SimilarityTier, ratio: f64 },
}

impl CheckOutcome {
    #[must_use]
    pub fn is_correct(&self) -> bool {
        matches!(self, Self::Correct)
    }
}

impl fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Correct => f.write_str("Correct!"),
            Self::MissingKeywords(missing) => {
                write!(f, "Missing keywords: {}", missing.join(", "))
            }
            Self::Similar { tier, .. } => f.write_str(tier.message()),
        }
    }
}

/// Compare an answer with a command's target text.
#[must_use]
pub fn check_sql(answer: &str, command: &SqlCommand) -> CheckOutcome {
    let answer = normalize_sql(answer);
    let target = normalize_sql(command.full());
    if answer == target {
        return CheckOutcome::Correct;
    }

    let missing: Vec<String> = command
        .keywords()
        .filter(|keyword| !answer.contains(&normalize_sql(keyword)))
        .map(str::to_owned)
        .collect();
    if !missing.is_empty() {
        return CheckOutcome::MissingKeywords(missing);
    }

    let ratio = strsim::normalized_levenshtein(&answer, &target);
    CheckOutcome::Similar {
        tier: SimilarityTier::from_ratio(ratio),
        ratio,
    }
}

/// Where a normalized answer first departs from the target, word by word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordHint {
    /// `position` is 1-based.
    Mismatch {
        position: usize,
        expected: String,
        received: String,
    },
    WordCount { received: usize, expected: usize },
    /// Same words; only characters dropped by normalization differ.
    Formatting,
}

impl fmt::Display for WordHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mismatch {
                position,
                expected,
                received,
            } => write!(
                f,
                "Check word #{position}: expected \"{expected}\", received \"{received}\""
            ),
            Self::WordCount { received, expected } => {
                write!(f, "Your command has {received} words, {expected} expected")
            }
            Self::Formatting => f.write_str("Check punctuation or spacing."),
        }
    }
}

#[must_use]
pub fn word_hint(answer: &str, target: &str) -> WordHint {
    let answer = normalize_sql(answer);
    let target = normalize_sql(target);
    let received: Vec<&str> = answer.split(' ').filter(|w| !w.is_empty()).collect();
    let expected: Vec<&str> = target.split(' ').filter(|w| !w.is_empty()).collect();

    if let Some((i, (r, e))) = received
        .iter()
        .zip(&expected)
        .enumerate()
        .find(|(_, (r, e))| r != e)
    {
        return WordHint::Mismatch {
            position: i + 1,
            expected: (*e).to_owned(),
            received: (*r).to_owned(),
        };
    }
    if received.len() != expected.len() {
        return WordHint::WordCount {
            received: received.len(),
            expected: expected.len(),
        };
    }
    WordHint::Formatting
}

//
// ─── FRAGMENT DRILL ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentOutcome {
    /// Fragment accepted; the next one is now current.
    Accepted,
    Completed,
    Rejected { errors: u32 },
    /// Too many errors; the drill is back at the first fragment.
    Reset,
}

/// Type a command fragment by fragment, with each fragment's description as hint.
#[derive(Debug, Clone)]
pub struct FragmentDrill {
    fragments: Vec<CommandPart>,
    index: usize,
    errors: u32,
    attempts: u32,
    total_errors: u32,
}

impl FragmentDrill {
    /// # Errors
    ///
    /// Returns `TrainerError::NoFragments` if the command has no non-empty parts.
    pub fn new(command: &SqlCommand) -> Result<Self, TrainerError> {
        let fragments: Vec<CommandPart> = command
            .parts()
            .iter()
            .filter(|p| !p.text.trim().is_empty())
            .cloned()
            .collect();
        if fragments.is_empty() {
            return Err(TrainerError::NoFragments(command.id().to_owned()));
        }
        Ok(Self {
            fragments,
            index: 0,
            errors: 0,
            attempts: 0,
            total_errors: 0,
        })
    }

    #[must_use]
    pub fn current(&self) -> Option<&CommandPart> {
        self.fragments.get(self.index)
    }

    /// Fragments typed so far.
    #[must_use]
    pub fn completed(&self) -> &[CommandPart] {
        &self.fragments[..self.index.min(self.fragments.len())]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.index
    }

    /// Errors since the last reset.
    #[must_use]
    pub fn errors(&self) -> u32 {
        self.errors
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn total_errors(&self) -> u32 {
        self.total_errors
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.index >= self.fragments.len()
    }

    /// # Errors
    ///
    /// Returns `TrainerError::Finished` once every fragment has been typed.
    pub fn type_fragment(&mut self, input: &str) -> Result<FragmentOutcome, TrainerError> {
        let expected = self
            .fragments
            .get(self.index)
            .ok_or(TrainerError::Finished)?;
        self.attempts += 1;
        if input.trim() == expected.text.trim() {
            self.index += 1;
            return Ok(if self.is_complete() {
                FragmentOutcome::Completed
            } else {
                FragmentOutcome::Accepted
            });
        }

        self.errors += 1;
        self.total_errors += 1;
        if self.errors >= MAX_FRAGMENT_ERRORS {
            self.index = 0;
            self.errors = 0;
            return Ok(FragmentOutcome::Reset);
        }
        Ok(FragmentOutcome::Rejected {
            errors: self.errors,
        })
    }
}

//
// ─── TRAINER ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrainerMode {
    /// A miss only reports the attempt number.
    Free,
    /// A miss runs the hint pipeline.
    #[default]
    Guided,
}

impl TrainerMode {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Free => Self::Guided,
            Self::Guided => Self::Free,
        }
    }
}

impl fmt::Display for TrainerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Free => "free",
            Self::Guided => "guided",
        })
    }
}

impl FromStr for TrainerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "guided" => Ok(Self::Guided),
            other => Err(format!("unknown trainer mode {other:?} (expected free or guided)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitFeedback {
    Solved {
        attempts: u32,
        elapsed_seconds: f64,
        unlocked: Vec<Achievement>,
    },
    Miss {
        attempt: u32,
    },
    Hint {
        attempt: u32,
        outcome: CheckOutcome,
        words: WordHint,
    },
}

/// Walks a list of commands, one exercise at a time.
pub struct SqlTrainer {
    clock: Clock,
    progress: ProgressService,
    commands: Vec<SqlCommand>,
    mode: TrainerMode,
    index: usize,
    attempts: u32,
    errors: u32,
    solved: bool,
    started_at: DateTime<Utc>,
}

impl SqlTrainer {
    /// # Errors
    ///
    /// Returns `TrainerError::NoCommands` for an empty command list.
    pub fn new(
        clock: Clock,
        progress: ProgressService,
        commands: Vec<SqlCommand>,
        mode: TrainerMode,
    ) -> Result<Self, TrainerError> {
        if commands.is_empty() {
            return Err(TrainerError::NoCommands);
        }
        Ok(Self {
            clock,
            progress,
            commands,
            mode,
            index: 0,
            attempts: 0,
            errors: 0,
            solved: false,
            started_at: clock.now(),
        })
    }

    #[must_use]
    pub fn mode(&self) -> TrainerMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: TrainerMode) {
        self.mode = mode;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// 0-based index of the current command.
    #[must_use]
    pub fn position(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn current(&self) -> Option<&SqlCommand> {
        self.commands.get(self.index)
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn errors(&self) -> u32 {
        self.errors
    }

    #[must_use]
    pub fn is_solved(&self) -> bool {
        self.solved
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.index >= self.commands.len()
    }

    /// Jump to a command, discarding the current attempt.
    ///
    /// # Errors
    ///
    /// Returns `TrainerError::OutOfRange` for an index past the end.
    pub fn go_to(&mut self, index: usize) -> Result<&SqlCommand, TrainerError> {
        if index >= self.commands.len() {
            return Err(TrainerError::OutOfRange {
                index,
                len: self.commands.len(),
            });
        }
        self.abandon_current();
        self.index = index;
        self.reset_attempt();
        self.current().ok_or(TrainerError::Finished)
    }

    /// Check a full-text answer against the current command.
    ///
    /// # Errors
    ///
    /// Returns `TrainerError::Finished` when there is no open command.
    pub fn submit(&mut self, answer: &str) -> Result<SubmitFeedback, TrainerError> {
        if self.solved {
            return Err(TrainerError::Finished);
        }
        let command = self.commands.get(self.index).ok_or(TrainerError::Finished)?;
        self.attempts += 1;

        let outcome = check_sql(answer, command);
        if outcome.is_correct() {
            let elapsed_seconds = self.clock.seconds_since(self.started_at);
            let errors = self.attempts - 1;
            let unlocked = self.progress.record_sql_completion(
                command.id(),
                self.attempts,
                errors,
                elapsed_seconds,
            );
            self.solved = true;
            return Ok(SubmitFeedback::Solved {
                attempts: self.attempts,
                elapsed_seconds,
                unlocked,
            });
        }

        self.errors += 1;
        debug!("attempt {} on {} missed", self.attempts, command.id());
        Ok(match self.mode {
            TrainerMode::Free => SubmitFeedback::Miss {
                attempt: self.attempts,
            },
            TrainerMode::Guided => SubmitFeedback::Hint {
                attempt: self.attempts,
                words: word_hint(answer, command.full()),
                outcome,
            },
        })
    }

    /// Start a fragment drill for the current command.
    ///
    /// # Errors
    ///
    /// Returns `TrainerError::Finished` when there is no open command and
    /// `TrainerError::NoFragments` when the command has no parts.
    pub fn fragment_drill(&self) -> Result<FragmentDrill, TrainerError> {
        if self.solved {
            return Err(TrainerError::Finished);
        }
        FragmentDrill::new(self.current().ok_or(TrainerError::Finished)?)
    }

    /// Record a finished fragment drill as the current command's completion.
    ///
    /// # Errors
    ///
    /// Returns `TrainerError::Finished` if the drill is incomplete or the command
    /// was already solved.
    pub fn complete_drill(&mut self, drill: &FragmentDrill) -> Result<Vec<Achievement>, TrainerError> {
        if self.solved || !drill.is_complete() {
            return Err(TrainerError::Finished);
        }
        let command = self.commands.get(self.index).ok_or(TrainerError::Finished)?;
        self.attempts += drill.attempts();
        self.errors += drill.total_errors();
        self.solved = true;
        Ok(self.progress.record_sql_completion(
            command.id(),
            self.attempts,
            self.errors,
            self.clock.seconds_since(self.started_at),
        ))
    }

    /// Move to the next command. An unsolved command with attempts counts as abandoned.
    ///
    /// Returns the new current command, or `None` when the list is exhausted.
    pub fn next_command(&mut self) -> Option<&SqlCommand> {
        self.abandon_current();
        self.index = (self.index + 1).min(self.commands.len());
        self.reset_attempt();
        self.current()
    }

    /// Close the run; an open attempt counts as abandoned.
    pub fn finish(&mut self) {
        self.abandon_current();
        self.index = self.commands.len();
        self.reset_attempt();
    }

    fn abandon_current(&mut self) {
        if self.solved || self.attempts == 0 {
            return;
        }
        if let Some(command) = self.commands.get(self.index) {
            self.progress
                .record_sql_abandoned(command.id(), self.attempts, self.errors);
        }
    }

    fn reset_attempt(&mut self) {
        self.attempts = 0;
        self.errors = 0;
        self.solved = false;
        self.started_at = self.clock.now();
    }
}

impl fmt::Debug for SqlTrainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlTrainer")
            .field("commands_len", &self.commands.len())
            .field("mode", &self.mode)
            .field("index", &self.index)
            .field("attempts", &self.attempts)
            .field("solved", &self.solved)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use quiz_core::time::fixed_clock;
    use storage::repository::{InMemoryRepository, ProgressRepository};

    fn part(text: &str, desc: &str) -> CommandPart {
        CommandPart {
            text: text.into(),
            desc: desc.into(),
        }
    }

    fn top_sales() -> SqlCommand {
        SqlCommand::new(
            "top_sales",
            "Top sales",
            "Ten biggest orders",
            "SELECT TOP 10 * FROM [Sales] ORDER BY Amount DESC;",
            vec![
                part("SELECT TOP 10 *", "pick rows"),
                part("FROM [Sales]", "source table"),
                part("ORDER BY Amount DESC", "sort"),
            ],
            None,
        )
        .unwrap()
    }

    fn trainer(mode: TrainerMode) -> (InMemoryRepository, SqlTrainer) {
        let repo = InMemoryRepository::new();
        let progress = ProgressService::new(fixed_clock(), Arc::new(repo.clone()));
        let trainer = SqlTrainer::new(fixed_clock(), progress, vec![top_sales()], mode).unwrap();
        (repo, trainer)
    }

    #[test]
    fn normalize_sql_folds_case_space_and_brackets() {
        assert_eq!(
            normalize_sql("  SELECT  *\n\tFROM [dbo].[T] ;"),
            "select * from dbo.t "
        );
    }

    #[test]
    fn exact_match_after_normalization_is_correct() {
        let outcome = check_sql("select top 10 * from sales order by amount desc", &top_sales());
        assert_eq!(outcome, CheckOutcome::Correct);
    }

    #[test]
    fn missing_keywords_are_listed() {
        let outcome = check_sql("SELECT TOP 10 * FROM Sales", &top_sales());
        assert_eq!(
            outcome,
            CheckOutcome::MissingKeywords(vec!["ORDER BY Amount DESC".into()])
        );
    }

    #[test]
    fn similarity_tiers() {
        assert_eq!(SimilarityTier::from_ratio(0.9), SimilarityTier::Almost);
        assert_eq!(SimilarityTier::from_ratio(0.85), SimilarityTier::OnTrack);
        assert_eq!(SimilarityTier::from_ratio(0.6), SimilarityTier::Incorrect);

        let command = SqlCommand::new("t", "", "", "SELECT name FROM customers", vec![], None).unwrap();
        let CheckOutcome::Similar { tier, .. } = check_sql("SELECT nme FROM customers", &command) else {
            panic!("expected a similarity verdict");
        };
        assert_eq!(tier, SimilarityTier::Almost);
    }

    #[test]
    fn word_hint_finds_first_difference() {
        assert_eq!(
            word_hint("SELECT name FORM t", "SELECT name FROM t"),
            WordHint::Mismatch {
                position: 3,
                expected: "from".into(),
                received: "form".into()
            }
        );
        assert_eq!(
            word_hint("SELECT name", "SELECT name FROM t"),
            WordHint::WordCount {
                received: 2,
                expected: 4
            }
        );
    }

    #[test]
    fn fragment_drill_resets_after_three_errors() {
        let mut drill = FragmentDrill::new(&top_sales()).unwrap();
        assert_eq!(drill.current().unwrap().desc, "pick rows");
        assert_eq!(drill.type_fragment("SELECT TOP 10 *").unwrap(), FragmentOutcome::Accepted);
        assert_eq!(drill.type_fragment("FROM Sales").unwrap(), FragmentOutcome::Rejected { errors: 1 });
        assert_eq!(drill.type_fragment("FROM sales").unwrap(), FragmentOutcome::Rejected { errors: 2 });
        assert_eq!(drill.type_fragment("from").unwrap(), FragmentOutcome::Reset);
        assert_eq!(drill.position(), 0);
        assert_eq!(drill.total_errors(), 3);

        for text in ["SELECT TOP 10 *", "FROM [Sales]"] {
            assert_eq!(drill.type_fragment(text).unwrap(), FragmentOutcome::Accepted);
        }
        assert_eq!(
            drill.type_fragment(" ORDER BY Amount DESC ").unwrap(),
            FragmentOutcome::Completed
        );
        assert_eq!(drill.type_fragment("x"), Err(TrainerError::Finished));
    }

    #[test]
    fn command_without_parts_has_no_drill() {
        let command = SqlCommand::new("bare", "", "", "SELECT 1", vec![], None).unwrap();
        assert_eq!(
            FragmentDrill::new(&command).unwrap_err(),
            TrainerError::NoFragments("bare".into())
        );
    }

    #[test]
    fn free_mode_reports_only_the_attempt() {
        let (_repo, mut trainer) = trainer(TrainerMode::Free);
        assert_eq!(
            trainer.submit("SELECT 1").unwrap(),
            SubmitFeedback::Miss { attempt: 1 }
        );
    }

    #[test]
    fn guided_success_records_attempts_and_errors() {
        let (repo, mut trainer) = trainer(TrainerMode::Guided);

        let feedback = trainer.submit("SELECT TOP 10 * FROM Sales").unwrap();
        assert!(matches!(
            feedback,
            SubmitFeedback::Hint {
                attempt: 1,
                outcome: CheckOutcome::MissingKeywords(_),
                ..
            }
        ));

        let feedback = trainer
            .submit("SELECT TOP 10 * FROM Sales ORDER BY Amount DESC")
            .unwrap();
        let SubmitFeedback::Solved { attempts, unlocked, .. } = feedback else {
            panic!("expected a solved command");
        };
        assert_eq!(attempts, 2);
        assert!(unlocked.iter().any(|a| a.id == "first_command"));
        assert_eq!(trainer.submit("again"), Err(TrainerError::Finished));

        let sql = repo.load().unwrap().sql;
        assert_eq!((sql.attempts, sql.errors, sql.completed), (2, 1, 1));
        assert!(sql.completed_ids.contains("top_sales"));

        assert!(trainer.next_command().is_none());
        assert!(trainer.is_finished());
    }

    #[test]
    fn skipping_an_attempted_command_is_abandoned() {
        let (repo, mut trainer) = trainer(TrainerMode::Guided);
        trainer.submit("nope").unwrap();
        trainer.finish();

        let sql = repo.load().unwrap().sql;
        assert_eq!((sql.attempts, sql.errors, sql.completed), (1, 1, 0));
        assert!(matches!(
            trainer.go_to(3),
            Err(TrainerError::OutOfRange { index: 3, len: 1 })
        ));
    }

    #[test]
    fn completed_fragment_drill_counts_as_solved() {
        let (repo, mut trainer) = trainer(TrainerMode::Guided);
        let mut drill = trainer.fragment_drill().unwrap();
        assert_eq!(trainer.complete_drill(&drill), Err(TrainerError::Finished));

        drill.type_fragment("SELECT TOP 10 *").unwrap();
        drill.type_fragment("oops").unwrap();
        drill.type_fragment("FROM [Sales]").unwrap();
        drill.type_fragment("ORDER BY Amount DESC").unwrap();
        trainer.complete_drill(&drill).unwrap();

        let sql = repo.load().unwrap().sql;
        assert_eq!((sql.attempts, sql.errors, sql.completed), (4, 1, 1));
        assert!(trainer.is_solved());
    }
}
