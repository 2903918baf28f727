use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use log::debug;
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

use quiz_core::mastery::{MasteryPolicy, classify_record};
use quiz_core::model::{
    Presentation, QuestionKey, QuestionRecord, SessionSummary, VerificationPolicy, is_correct,
    session_score,
};
use storage::QuestionBank;

use super::plan::SessionPlan;
use super::progress::SessionProgress;
use crate::error::SessionError;
use crate::metrics_service::{MetricsService, OutcomeRecorded, Persistence};

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Where the session is in its per-question loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// The next question has not been shown yet.
    Presenting,
    AwaitingAnswer,
    Correct,
    Incorrect,
    /// A verification question is pending.
    Verification,
    Complete,
}

/// Outcome of one primary question within a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionResult {
    pub key: QuestionKey,
    pub was_correct: bool,
}

/// A question as shown to the respondent.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionView<'b> {
    pub record: &'b QuestionRecord,
    /// `(displayed number, option text)` in display order.
    pub options: Vec<(usize, &'b str)>,
    pub position: usize,
    pub total: usize,
}

/// Result of scoring the respondent's choices.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerFeedback {
    pub key: QuestionKey,
    pub was_correct: bool,
    /// The correct options as they were displayed.
    pub correct_options: Vec<(usize, String)>,
    pub outcome: OutcomeRecorded,
}

//
// ─── VERIFICATION ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationKind {
    /// A random unmastered question from the session pool.
    SpotCheck,
    /// The question's own follow-up.
    Secondary,
}

/// A single-choice verification question ready to display.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationPrompt<'b> {
    pub kind: VerificationKind,
    pub prompt: &'b str,
    pub options: Vec<(usize, &'b str)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    Passed,
    /// Carries the follow-up explanation when one exists.
    Failed { explanation: Option<String> },
    /// The input was not a listed option; nothing is scored.
    Invalid,
}

#[derive(Debug, Clone)]
enum PendingVerification {
    SpotCheck {
        key: QuestionKey,
        presentation: Presentation,
    },
    Secondary {
        key: QuestionKey,
    },
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory quiz session over questions owned by a [`QuestionBank`].
///
/// The session only stores keys; every step looks the record up in the bank it
/// is handed, so metrics written by one step are visible to the next.
pub struct QuizSession {
    questions: Vec<QuestionKey>,
    pool: Vec<QuestionKey>,
    current: usize,
    state: SessionState,
    presentation: Option<Presentation>,
    pending: Option<PendingVerification>,
    verified: bool,
    results: Vec<QuestionResult>,
    verifications_passed: u32,
    verifications_failed: u32,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    /// Start a session from a selection plan.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the plan selected nothing.
    pub fn new(plan: SessionPlan, started_at: DateTime<Utc>) -> Result<Self, SessionError> {
        if plan.questions.is_empty() {
            return Err(SessionError::Empty);
        }
        Ok(Self {
            questions: plan.questions,
            pool: plan.pool,
            current: 0,
            state: SessionState::Presenting,
            presentation: None,
            pending: None,
            verified: false,
            results: Vec::new(),
            verifications_passed: 0,
            verifications_failed: 0,
            started_at,
            completed_at: None,
        })
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn results(&self) -> &[QuestionResult] {
        &self.results
    }

    #[must_use]
    pub fn current_key(&self) -> Option<&QuestionKey> {
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Complete
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.results.iter().filter(|r| r.was_correct).count()
    }

    /// Percentage score over the questions answered so far.
    #[must_use]
    pub fn score(&self) -> f64 {
        session_score(self.correct_count(), self.results.len())
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.questions.len();
        SessionProgress {
            position: (self.current + 1).min(total),
            total,
            answered: self.results.len(),
            correct: self.correct_count(),
            remaining: total.saturating_sub(self.results.len()),
            is_complete: self.is_complete(),
        }
    }

    /// Show the current question with its options in a fresh random order.
    ///
    /// Calling this again while an answer is awaited (after a note detour) keeps the
    /// order already shown.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` after the last question,
    /// `SessionError::AlreadyAnswered` before [`advance`](Self::advance) is called,
    /// and `SessionError::UnknownQuestion` if the bank no longer holds the record.
    pub fn present<'b, R: Rng + ?Sized>(
        &mut self,
        bank: &'b QuestionBank,
        rng: &mut R,
    ) -> Result<QuestionView<'b>, SessionError> {
        match self.state {
            SessionState::Complete => return Err(SessionError::Completed),
            SessionState::Correct | SessionState::Incorrect | SessionState::Verification => {
                return Err(SessionError::AlreadyAnswered);
            }
            SessionState::Presenting | SessionState::AwaitingAnswer => {}
        }
        let key = self.current_key().ok_or(SessionError::Completed)?;
        let record = bank
            .find(key)
            .ok_or_else(|| SessionError::UnknownQuestion(key.clone()))?;

        let presentation = match (&self.presentation, self.state) {
            (Some(shown), SessionState::AwaitingAnswer) => shown.clone(),
            _ => shuffled(record.options().len(), rng),
        };
        let options = presentation.display(record.options()).collect();
        self.presentation = Some(presentation);
        self.state = SessionState::AwaitingAnswer;

        Ok(QuestionView {
            record,
            options,
            position: self.current + 1,
            total: self.questions.len(),
        })
    }

    /// Score displayed option numbers and write the outcome back through `metrics`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Answer` for choices that do not fit the question; the
    /// session keeps waiting for an answer and no attempt is recorded.
    pub fn submit(
        &mut self,
        bank: &mut QuestionBank,
        metrics: &MetricsService,
        displayed: &[usize],
    ) -> Result<AnswerFeedback, SessionError> {
        match self.state {
            SessionState::AwaitingAnswer => {}
            SessionState::Complete => return Err(SessionError::Completed),
            _ => return Err(SessionError::NotAwaitingAnswer),
        }
        let presentation = self
            .presentation
            .as_ref()
            .ok_or(SessionError::NotAwaitingAnswer)?;
        let key = self
            .questions
            .get(self.current)
            .ok_or(SessionError::Completed)?;
        let record = bank
            .find_mut(key)
            .ok_or_else(|| SessionError::UnknownQuestion(key.clone()))?;

        let chosen = presentation.map_choices(displayed, record.is_multi())?;
        let was_correct = is_correct(&chosen, record.correct());
        let correct_options = displayed_correct(presentation, record);
        let outcome = metrics.record_outcome(record, was_correct);

        self.results.push(QuestionResult {
            key: key.clone(),
            was_correct,
        });
        self.state = if was_correct {
            SessionState::Correct
        } else {
            SessionState::Incorrect
        };

        Ok(AnswerFeedback {
            key: key.clone(),
            was_correct,
            correct_options,
            outcome,
        })
    }

    /// Append a note to the current question. Consumes no attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` once the session has ended and
    /// `SessionError::UnknownQuestion` if the bank no longer holds the record.
    pub fn add_note(
        &mut self,
        bank: &mut QuestionBank,
        metrics: &MetricsService,
        note: &str,
    ) -> Result<Option<Persistence>, SessionError> {
        if self.is_complete() {
            return Err(SessionError::Completed);
        }
        let key = self.current_key().ok_or(SessionError::Completed)?;
        let record = bank
            .find_mut(key)
            .ok_or_else(|| SessionError::UnknownQuestion(key.clone()))?;
        Ok(metrics.append_note(record, note))
    }

    /// Pick a verification question after a correct answer, if the policy calls for one.
    ///
    /// A mastered question is followed by a random unmastered single-select question
    /// from the session pool; any other question by its own follow-up, when it has one.
    /// Mastery is judged on the counters as they stand after the answer.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownQuestion` if the bank no longer holds the record.
    pub fn begin_verification<'b, R: Rng + ?Sized>(
        &mut self,
        bank: &'b QuestionBank,
        policy: &VerificationPolicy,
        mastery: &MasteryPolicy,
        rng: &mut R,
    ) -> Result<Option<VerificationPrompt<'b>>, SessionError> {
        if self.state != SessionState::Correct || self.verified || !policy.is_enabled() {
            return Ok(None);
        }
        let key = self.current_key().ok_or(SessionError::Completed)?;
        let record = bank
            .find(key)
            .ok_or_else(|| SessionError::UnknownQuestion(key.clone()))?;

        let (pending, prompt) = if classify_record(record, mastery).is_mastered() {
            if !policy.spot_check_mastered {
                return Ok(None);
            }
            let candidates: Vec<&QuestionRecord> = self
                .pool
                .iter()
                .filter(|k| *k != key)
                .filter_map(|k| bank.find(k))
                .filter(|r| {
                    r.is_answerable() && !r.is_multi() && !classify_record(r, mastery).is_mastered()
                })
                .collect();
            let Some(&check) = candidates.choose(rng) else {
                debug!("no unmastered question available to spot-check {key}");
                return Ok(None);
            };
            let presentation = shuffled(check.options().len(), rng);
            let prompt = VerificationPrompt {
                kind: VerificationKind::SpotCheck,
                prompt: check.prompt(),
                options: presentation.display(check.options()).collect(),
            };
            (
                PendingVerification::SpotCheck {
                    key: check.key().clone(),
                    presentation,
                },
                prompt,
            )
        } else {
            let Some(secondary) = record.secondary().filter(|_| policy.secondary_for_unmastered)
            else {
                return Ok(None);
            };
            let prompt = VerificationPrompt {
                kind: VerificationKind::Secondary,
                prompt: secondary.prompt(),
                options: secondary
                    .options()
                    .iter()
                    .enumerate()
                    .map(|(i, text)| (i + 1, text.as_str()))
                    .collect(),
            };
            (PendingVerification::Secondary { key: key.clone() }, prompt)
        };

        self.pending = Some(pending);
        self.verified = true;
        self.state = SessionState::Verification;
        Ok(Some(prompt))
    }

    /// Check the pending verification answer. Never touches question metrics.
    ///
    /// Anything other than a single listed option number ends the verification
    /// as [`VerificationOutcome::Invalid`].
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoVerification` if no verification question is pending.
    pub fn answer_verification(
        &mut self,
        bank: &QuestionBank,
        raw: &str,
    ) -> Result<VerificationOutcome, SessionError> {
        let pending = self.pending.take().ok_or(SessionError::NoVerification)?;
        self.state = SessionState::Correct;
        let raw = raw.trim();
        let choice = if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            raw.parse::<usize>().ok()
        } else {
            None
        };

        let passed = match &pending {
            PendingVerification::SpotCheck { key, presentation } => {
                let record = bank
                    .find(key)
                    .ok_or_else(|| SessionError::UnknownQuestion(key.clone()))?;
                choice
                    .and_then(|n| presentation.original_index(n))
                    .map(|i| record.correct().contains(&i))
            }
            PendingVerification::Secondary { key } => {
                let secondary = bank
                    .find(key)
                    .and_then(QuestionRecord::secondary)
                    .ok_or_else(|| SessionError::UnknownQuestion(key.clone()))?;
                choice
                    .and_then(|n| n.checked_sub(1))
                    .filter(|&i| i < secondary.options().len())
                    .map(|i| i == secondary.correct())
            }
        };

        Ok(match passed {
            None => VerificationOutcome::Invalid,
            Some(true) => {
                self.verifications_passed += 1;
                VerificationOutcome::Passed
            }
            Some(false) => {
                self.verifications_failed += 1;
                let explanation = match &pending {
                    PendingVerification::Secondary { key } => bank
                        .find(key)
                        .and_then(QuestionRecord::secondary)
                        .map(|s| s.explanation().trim())
                        .filter(|e| !e.is_empty())
                        .map(str::to_owned),
                    PendingVerification::SpotCheck { .. } => None,
                };
                VerificationOutcome::Failed { explanation }
            }
        })
    }

    /// Move to the next question, completing the session after the last one.
    ///
    /// A pending verification is dropped unscored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotAnswered` if the current question has no answer yet
    /// and `SessionError::Completed` if the session already ended.
    pub fn advance(&mut self, at: DateTime<Utc>) -> Result<SessionProgress, SessionError> {
        match self.state {
            SessionState::Correct | SessionState::Incorrect | SessionState::Verification => {}
            SessionState::Complete => return Err(SessionError::Completed),
            SessionState::Presenting | SessionState::AwaitingAnswer => {
                return Err(SessionError::NotAnswered);
            }
        }
        self.pending = None;
        self.presentation = None;
        self.verified = false;
        self.current += 1;
        if self.current >= self.questions.len() {
            self.state = SessionState::Complete;
            self.completed_at = Some(at.max(self.started_at));
        } else {
            self.state = SessionState::Presenting;
        }
        Ok(self.progress())
    }

    /// # Errors
    ///
    /// Returns `SessionError::InProgress` until the last question has been advanced past.
    pub fn summary(&self) -> Result<SessionSummary, SessionError> {
        let completed_at = self.completed_at.ok_or(SessionError::InProgress)?;
        let asked = u32::try_from(self.results.len()).unwrap_or(u32::MAX);
        let correct = u32::try_from(self.correct_count()).unwrap_or(u32::MAX);
        Ok(SessionSummary::new(self.started_at, completed_at, asked, correct)?
            .with_verifications(self.verifications_passed, self.verifications_failed))
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("questions_len", &self.questions.len())
            .field("pool_len", &self.pool.len())
            .field("current", &self.current)
            .field("state", &self.state)
            .field("results_len", &self.results.len())
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .finish_non_exhaustive()
    }
}

fn shuffled<R: Rng + ?Sized>(options: usize, rng: &mut R) -> Presentation {
    let mut order: Vec<usize> = (0..options).collect();
    order.shuffle(rng);
    Presentation::from_order(order).unwrap_or_else(|_| Presentation::identity(options))
}

fn displayed_correct(presentation: &Presentation, record: &QuestionRecord) -> Vec<(usize, String)> {
    let correct: &BTreeSet<usize> = record.correct();
    presentation
        .display(record.options())
        .zip(presentation.order())
        .filter(|&(_, original)| correct.contains(original))
        .map(|((n, text), _)| (n, text.to_owned()))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::path::PathBuf;
    use std::sync::Arc;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use quiz_core::model::{AnswerError, Metrics, QuestionDraft, QuestionId, SecondaryQuestion};
    use quiz_core::time::fixed_now;
    use storage::repository::{BankWrite, InMemoryRepository};

    fn draft(id: u64, correct: &[usize], metrics: Metrics) -> QuestionDraft {
        QuestionDraft {
            source: PathBuf::from("bank.csv"),
            section: "SQL".into(),
            id: QuestionId::new(id),
            prompt: format!("Question {id}"),
            options: vec!["alpha".into(), "beta".into(), "gamma".into()],
            correct: correct.iter().copied().collect(),
            is_multi: correct.len() > 1,
            notes: String::new(),
            metrics,
            secondary: None,
        }
    }

    fn plan(bank: &QuestionBank) -> SessionPlan {
        let keys: Vec<_> = bank.records().iter().map(|r| r.key().clone()).collect();
        SessionPlan {
            questions: keys.clone(),
            pool: keys,
            unmastered_selected: 0,
            mastered_selected: 0,
            fallback: false,
            undersized: false,
        }
    }

    fn only_first(bank: &QuestionBank) -> SessionPlan {
        let mut plan = plan(bank);
        plan.questions.truncate(1);
        plan
    }

    /// Displayed numbers for the given option texts.
    fn pick(view: &QuestionView<'_>, texts: &[&str]) -> Vec<usize> {
        view.options
            .iter()
            .filter(|(_, text)| texts.contains(text))
            .map(|(n, _)| *n)
            .collect()
    }

    fn pick_prompt(prompt: &VerificationPrompt<'_>, text: &str) -> String {
        prompt
            .options
            .iter()
            .find(|(_, t)| *t == text)
            .map(|(n, _)| n.to_string())
            .unwrap()
    }

    fn harness() -> (InMemoryRepository, MetricsService, StdRng) {
        let repo = InMemoryRepository::new();
        let metrics = MetricsService::new(Arc::new(repo.clone()));
        (repo, metrics, StdRng::seed_from_u64(42))
    }

    #[test]
    fn empty_plan_is_rejected() {
        let plan = SessionPlan {
            questions: Vec::new(),
            pool: Vec::new(),
            unmastered_selected: 0,
            mastered_selected: 0,
            fallback: true,
            undersized: true,
        };
        assert!(matches!(QuizSession::new(plan, fixed_now()), Err(SessionError::Empty)));
    }

    #[test]
    fn full_session_scores_and_writes_each_answer() {
        let mut bank = QuestionBank::from_records(vec![
            draft(1, &[1], Metrics::default()).validate().unwrap(),
            draft(2, &[0, 2], Metrics::new(4, 1)).validate().unwrap(),
            draft(3, &[2], Metrics::default()).validate().unwrap(),
        ]);
        let (repo, metrics, mut rng) = harness();
        let mut session = QuizSession::new(plan(&bank), fixed_now()).unwrap();

        let answers: [&[&str]; 3] = [&["beta"], &["gamma", "alpha"], &["alpha"]];
        for texts in answers {
            let view = session.present(&bank, &mut rng).unwrap();
            let choices = pick(&view, texts);
            session.submit(&mut bank, &metrics, &choices).unwrap();
            session.advance(fixed_now()).unwrap();
        }

        assert!(session.is_complete());
        let summary = session.summary().unwrap();
        assert_eq!((summary.asked(), summary.correct()), (3, 2));
        assert_eq!(summary.score(), 66.67);
        assert_eq!(repo.writes().len(), 3);

        let second = &bank.records()[1];
        assert_eq!(second.metrics(), Metrics::new(5, 1));
        assert!(matches!(
            session.present(&bank, &mut rng),
            Err(SessionError::Completed)
        ));
    }

    #[test]
    fn partial_multi_select_is_incorrect_and_reports_the_answer() {
        let mut bank =
            QuestionBank::from_records(vec![draft(1, &[0, 2], Metrics::default()).validate().unwrap()]);
        let (_repo, metrics, mut rng) = harness();
        let mut session = QuizSession::new(plan(&bank), fixed_now()).unwrap();

        let view = session.present(&bank, &mut rng).unwrap();
        let choices = pick(&view, &["alpha"]);
        let feedback = session.submit(&mut bank, &metrics, &choices).unwrap();

        assert!(!feedback.was_correct);
        assert_eq!(session.state(), SessionState::Incorrect);
        let texts: BTreeSet<_> = feedback.correct_options.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(texts, BTreeSet::from(["alpha", "gamma"]));
        assert_eq!(feedback.outcome.updated, Metrics::new(0, 1));
    }

    #[test]
    fn invalid_choices_keep_waiting_without_an_attempt() {
        let mut bank =
            QuestionBank::from_records(vec![draft(1, &[1], Metrics::default()).validate().unwrap()]);
        let (repo, metrics, mut rng) = harness();
        let mut session = QuizSession::new(plan(&bank), fixed_now()).unwrap();
        session.present(&bank, &mut rng).unwrap();

        let err = session.submit(&mut bank, &metrics, &[4]).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Answer(AnswerError::OutOfRange { choice: 4, options: 3 })
        ));
        let err = session.submit(&mut bank, &metrics, &[1, 2]).unwrap_err();
        assert!(matches!(err, SessionError::Answer(AnswerError::SingleChoiceExpected { .. })));

        assert_eq!(session.state(), SessionState::AwaitingAnswer);
        assert!(repo.writes().is_empty());
        assert_eq!(bank.records()[0].metrics(), Metrics::default());
    }

    #[test]
    fn note_detour_keeps_the_displayed_order() {
        let mut bank =
            QuestionBank::from_records(vec![draft(1, &[1], Metrics::default()).validate().unwrap()]);
        let (repo, metrics, mut rng) = harness();
        let mut session = QuizSession::new(plan(&bank), fixed_now()).unwrap();

        let first: Vec<(usize, String)> = session
            .present(&bank, &mut rng)
            .unwrap()
            .options
            .into_iter()
            .map(|(n, t)| (n, t.to_owned()))
            .collect();
        let saved = session.add_note(&mut bank, &metrics, "check syntax").unwrap();
        assert_eq!(saved, Some(Persistence::Saved));

        let again: Vec<(usize, String)> = session
            .present(&bank, &mut rng)
            .unwrap()
            .options
            .into_iter()
            .map(|(n, t)| (n, t.to_owned()))
            .collect();
        assert_eq!(first, again);
        assert_eq!(session.progress().answered, 0);
        assert_eq!(bank.records()[0].notes(), "check syntax");
        assert!(matches!(repo.writes().as_slice(), [BankWrite::Note { .. }]));
    }

    #[test]
    fn advance_requires_an_answer() {
        let bank =
            QuestionBank::from_records(vec![draft(1, &[1], Metrics::default()).validate().unwrap()]);
        let (_repo, _metrics, mut rng) = harness();
        let mut session = QuizSession::new(plan(&bank), fixed_now()).unwrap();
        session.present(&bank, &mut rng).unwrap();

        assert!(matches!(session.advance(fixed_now()), Err(SessionError::NotAnswered)));
        assert!(matches!(session.summary(), Err(SessionError::InProgress)));
    }

    #[test]
    fn mastered_answer_is_spot_checked_from_the_pool() {
        let mut bank = QuestionBank::from_records(vec![
            draft(1, &[1], Metrics::new(9, 1)).validate().unwrap(),
            draft(2, &[2], Metrics::new(0, 3)).validate().unwrap(),
        ]);
        let (repo, metrics, mut rng) = harness();
        let mastery = MasteryPolicy::console();
        let mut session = QuizSession::new(only_first(&bank), fixed_now()).unwrap();

        let view = session.present(&bank, &mut rng).unwrap();
        let choices = pick(&view, &["beta"]);
        session.submit(&mut bank, &metrics, &choices).unwrap();

        let prompt = session
            .begin_verification(&bank, &VerificationPolicy::full(), &mastery, &mut rng)
            .unwrap()
            .unwrap();
        assert_eq!(prompt.kind, VerificationKind::SpotCheck);
        assert_eq!(prompt.prompt, "Question 2");

        let answer = pick_prompt(&prompt, "gamma");
        assert_eq!(
            session.answer_verification(&bank, &answer).unwrap(),
            VerificationOutcome::Passed
        );
        assert_eq!(bank.records()[1].metrics(), Metrics::new(0, 3));
        assert_eq!(repo.writes().len(), 1);

        session.advance(fixed_now()).unwrap();
        assert_eq!(session.summary().unwrap().verifications_passed(), 1);
    }

    #[test]
    fn wrong_secondary_answer_reveals_the_explanation() {
        let mut with_follow_up = draft(1, &[0], Metrics::default());
        with_follow_up.secondary = Some(
            SecondaryQuestion::new(
                "Does HAVING run after GROUP BY?",
                vec!["Yes".into(), "No".into()],
                0,
                "HAVING filters grouped rows.",
            )
            .unwrap(),
        );
        let mut bank = QuestionBank::from_records(vec![with_follow_up.validate().unwrap()]);
        let (_repo, metrics, mut rng) = harness();
        let mastery = MasteryPolicy::console();
        let mut session = QuizSession::new(plan(&bank), fixed_now()).unwrap();

        let view = session.present(&bank, &mut rng).unwrap();
        let choices = pick(&view, &["alpha"]);
        session.submit(&mut bank, &metrics, &choices).unwrap();

        let prompt = session
            .begin_verification(&bank, &VerificationPolicy::full(), &mastery, &mut rng)
            .unwrap()
            .unwrap();
        assert_eq!(prompt.kind, VerificationKind::Secondary);
        assert_eq!(prompt.options, vec![(1, "Yes"), (2, "No")]);

        assert_eq!(
            session.answer_verification(&bank, "2").unwrap(),
            VerificationOutcome::Failed {
                explanation: Some("HAVING filters grouped rows.".into())
            }
        );
        // one verification per question
        assert!(
            session
                .begin_verification(&bank, &VerificationPolicy::full(), &mastery, &mut rng)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn invalid_verification_input_is_not_scored() {
        let mut with_follow_up = draft(1, &[0], Metrics::default());
        with_follow_up.secondary =
            Some(SecondaryQuestion::new("Sure?", vec!["Yes".into(), "No".into()], 0, "").unwrap());
        let mut bank = QuestionBank::from_records(vec![with_follow_up.validate().unwrap()]);
        let (_repo, metrics, mut rng) = harness();
        let mut session = QuizSession::new(plan(&bank), fixed_now()).unwrap();

        let view = session.present(&bank, &mut rng).unwrap();
        let choices = pick(&view, &["alpha"]);
        session.submit(&mut bank, &metrics, &choices).unwrap();
        session
            .begin_verification(
                &bank,
                &VerificationPolicy::full(),
                &MasteryPolicy::console(),
                &mut rng,
            )
            .unwrap()
            .unwrap();

        assert_eq!(
            session.answer_verification(&bank, "7").unwrap(),
            VerificationOutcome::Invalid
        );
        assert!(matches!(
            session.answer_verification(&bank, "1"),
            Err(SessionError::NoVerification)
        ));
        session.advance(fixed_now()).unwrap();
        let summary = session.summary().unwrap();
        assert_eq!(
            (summary.verifications_passed(), summary.verifications_failed()),
            (0, 0)
        );
    }

    #[test]
    fn verification_is_skipped_when_disabled_or_incorrect() {
        let mut bank = QuestionBank::from_records(vec![
            draft(1, &[1], Metrics::new(9, 1)).validate().unwrap(),
            draft(2, &[2], Metrics::default()).validate().unwrap(),
        ]);
        let (_repo, metrics, mut rng) = harness();
        let mastery = MasteryPolicy::console();
        let mut session = QuizSession::new(plan(&bank), fixed_now()).unwrap();

        let view = session.present(&bank, &mut rng).unwrap();
        let choices = pick(&view, &["beta"]);
        session.submit(&mut bank, &metrics, &choices).unwrap();
        assert!(
            session
                .begin_verification(&bank, &VerificationPolicy::disabled(), &mastery, &mut rng)
                .unwrap()
                .is_none()
        );
        session.advance(fixed_now()).unwrap();

        let view = session.present(&bank, &mut rng).unwrap();
        let choices = pick(&view, &["alpha"]);
        session.submit(&mut bank, &metrics, &choices).unwrap();
        assert!(
            session
                .begin_verification(&bank, &VerificationPolicy::full(), &mastery, &mut rng)
                .unwrap()
                .is_none()
        );
    }
}
