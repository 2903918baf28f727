use std::sync::Arc;

use log::info;
use rand::Rng;

use quiz_core::Clock;
use quiz_core::mastery::MasteryPolicy;
use quiz_core::model::{
    Achievement, AnswerInput, SelectionPolicy, SessionSize, SessionSummary, VerificationPolicy,
};
use storage::QuestionBank;
use storage::repository::{BankWriter, ProgressRepository};

use super::plan::{BankFilter, SessionBuilder};
use super::progress::SessionProgress;
use super::service::{AnswerFeedback, QuizSession, VerificationPrompt};
use crate::error::SessionError;
use crate::metrics_service::{MetricsService, Persistence};
use crate::progress_service::ProgressService;

/// A freshly started session and how its selection went.
#[derive(Debug)]
pub struct StartedSession {
    pub session: QuizSession,
    pub fallback: bool,
    pub undersized: bool,
    pub unlocked: Vec<Achievement>,
}

/// What the respondent's input led to.
#[derive(Debug, Clone, PartialEq)]
pub enum InputResult {
    /// Note entry was requested; the question stays open.
    NoteRequested,
    Answered {
        feedback: AnswerFeedback,
        unlocked: Vec<Achievement>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Advanced {
    pub progress: SessionProgress,
    /// Present once the last question has been passed.
    pub completed: Option<CompletedSession>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedSession {
    pub summary: SessionSummary,
    pub unlocked: Vec<Achievement>,
}

/// Orchestrates selection, answering, write-back and progress for quiz sessions.
#[derive(Clone)]
pub struct QuizLoopService {
    clock: Clock,
    metrics: MetricsService,
    progress: ProgressService,
    mastery: MasteryPolicy,
    verification: VerificationPolicy,
    policy: SelectionPolicy,
    size: SessionSize,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        writer: Arc<dyn BankWriter>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            metrics: MetricsService::new(writer),
            progress: ProgressService::new(clock, progress),
            mastery: MasteryPolicy::console(),
            verification: VerificationPolicy::disabled(),
            policy: SelectionPolicy::All,
            size: SessionSize::default(),
        }
    }

    #[must_use]
    pub fn with_mastery(mut self, mastery: MasteryPolicy) -> Self {
        self.mastery = mastery;
        self
    }

    #[must_use]
    pub fn with_verification(mut self, verification: VerificationPolicy) -> Self {
        self.verification = verification;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_size(mut self, size: SessionSize) -> Self {
        self.size = size;
        self
    }

    #[must_use]
    pub fn mastery(&self) -> &MasteryPolicy {
        &self.mastery
    }

    #[must_use]
    pub fn verification(&self) -> VerificationPolicy {
        self.verification
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressService {
        &self.progress
    }

    /// Select questions from `bank` and start a session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if nothing in the bank passes the filter.
    pub fn start_session<R: Rng + ?Sized>(
        &self,
        bank: &QuestionBank,
        filter: BankFilter,
        rng: &mut R,
    ) -> Result<StartedSession, SessionError> {
        let plan = SessionBuilder::new(&self.mastery)
            .with_policy(self.policy)
            .with_size(self.size)
            .with_filter(filter)
            .build(bank.records(), rng);
        let (fallback, undersized) = (plan.fallback, plan.undersized);
        info!(
            "starting session with {} questions ({} unmastered, {} mastered)",
            plan.total(),
            plan.unmastered_selected,
            plan.mastered_selected
        );
        let session = QuizSession::new(plan, self.clock.now())?;
        let unlocked = self.progress.start_session();
        Ok(StartedSession {
            session,
            fallback,
            undersized,
            unlocked,
        })
    }

    /// Parse raw input: a note request, or choices to score and record.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Answer` for unparseable or invalid choices; the caller
    /// re-prompts.
    pub fn handle_input(
        &self,
        session: &mut QuizSession,
        bank: &mut QuestionBank,
        raw: &str,
    ) -> Result<InputResult, SessionError> {
        match AnswerInput::parse(raw)? {
            AnswerInput::NoteRequest => Ok(InputResult::NoteRequested),
            AnswerInput::Choices(choices) => {
                let feedback = session.submit(bank, &self.metrics, &choices)?;
                let unlocked = self.progress.record_answer(&feedback.key, feedback.was_correct);
                Ok(InputResult::Answered { feedback, unlocked })
            }
        }
    }

    /// # Errors
    ///
    /// See [`QuizSession::add_note`].
    pub fn add_note(
        &self,
        session: &mut QuizSession,
        bank: &mut QuestionBank,
        note: &str,
    ) -> Result<Option<Persistence>, SessionError> {
        session.add_note(bank, &self.metrics, note)
    }

    /// # Errors
    ///
    /// See [`QuizSession::begin_verification`].
    pub fn begin_verification<'b, R: Rng + ?Sized>(
        &self,
        session: &mut QuizSession,
        bank: &'b QuestionBank,
        rng: &mut R,
    ) -> Result<Option<VerificationPrompt<'b>>, SessionError> {
        session.begin_verification(bank, &self.verification, &self.mastery, rng)
    }

    /// Advance the session and, after the last question, record its summary.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::advance`].
    pub fn advance(&self, session: &mut QuizSession) -> Result<Advanced, SessionError> {
        let progress = session.advance(self.clock.now())?;
        if !progress.is_complete {
            return Ok(Advanced {
                progress,
                completed: None,
            });
        }
        let summary = session.summary()?;
        info!(
            "session complete: {}/{} correct ({:.2})",
            summary.correct(),
            summary.asked(),
            summary.score()
        );
        let unlocked = self.progress.finish_session(&summary);
        Ok(Advanced {
            progress,
            completed: Some(CompletedSession { summary, unlocked }),
        })
    }
}
