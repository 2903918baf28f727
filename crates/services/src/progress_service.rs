use std::sync::Arc;

use log::{info, warn};
use quiz_core::Clock;
use quiz_core::model::{
    Achievement, COMMAND_HISTORY_LIMIT, CommandCompletion, QuestionKey, SessionSummary,
    UserProgress,
};
use storage::repository::{ProgressRepository, StorageError};

//
// ─── ACHIEVEMENTS ──────────────────────────────────────────────────────────────
//

struct AchievementRule {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    unlocked: fn(&UserProgress) -> bool,
}

const RULES: &[AchievementRule] = &[
    AchievementRule {
        id: "first_command",
        title: "First Command",
        description: "Completed your first SQL command",
        unlocked: |p| p.sql.completed >= 1,
    },
    AchievementRule {
        id: "command_master_10",
        title: "SQL Master I",
        description: "Completed 10 SQL commands",
        unlocked: |p| p.sql.completed >= 10,
    },
    AchievementRule {
        id: "command_master_50",
        title: "SQL Master II",
        description: "Completed 50 SQL commands",
        unlocked: |p| p.sql.completed >= 50,
    },
    AchievementRule {
        id: "perfect_streak_5",
        title: "Perfect Streak",
        description: "5 commands in a row without errors",
        unlocked: |p| p.sql.current_streak >= 5,
    },
    AchievementRule {
        id: "speed_demon",
        title: "Speed Demon",
        description: "Completed a command in under 30 seconds",
        unlocked: |p| p.sql.fastest_seconds.is_some_and(|s| s < 30.0),
    },
    AchievementRule {
        id: "first_answer",
        title: "First Answer",
        description: "Answered your first question",
        unlocked: |p| p.quiz.answered >= 1,
    },
    AchievementRule {
        id: "knowledge_seeker",
        title: "Knowledge Seeker",
        description: "Answered 100 questions",
        unlocked: |p| p.quiz.answered >= 100,
    },
    AchievementRule {
        id: "accuracy_master",
        title: "Accuracy Master",
        description: "90% accuracy over 20 or more questions",
        unlocked: |p| p.quiz.answered >= 20 && p.quiz_accuracy() >= 90.0,
    },
    AchievementRule {
        id: "dedicated_student",
        title: "Dedicated Student",
        description: "One hour of accumulated study",
        unlocked: |p| p.study_minutes >= 60.0,
    },
    AchievementRule {
        id: "marathon_runner",
        title: "Marathon Runner",
        description: "Ten hours of accumulated study",
        unlocked: |p| p.study_minutes >= 600.0,
    },
    AchievementRule {
        id: "consistent_learner",
        title: "Consistent Learner",
        description: "Studied seven days in a row",
        unlocked: |p| p.study_days.current_streak >= 7,
    },
];

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Records study activity into the persisted [`UserProgress`].
///
/// Each update is a read-modify-write of the whole document. Load and save
/// failures are logged and never reach the caller.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    repo: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, repo: Arc<dyn ProgressRepository>) -> Self {
        Self { clock, repo }
    }

    /// Current progress; defaults when nothing has been saved yet or the file is unreadable.
    #[must_use]
    pub fn snapshot(&self) -> UserProgress {
        match self.repo.load() {
            Ok(progress) => progress,
            Err(StorageError::NotFound { .. }) => UserProgress::default(),
            Err(e) => {
                warn!("progress could not be loaded, starting from defaults: {e}");
                UserProgress::default()
            }
        }
    }

    /// Count a started session and mark today as a study day.
    pub fn start_session(&self) -> Vec<Achievement> {
        let today = self.clock.today();
        self.update(|p| {
            p.sessions_started = p.sessions_started.saturating_add(1);
            p.study_days.touch(today);
        })
    }

    pub fn finish_session(&self, summary: &SessionSummary) -> Vec<Achievement> {
        self.update(|p| {
            p.sessions_completed = p.sessions_completed.saturating_add(1);
            p.study_minutes += summary.minutes();
        })
    }

    /// Add study time for a flow that has no [`SessionSummary`], such as a SQL drill run.
    pub fn add_study_time(&self, minutes: f64) -> Vec<Achievement> {
        if minutes <= 0.0 || !minutes.is_finite() {
            return Vec::new();
        }
        self.update(|p| {
            p.sessions_completed = p.sessions_completed.saturating_add(1);
            p.study_minutes += minutes;
        })
    }

    pub fn record_answer(&self, key: &QuestionKey, was_correct: bool) -> Vec<Achievement> {
        let tally_key = key.tally_key();
        self.update(|p| {
            let quiz = &mut p.quiz;
            quiz.answered = quiz.answered.saturating_add(1);
            let tally = quiz.questions.entry(tally_key).or_default();
            if was_correct {
                quiz.correct = quiz.correct.saturating_add(1);
                quiz.current_streak = quiz.current_streak.saturating_add(1);
                quiz.best_streak = quiz.best_streak.max(quiz.current_streak);
                tally.correct = tally.correct.saturating_add(1);
            } else {
                quiz.current_streak = 0;
                tally.incorrect = tally.incorrect.saturating_add(1);
            }
        })
    }

    /// Record a finished SQL drill. The streak only grows on error-free completions.
    pub fn record_sql_completion(
        &self,
        command_id: &str,
        attempts: u32,
        errors: u32,
        elapsed_seconds: f64,
    ) -> Vec<Achievement> {
        let completed_at = self.clock.now();
        self.update(|p| {
            let sql = &mut p.sql;
            sql.attempts = sql.attempts.saturating_add(attempts);
            sql.errors = sql.errors.saturating_add(errors);
            sql.completed = sql.completed.saturating_add(1);
            sql.completed_ids.insert(command_id.to_owned());
            if errors == 0 {
                sql.current_streak = sql.current_streak.saturating_add(1);
                sql.best_streak = sql.best_streak.max(sql.current_streak);
            } else {
                sql.current_streak = 0;
            }
            sql.fastest_seconds = Some(
                sql.fastest_seconds
                    .map_or(elapsed_seconds, |best| best.min(elapsed_seconds)),
            );

            let tally = sql.commands.entry(command_id.to_owned()).or_default();
            tally.attempts = tally.attempts.saturating_add(attempts);
            tally.correct = tally.correct.saturating_add(1);
            tally.errors = tally.errors.saturating_add(errors);

            sql.history.push(CommandCompletion {
                command_id: command_id.to_owned(),
                attempts,
                errors,
                elapsed_seconds,
                completed_at,
            });
            let overflow = sql.history.len().saturating_sub(COMMAND_HISTORY_LIMIT);
            sql.history.drain(..overflow);
        })
    }

    /// Record a drill left unfinished; breaks the SQL streak.
    pub fn record_sql_abandoned(&self, command_id: &str, attempts: u32, errors: u32) -> Vec<Achievement> {
        self.update(|p| {
            let sql = &mut p.sql;
            sql.attempts = sql.attempts.saturating_add(attempts);
            sql.errors = sql.errors.saturating_add(errors);
            sql.current_streak = 0;
            let tally = sql.commands.entry(command_id.to_owned()).or_default();
            tally.attempts = tally.attempts.saturating_add(attempts);
            tally.errors = tally.errors.saturating_add(errors);
        })
    }

    /// Load, apply `change`, unlock achievements and save. Returns what was newly unlocked.
    fn update(&self, change: impl FnOnce(&mut UserProgress)) -> Vec<Achievement> {
        let mut progress = self.snapshot();
        change(&mut progress);
        let unlocked = self.unlock(&mut progress);
        if let Err(e) = self.repo.save(&progress) {
            warn!("progress not saved: {e}");
        }
        unlocked
    }

    fn unlock(&self, progress: &mut UserProgress) -> Vec<Achievement> {
        let now = self.clock.now();
        let fresh: Vec<Achievement> = RULES
            .iter()
            .filter(|rule| !progress.has_achievement(rule.id) && (rule.unlocked)(progress))
            .map(|rule| Achievement {
                id: rule.id.to_owned(),
                title: rule.title.to_owned(),
                description: rule.description.to_owned(),
                unlocked_at: now,
            })
            .collect();
        for achievement in &fresh {
            info!("achievement unlocked: {}", achievement.id);
        }
        progress.achievements.extend(fresh.iter().cloned());
        fresh
    }
}
