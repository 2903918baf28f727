use std::path::PathBuf;

use quiz_core::model::{SelectionPolicy, SessionSize, VerificationPolicy};
use quiz_core::{Clock, MasteryPolicy, MasteryPreset};
use services::BankFilter;

/// Everything the front-end flows need, built once from the command line.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub clock: Clock,
    pub banks_dir: PathBuf,
    pub commands_dir: PathBuf,
    pub progress_file: PathBuf,
    pub mastery: MasteryPolicy,
    pub policy: SelectionPolicy,
    pub size: SessionSize,
    pub verification: VerificationPolicy,
    pub filter: BankFilter,
}

impl AppConfig {
    #[must_use]
    pub fn new(banks_dir: PathBuf, commands_dir: PathBuf, progress_file: PathBuf) -> Self {
        Self {
            clock: Clock::default(),
            banks_dir,
            commands_dir,
            progress_file,
            mastery: MasteryPreset::default().policy(),
            policy: SelectionPolicy::default(),
            size: SessionSize::default(),
            verification: VerificationPolicy::disabled(),
            filter: BankFilter::all(),
        }
    }

    #[must_use]
    pub fn with_mastery(mut self, preset: MasteryPreset) -> Self {
        self.mastery = preset.policy();
        self
    }

    /// # Errors
    ///
    /// Returns `quiz_core::Error` when `min` exceeds `max` or `max` is zero.
    pub fn with_session(
        mut self,
        policy: SelectionPolicy,
        min: usize,
        max: usize,
        verify: bool,
    ) -> Result<Self, quiz_core::Error> {
        self.policy = policy;
        self.size = SessionSize::new(min, max)?;
        self.verification = if verify {
            VerificationPolicy::full()
        } else {
            VerificationPolicy::disabled()
        };
        Ok(self)
    }

    #[must_use]
    pub fn with_sections(mut self, sections: &[String]) -> Self {
        self.filter = BankFilter::sections(sections.iter().cloned());
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> AppConfig {
        AppConfig::new("banks".into(), "commands".into(), "progress.json".into())
    }

    #[test]
    fn defaults_match_the_console_quiz() {
        let config = base();
        assert_eq!(config.mastery, MasteryPolicy::console());
        assert_eq!(config.size, SessionSize::default());
        assert!(!config.verification.is_enabled());
        assert!(config.filter.is_all());
    }

    #[test]
    fn session_settings_are_validated() {
        assert!(base().with_session(SelectionPolicy::All, 9, 3, false).is_err());

        let config = base()
            .with_session(SelectionPolicy::UnmasteredOnly, 1, 3, true)
            .unwrap()
            .with_mastery(MasteryPreset::Platform)
            .with_sections(&["SQL".to_owned()]);
        assert_eq!(config.size.max(), 3);
        assert!(config.verification.spot_check_mastered);
        assert_eq!(config.mastery, MasteryPolicy::platform());
        assert!(!config.filter.is_all());
    }
}
