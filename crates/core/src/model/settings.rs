use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("session max size must be at least 1")]
    ZeroMax,

    #[error("session min size ({min}) exceeds max size ({max})")]
    MinAboveMax { min: usize, max: usize },

    #[error("unknown selection policy {0:?} (expected all, mastered or unmastered)")]
    UnknownPolicy(String),
}

//
// ─── SESSION SIZE ──────────────────────────────────────────────────────────────
//

/// Bounds for one quiz session.
///
/// `max` caps the plan; `min` is advisory and only triggers a warning when the
/// pool is smaller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSize {
    min: usize,
    max: usize,
}

impl SessionSize {
    pub const DEFAULT_MIN: usize = 5;
    pub const DEFAULT_MAX: usize = 15;

    /// # Errors
    ///
    /// Returns `SettingsError` when `max` is zero or `min > max`.
    pub fn new(min: usize, max: usize) -> Result<Self, SettingsError> {
        if max == 0 {
            return Err(SettingsError::ZeroMax);
        }
        if min > max {
            return Err(SettingsError::MinAboveMax { min, max });
        }
        Ok(Self { min, max })
    }

    #[must_use]
    pub fn min(&self) -> usize {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> usize {
        self.max
    }
}

impl Default for SessionSize {
    fn default() -> Self {
        Self {
            min: Self::DEFAULT_MIN,
            max: Self::DEFAULT_MAX,
        }
    }
}

//
// ─── SELECTION POLICY ──────────────────────────────────────────────────────────
//

/// Which questions a session draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// Unmastered first, topped up with mastered ones.
    #[default]
    All,
    MasteredOnly,
    UnmasteredOnly,
}

impl SelectionPolicy {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::MasteredOnly => "mastered",
            Self::UnmasteredOnly => "unmastered",
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SelectionPolicy {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "mastered" => Ok(Self::MasteredOnly),
            "unmastered" => Ok(Self::UnmasteredOnly),
            other => Err(SettingsError::UnknownPolicy(other.to_owned())),
        }
    }
}

//
// ─── VERIFICATION ──────────────────────────────────────────────────────────────
//

/// Follow-up checks after a correct answer. Both are off by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VerificationPolicy {
    /// After a correct answer on a mastered question, quiz one unmastered question
    /// from the same session pool.
    pub spot_check_mastered: bool,
    /// After a correct answer on a not-yet-mastered question, ask its secondary question.
    pub secondary_for_unmastered: bool,
}

impl VerificationPolicy {
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn full() -> Self {
        Self {
            spot_check_mastered: true,
            secondary_for_unmastered: true,
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.spot_check_mastered || self.secondary_for_unmastered
    }
}
