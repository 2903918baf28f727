use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Numeric question identifier, unique within one section of one bank file.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionId(u64);

impl QuestionId {
    /// Creates a new `QuestionId`
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying u64 value
    #[must_use]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({})", self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for parsing ID from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    raw: String,
}

impl ParseIdError {
    /// The rejected input, untrimmed.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse QuestionId from {:?}", self.raw)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for QuestionId {
    type Err = ParseIdError;

    /// Accepts ASCII digits only (surrounding whitespace is ignored).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseIdError { raw: s.to_owned() });
        }
        trimmed
            .parse::<u64>()
            .map(QuestionId::new)
            .map_err(|_| ParseIdError { raw: s.to_owned() })
    }
}

// ─── Question Key ──────────────────────────────────────────────────────────────

/// Globally unique handle for a loaded question: source file + section + id.
///
/// `(section, id)` is the write-back key inside one file; the source path
/// disambiguates records that share it across different files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuestionKey {
    source: PathBuf,
    section: String,
    id: QuestionId,
}

impl QuestionKey {
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, section: impl Into<String>, id: QuestionId) -> Self {
        Self {
            source: source.into(),
            section: section.into(),
            id,
        }
    }

    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    #[must_use]
    pub fn section(&self) -> &str {
        &self.section
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    /// Stable key used for per-question tallies in the progress file.
    #[must_use]
    pub fn tally_key(&self) -> String {
        let module = self
            .source
            .file_stem()
            .map_or_else(|| "unknown".into(), |s| s.to_string_lossy());
        format!("{module}/{}/{}", self.section, self.id)
    }
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{} ({})", self.section, self.id, self.source.display())
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_id_display() {
        assert_eq!(QuestionId::new(42).to_string(), "42");
    }

    #[test]
    fn question_id_from_str_trims() {
        let id: QuestionId = " 7 ".parse().unwrap();
        assert_eq!(id, QuestionId::new(7));
    }

    #[test]
    fn question_id_rejects_signs_and_words() {
        assert!("-3".parse::<QuestionId>().is_err());
        assert!("+3".parse::<QuestionId>().is_err());
        assert!("abc".parse::<QuestionId>().is_err());
        assert!("".parse::<QuestionId>().is_err());
    }

    #[test]
    fn tally_key_uses_file_stem() {
        let key = QuestionKey::new("/banks/dp700_lakehouse.csv", "SQL", QuestionId::new(3));
        assert_eq!(key.tally_key(), "dp700_lakehouse/SQL/3");
    }
}
