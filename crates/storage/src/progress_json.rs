use std::fs;
use std::path::{Path, PathBuf};

use quiz_core::model::UserProgress;

use crate::atomic::write_atomic;
use crate::repository::{ProgressRepository, StorageError};

/// User progress kept as one pretty-printed JSON document.
#[derive(Debug, Clone)]
pub struct JsonProgressRepository {
    path: PathBuf,
}

impl JsonProgressRepository {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProgressRepository for JsonProgressRepository {
    fn load(&self) -> Result<UserProgress, StorageError> {
        let raw = fs::read_to_string(&self.path).map_err(|e| StorageError::io(&self.path, e))?;
        serde_json::from_str(&raw).map_err(|e| {
            StorageError::Serialization(format!("{}: {e}", self.path.display()))
        })
    }

    fn save(&self, progress: &UserProgress) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(progress)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        write_atomic(&self.path, json.as_bytes())
    }
}
