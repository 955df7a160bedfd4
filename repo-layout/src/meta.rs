//! Persisted per-repository metadata (`meta/repo.json`).

use crate::errors::LayoutError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Small JSON record describing one indexed repository.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepoMeta {
    pub repo_id: String,
    pub root: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set after the first successful index run.
    #[serde(default)]
    pub last_index_at: Option<DateTime<Utc>>,
}

impl RepoMeta {
    /// Fresh record for a repository that was just initialized.
    pub fn new(repo_id: impl Into<String>, root: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            repo_id: repo_id.into(),
            root: root.into(),
            created_at: now,
            updated_at: now,
            last_index_at: None,
        }
    }

    /// Loads the record from `path`.
    ///
    /// # Errors
    /// Returns [`LayoutError::Meta`] on a missing or malformed file.
    pub fn load(path: &Path) -> Result<Self, LayoutError> {
        let bytes = std::fs::read(path)
            .map_err(|e| LayoutError::Meta(format!("{}: {e}", path.display())))?;
        serde_json::from_slice(&bytes).map_err(|e| LayoutError::Meta(e.to_string()))
    }

    /// Writes the record as pretty JSON, creating parent dirs when needed.
    pub fn save(&self, path: &Path) -> Result<(), LayoutError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(self).map_err(|e| LayoutError::Meta(e.to_string()))?;
        std::fs::write(path, json)?;
        debug!("RepoMeta::save path={:?}", path);
        Ok(())
    }

    /// Advances `updated_at`, and `last_index_at` when an index run finished.
    pub fn touch(&mut self, index_finished: bool) {
        let now = Utc::now();
        self.updated_at = now;
        if index_finished {
            self.last_index_at = Some(now);
        }
    }

    /// Loads the record or creates a fresh one when absent.
    pub fn load_or_create(path: &Path, repo_id: &str, root: &str) -> Result<Self, LayoutError> {
        match Self::load(path) {
            Ok(meta) => Ok(meta),
            Err(_) => Ok(Self::new(repo_id, root)),
        }
    }
}
