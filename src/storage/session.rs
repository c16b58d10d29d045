//! Session-scoped state: credential, organization, cached summary.
//!
//! Kept apart from the durable result store so that disconnecting wipes the
//! credential without touching audit results.

use crate::config::Credentials;
use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// High-level repository counts for an organization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgSummary {
    pub total_repositories: u64,
    pub active_repositories: u64,
    pub archived_repositories: u64,
    pub private_repositories: u64,
    pub public_repositories: u64,
}

/// Everything the session store holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub credentials: Credentials,
    pub connected_at: DateTime<Utc>,
    #[serde(default)]
    pub summary: Option<OrgSummary>,
}

impl SessionState {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            connected_at: Utc::now(),
            summary: None,
        }
    }
}

/// Single-file session store.
#[derive(Debug, Clone)]
pub struct SessionStore {
    file: PathBuf,
}

impl SessionStore {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }

    pub fn load(&self) -> StoreResult<Option<SessionState>> {
        if !self.file.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.file).map_err(|e| StoreError::LoadFailed {
            key: "session".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Write the session, readable by the owner only.
    pub fn save(&self, state: &SessionState) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(state)?;
        let save_failed = |e: std::io::Error| StoreError::SaveFailed {
            key: "session".to_string(),
            reason: e.to_string(),
        };

        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::DirectoryError(e.to_string()))?;
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&self.file).map_err(save_failed)?;
        file.write_all(content.as_bytes()).map_err(save_failed)
    }

    /// Cache a freshly computed summary in the current session.
    pub fn update_summary(&self, summary: OrgSummary) -> StoreResult<bool> {
        match self.load()? {
            Some(mut state) => {
                state.summary = Some(summary);
                self.save(&state)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Forget the session. Returns whether anything was removed.
    pub fn clear(&self) -> StoreResult<bool> {
        if !self.file.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.file).map_err(|e| StoreError::SaveFailed {
            key: "session".to_string(),
            reason: e.to_string(),
        })?;
        Ok(true)
    }
}
