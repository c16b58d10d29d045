//! Application settings and paths.
//!
//! Manages XDG-compliant paths for configuration, data, and cache, and the
//! engine tuning knobs (page size, worker pool, retry and rate budget).

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application directory paths following XDG Base Directory Specification.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/orgscan)
    pub config_dir: PathBuf,
    /// Data directory (~/.local/share/orgscan)
    pub data_dir: PathBuf,
    /// Cache directory (~/.cache/orgscan)
    pub cache_dir: PathBuf,
}

impl Paths {
    /// Resolve paths using XDG directories, creating them if needed.
    pub fn resolve() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "orgscan", "orgscan")
            .ok_or(ConfigError::DirectoryNotFound)?;

        let paths = Self {
            config_dir: project.config_dir().to_path_buf(),
            data_dir: project.data_dir().to_path_buf(),
            cache_dir: project.cache_dir().to_path_buf(),
        };
        paths.ensure()?;
        Ok(paths)
    }

    /// Lay all directories out under a single root.
    pub fn under(root: &Path) -> ConfigResult<Self> {
        let paths = Self {
            config_dir: root.join("config"),
            data_dir: root.join("data"),
            cache_dir: root.join("cache"),
        };
        paths.ensure()?;
        Ok(paths)
    }

    fn ensure(&self) -> ConfigResult<()> {
        fs::create_dir_all(&self.config_dir)?;
        fs::create_dir_all(&self.data_dir)?;
        fs::create_dir_all(&self.cache_dir)?;
        Ok(())
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }

    /// Directory holding the durable per-category result lists.
    pub fn results_dir(&self) -> PathBuf {
        self.data_dir.join("results")
    }

    /// Session-scoped file holding credentials and the cached summary.
    pub fn session_file(&self) -> PathBuf {
        self.cache_dir.join("session.json")
    }
}

/// Engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Base URL of the GitHub REST API.
    pub api_base_url: String,
    /// Items requested per page (GitHub caps this at 100).
    pub per_page: u32,
    /// Units in flight per scan.
    pub concurrency: usize,
    /// Stop issuing requests once remaining quota drops to this floor.
    pub quota_floor: u32,
    /// Retries per request for rate-limit and transient failures.
    pub max_retries: u32,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Initial backoff delay in milliseconds.
    pub backoff_base_ms: u64,
    /// Backoff ceiling in milliseconds.
    pub backoff_max_ms: u64,
    /// Local pacing in requests per second, 0 for unlimited.
    pub max_requests_per_second: u32,
    /// Listen address for `orgscan serve`.
    pub bind_address: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.github.com".to_string(),
            per_page: 100,
            concurrency: 5,
            quota_floor: 10,
            max_retries: 4,
            request_timeout_ms: 30_000,
            backoff_base_ms: 500,
            backoff_max_ms: 30_000,
            max_requests_per_second: 0,
            bind_address: "127.0.0.1:8000".to_string(),
        }
    }
}

impl AppSettings {
    /// Load settings from the default location, falling back to defaults.
    pub fn load(paths: &Paths) -> ConfigResult<Self> {
        let file = paths.settings_file();

        if !file.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to the default location.
    pub fn save(&self, paths: &Paths) -> ConfigResult<()> {
        let file = paths.settings_file();

        let content = serde_json::to_string_pretty(self)?;
        fs::write(&file, content).map_err(|e| ConfigError::WriteFailed {
            path: file,
            reason: e.to_string(),
        })
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.per_page == 0 || self.per_page > 100 {
            return Err(ConfigError::InvalidValue(format!(
                "per_page must be between 1 and 100, got {}",
                self.per_page
            )));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.backoff_base_ms > self.backoff_max_ms {
            return Err(ConfigError::InvalidValue(
                "backoff_base_ms must not exceed backoff_max_ms".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
