//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "databaseFile": "bankline.duckdb",
//!   "lockTimeoutMs": 5000,
//!   "logFilter": "warn"
//! }
//! ```
//! Unknown keys are ignored. Environment variables override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::domain::result::{Error, Result};

pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_DATABASE_FILE: &str = "bankline.duckdb";
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_LOG_FILTER: &str = "warn";

pub const LOCK_TIMEOUT_ENV: &str = "BANKLINE_LOCK_TIMEOUT_MS";
pub const LOG_FILTER_ENV: &str = "BANKLINE_LOG";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    database_file: Option<String>,
    #[serde(default)]
    lock_timeout_ms: Option<u64>,
    #[serde(default)]
    log_filter: Option<String>,
}

/// Bankline configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database file name, relative to the data directory
    pub database_file: String,
    /// How long a unit of work waits for an account lock
    pub lock_timeout_ms: u64,
    /// `tracing` filter directive used by the binary
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_file: DEFAULT_DATABASE_FILE.to_string(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// Environment variables take precedence over the settings file:
    /// - `BANKLINE_LOCK_TIMEOUT_MS` for the lock timeout
    /// - `BANKLINE_LOG` for the log filter
    pub fn load(data_dir: &Path) -> Result<Self> {
        Self::load_with(data_dir, |key| std::env::var(key).ok())
    }

    fn load_with(data_dir: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw = read_settings(&data_dir.join(SETTINGS_FILE))?;
        let defaults = Self::default();

        let lock_timeout_ms = match env(LOCK_TIMEOUT_ENV) {
            Some(value) => value.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!(
                    "{} must be a whole number of milliseconds, got '{}'",
                    LOCK_TIMEOUT_ENV, value
                ))
            })?,
            None => raw.lock_timeout_ms.unwrap_or(defaults.lock_timeout_ms),
        };

        Ok(Self {
            database_file: raw
                .database_file
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(defaults.database_file),
            lock_timeout_ms,
            log_filter: env(LOG_FILTER_ENV)
                .or(raw.log_filter)
                .unwrap_or(defaults.log_filter),
        })
    }

    /// Full path of the database file
    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.database_file)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

fn read_settings(path: &Path) -> Result<SettingsFile> {
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(path)?;
    // damaged settings fall back to defaults
    Ok(serde_json::from_str(&content).unwrap_or_default())
}
