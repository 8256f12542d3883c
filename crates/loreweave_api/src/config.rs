//! Environment-driven runtime configuration.
//!
//! # Invariants
//! - The database path is resolved once per process and never changes.
//! - Missing or blank variables fall back to defaults; they are not errors.

use loreweave_core::{default_log_level, init_logging};
use std::path::PathBuf;
use std::sync::OnceLock;

pub const DB_PATH_ENV: &str = "LOREWEAVE_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "LOREWEAVE_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "LOREWEAVE_LOG_DIR";
const DEFAULT_DB_FILE_NAME: &str = "loreweave.sqlite3";

static DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Logging stays off when unset.
    pub log_dir: Option<String>,
}

impl ApiConfig {
    /// Reads settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, which stands in for the environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            db_path: read(DB_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME)),
            log_level: read(LOG_LEVEL_ENV).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: read(LOG_DIR_ENV),
        }
    }

    /// Starts file logging when a log directory is configured.
    ///
    /// # Errors
    /// Propagates `loreweave_core::init_logging` failures.
    pub fn init_logging(&self) -> Result<(), String> {
        match &self.log_dir {
            Some(log_dir) => init_logging(&self.log_level, log_dir),
            None => Ok(()),
        }
    }
}

/// Returns the process-wide database path, resolving it on first use.
pub fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| ApiConfig::from_env().db_path)
        .clone()
}
