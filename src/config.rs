// src/config.rs

//! Runtime settings for the publishing engine

use std::env;

/// Default location of the content store database
pub const DEFAULT_DB_PATH: &str = "/var/lib/bindery/bindery.db";

/// Default tracing filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Engine settings, resolved once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Path to the SQLite content store
    pub db_path: String,
    /// Tracing filter directive, e.g. `info` or `bindery=debug`
    pub log_filter: String,
}

impl Settings {
    /// Create settings pointing at an explicit database path
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    /// Resolve settings from `BINDERY_DB_PATH` and `BINDERY_LOG`,
    /// falling back to the defaults for anything unset
    pub fn from_env() -> Self {
        Self {
            db_path: env::var("BINDERY_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string()),
            log_filter: env::var("BINDERY_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(DEFAULT_DB_PATH)
    }
}
