//! Runtime configuration for the todo core.
//!
//! # Responsibility
//! - Hold storage keys, payload ceiling, reminder cadence and log sink
//!   settings in one place.
//! - Resolve overrides from the process environment.
//!
//! # Invariants
//! - Invalid environment values never abort startup; defaults are kept and a
//!   warning is logged.

use log::{warn, LevelFilter};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Key holding the current JSON task array.
pub const STORAGE_KEY: &str = "tasks_v1";
/// Key written by the previous storage format; removed on every load.
pub const LEGACY_STORAGE_KEY: &str = "tasks";
/// Largest serialized task payload accepted for persistence (1 MiB).
pub const MAX_PAYLOAD_BYTES: usize = 1_048_576;
/// Default period between reminder scans.
pub const DEFAULT_REMINDER_INTERVAL: Duration = Duration::from_secs(60);

const DB_FILE_NAME: &str = "todo_store.sqlite3";
const LOG_DIR_NAME: &str = "todo-logs";
const ENV_DB_PATH: &str = "TODO_DB_PATH";
const ENV_REMINDER_INTERVAL_SECS: &str = "TODO_REMINDER_INTERVAL_SECS";
const ENV_LOG_LEVEL: &str = "TODO_LOG_LEVEL";
const ENV_LOG_DIR: &str = "TODO_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoConfig {
    pub storage_key: String,
    pub legacy_storage_key: String,
    pub max_payload_bytes: usize,
    pub reminder_interval: Duration,
    pub db_path: PathBuf,
    /// Threshold for the rolling log file; `debug` in debug builds.
    pub log_level: LevelFilter,
    /// Absolute directory receiving rolling log files.
    pub log_dir: PathBuf,
}

impl Default for TodoConfig {
    fn default() -> Self {
        Self {
            storage_key: STORAGE_KEY.to_string(),
            legacy_storage_key: LEGACY_STORAGE_KEY.to_string(),
            max_payload_bytes: MAX_PAYLOAD_BYTES,
            reminder_interval: DEFAULT_REMINDER_INTERVAL,
            db_path: std::env::temp_dir().join(DB_FILE_NAME),
            log_level: if cfg!(debug_assertions) {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            },
            log_dir: std::env::temp_dir().join(LOG_DIR_NAME),
        }
    }
}

impl TodoConfig {
    /// Builds configuration from defaults plus `TODO_*` environment overrides.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    ///
    /// Split out from [`TodoConfig::from_env`] so tests never touch the real
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_DB_PATH) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                config.db_path = PathBuf::from(trimmed);
            }
        }

        if let Some(raw) = lookup(ENV_REMINDER_INTERVAL_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.reminder_interval = Duration::from_secs(secs),
                _ => warn!(
                    "event=config_load module=config status=fallback key={} value={:?}",
                    ENV_REMINDER_INTERVAL_SECS, raw
                ),
            }
        }

        if let Some(raw) = lookup(ENV_LOG_LEVEL) {
            match parse_log_level(&raw) {
                Some(level) => config.log_level = level,
                None => warn!(
                    "event=config_load module=config status=fallback key={} value={:?}",
                    ENV_LOG_LEVEL, raw
                ),
            }
        }

        if let Some(raw) = lookup(ENV_LOG_DIR) {
            let trimmed = raw.trim();
            if Path::new(trimmed).is_absolute() {
                config.log_dir = PathBuf::from(trimmed);
            } else {
                warn!(
                    "event=config_load module=config status=fallback key={} value={:?}",
                    ENV_LOG_DIR, raw
                );
            }
        }

        config
    }
}

/// Parses a log threshold name, case-insensitively.
///
/// `warning` is accepted as an alias of `warn`. `off` is rejected: the sink
/// is either running with a threshold or not started at all.
pub fn parse_log_level(raw: &str) -> Option<LevelFilter> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(LevelFilter::Trace),
        "debug" => Some(LevelFilter::Debug),
        "info" => Some(LevelFilter::Info),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "error" => Some(LevelFilter::Error),
        _ => None,
    }
}
