//! Core domain logic for the todo app.
//! This crate is the single source of truth for task invariants; the view
//! layer only renders the collection it publishes.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{parse_log_level, TodoConfig};
pub use logging::{init_logging, is_logging_active, LoggingError};
pub use model::category::{CategoryFilter, ALL_CATEGORIES, PRESET_CATEGORIES};
pub use model::task::{Priority, Recurrence, Task, TaskDraft, TaskId, UnknownLabel};
pub use notify::{LogNotifier, Notifier, PermissionState};
pub use repo::kv_store::{
    KeyValueStore, MemoryKeyValueStore, SqliteKeyValueStore, StoreError, StoreResult,
};
pub use repo::task_repo::{KvTaskRepository, RepoError, RepoResult, TaskRepository};
pub use service::reminder::ReminderScanner;
pub use service::task_manager::{StorageStatus, TaskManager, TaskSnapshot};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
