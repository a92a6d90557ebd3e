//! Task persistence adapter over a key-value store.
//!
//! # Responsibility
//! - Serialize the whole task collection as one JSON array under one key.
//! - Reconstruct timestamps from their ISO-8601 form on load.
//! - Clean up the legacy storage key.
//!
//! # Invariants
//! - Payloads above the configured ceiling are rejected before any write.
//! - Corrupt or oversized stored content is discarded and loads as empty.
//! - An empty collection is stored as an absent key, not as `[]`.

use crate::config::TodoConfig;
use crate::model::task::Task;
use crate::repo::kv_store::{KeyValueStore, StoreError};
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence error for task load/save.
#[derive(Debug)]
pub enum RepoError {
    Store(StoreError),
    Encode(serde_json::Error),
    PayloadTooLarge { size: usize, limit: usize },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode tasks: {err}"),
            Self::PayloadTooLarge { size, limit } => write!(
                f,
                "task payload of {size} bytes exceeds storage limit of {limit} bytes"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::PayloadTooLarge { .. } => None,
        }
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Persistence contract consumed by the task manager.
pub trait TaskRepository {
    /// Reads the stored collection. Unreadable content yields an empty list.
    fn load(&mut self) -> RepoResult<Vec<Task>>;
    /// Replaces the stored collection.
    fn save(&mut self, tasks: &[Task]) -> RepoResult<()>;
}

/// JSON-array task repository over any [`KeyValueStore`].
pub struct KvTaskRepository<S: KeyValueStore> {
    store: S,
    key: String,
    legacy_key: String,
    max_payload_bytes: usize,
}

impl<S: KeyValueStore> KvTaskRepository<S> {
    /// Creates a repository with default keys and the 1 MiB ceiling.
    pub fn new(store: S) -> Self {
        Self::with_config(store, &TodoConfig::default())
    }

    pub fn with_config(store: S, config: &TodoConfig) -> Self {
        Self {
            store,
            key: config.storage_key.clone(),
            legacy_key: config.legacy_storage_key.clone(),
            max_payload_bytes: config.max_payload_bytes,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn discard(&mut self, reason: &str, detail: &str) -> RepoResult<Vec<Task>> {
        warn!(
            "event=tasks_load module=repo status=discarded reason={reason} detail={detail}"
        );
        self.store.remove(&self.key)?;
        Ok(Vec::new())
    }
}

impl<S: KeyValueStore> TaskRepository for KvTaskRepository<S> {
    fn load(&mut self) -> RepoResult<Vec<Task>> {
        self.store.remove(&self.legacy_key)?;

        let Some(bytes) = self.store.get(&self.key)? else {
            debug!("event=tasks_load module=repo status=ok count=0 source=empty");
            return Ok(Vec::new());
        };

        if bytes.len() > self.max_payload_bytes {
            let detail = format!("size={} limit={}", bytes.len(), self.max_payload_bytes);
            return self.discard("oversized", &detail);
        }

        match serde_json::from_slice::<Vec<Task>>(&bytes) {
            Ok(tasks) => {
                debug!(
                    "event=tasks_load module=repo status=ok count={} bytes={}",
                    tasks.len(),
                    bytes.len()
                );
                Ok(tasks)
            }
            Err(err) => self.discard("corrupt", &err.to_string()),
        }
    }

    fn save(&mut self, tasks: &[Task]) -> RepoResult<()> {
        if tasks.is_empty() {
            self.store.remove(&self.key)?;
            debug!("event=tasks_save module=repo status=ok count=0");
            return Ok(());
        }

        let payload = serde_json::to_vec(tasks).map_err(RepoError::Encode)?;
        if payload.len() > self.max_payload_bytes {
            return Err(RepoError::PayloadTooLarge {
                size: payload.len(),
                limit: self.max_payload_bytes,
            });
        }

        self.store.set(&self.key, &payload)?;
        debug!(
            "event=tasks_save module=repo status=ok count={} bytes={}",
            tasks.len(),
            payload.len()
        );
        Ok(())
    }
}
