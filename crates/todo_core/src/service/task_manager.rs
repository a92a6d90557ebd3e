//! Task state manager.
//!
//! # Responsibility
//! - Own the authoritative ordered task collection for one session.
//! - Apply pure task operations, persist the result, and publish a snapshot.
//! - Track transient view state (expanded notes panels).
//!
//! # Invariants
//! - No mutation returns an error; storage failures are logged and reflected
//!   in [`TaskManager::storage_status`], the in-memory collection stays
//!   authoritative.
//! - The published snapshot always equals `tasks()` after a mutation returns.
//! - Notification permission outcomes never gate an operation.
//! - After a failed load nothing is saved until a load succeeds; the stored
//!   collection is then merged ahead of tasks created in the meantime.

use crate::clock::Clock;
use crate::model::category::CategoryFilter;
use crate::model::task::{Task, TaskDraft, TaskId};
use crate::notify::Notifier;
use crate::repo::task_repo::TaskRepository;
use crate::service::task_ops;
use arc_swap::ArcSwap;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Always-current, lock-free view of the latest task collection.
pub type TaskSnapshot = Arc<ArcSwap<Vec<Task>>>;

/// Outcome of the most recent storage interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageStatus {
    Healthy,
    /// Last load or save failed; holds the error message.
    Degraded(String),
}

/// Explicit state container for one todo session.
pub struct TaskManager<R: TaskRepository> {
    tasks: Vec<Task>,
    repo: R,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    snapshot: TaskSnapshot,
    expanded_notes: HashSet<TaskId>,
    storage_status: StorageStatus,
    // Stored state was never read; saving now would overwrite it.
    load_pending: bool,
}

impl<R: TaskRepository> TaskManager<R> {
    /// Loads persisted tasks and requests notification permission.
    ///
    /// A failing load starts the session with an empty collection and defers
    /// saving until a later load succeeds.
    pub fn open(mut repo: R, notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        let (tasks, storage_status) = match repo.load() {
            Ok(tasks) => (tasks, StorageStatus::Healthy),
            Err(err) => {
                warn!(
                    "event=manager_open module=service status=degraded error_code=load_failed error={err}"
                );
                (Vec::new(), StorageStatus::Degraded(err.to_string()))
            }
        };

        let permission = notifier.request_permission();
        info!(
            "event=manager_open module=service status=ok count={} permission={:?}",
            tasks.len(),
            permission
        );

        let snapshot = Arc::new(ArcSwap::from_pointee(tasks.clone()));
        Self {
            tasks,
            repo,
            notifier,
            clock,
            snapshot,
            load_pending: matches!(storage_status, StorageStatus::Degraded(_)),
            expanded_notes: HashSet::new(),
            storage_status,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Returns the shared handle read by background reminder scans.
    pub fn snapshot(&self) -> TaskSnapshot {
        Arc::clone(&self.snapshot)
    }

    pub fn storage_status(&self) -> &StorageStatus {
        &self.storage_status
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Adds a task from form input.
    ///
    /// Returns the new ID, or `None` when the text was blank.
    pub fn add(&mut self, draft: &TaskDraft) -> Option<TaskId> {
        draft.accepted_text()?;

        let _ = self.notifier.request_permission();
        let id = self.fresh_id();
        let next = task_ops::add_task(&self.tasks, draft, id);
        self.commit("add", next);
        Some(id)
    }

    pub fn delete(&mut self, id: TaskId) {
        if !task_ops::contains(&self.tasks, id) {
            return;
        }
        let next = task_ops::delete_task(&self.tasks, id);
        self.expanded_notes.remove(&id);
        self.commit("delete", next);
    }

    /// Flips completion; completing a recurring task appends its next occurrence.
    pub fn toggle_completed(&mut self, id: TaskId) {
        if !task_ops::contains(&self.tasks, id) {
            return;
        }
        let now = self.clock.now();
        let spawned_id = self.fresh_id();
        let next = task_ops::toggle_completed(&self.tasks, id, now, || spawned_id);
        self.commit("toggle_completed", next);
    }

    pub fn start_editing(&mut self, id: TaskId) {
        if !task_ops::contains(&self.tasks, id) {
            return;
        }
        let next = task_ops::start_editing(&self.tasks, id);
        self.commit("start_editing", next);
    }

    pub fn save_edit(&mut self, id: TaskId, text: &str, notes: Option<&str>) {
        if !task_ops::contains(&self.tasks, id) {
            return;
        }
        let next = task_ops::save_edit(&self.tasks, id, text, notes);
        self.commit("save_edit", next);
    }

    pub fn save_notes(&mut self, id: TaskId, notes: &str) {
        if !task_ops::contains(&self.tasks, id) {
            return;
        }
        let next = task_ops::save_notes(&self.tasks, id, notes);
        self.commit("save_notes", next);
    }

    pub fn reorder(&mut self, source: usize, destination: Option<usize>) {
        if destination.is_none() || source >= self.tasks.len() {
            return;
        }
        let next = task_ops::reorder(&self.tasks, source, destination);
        self.commit("reorder", next);
    }

    pub fn filter_by_category(&self, filter: &CategoryFilter) -> Vec<&Task> {
        task_ops::filter_by_category(&self.tasks, filter)
    }

    /// Opens or closes the notes panel for a task. Not persisted.
    ///
    /// Returns whether the panel is open afterwards.
    pub fn toggle_notes_expanded(&mut self, id: TaskId) -> bool {
        if !task_ops::contains(&self.tasks, id) {
            return false;
        }
        if self.expanded_notes.remove(&id) {
            false
        } else {
            self.expanded_notes.insert(id)
        }
    }

    pub fn is_notes_expanded(&self, id: TaskId) -> bool {
        self.expanded_notes.contains(&id)
    }

    fn fresh_id(&self) -> TaskId {
        loop {
            let id = Uuid::new_v4();
            if !task_ops::contains(&self.tasks, id) {
                return id;
            }
        }
    }

    fn commit(&mut self, op: &'static str, next: Vec<Task>) {
        if next == self.tasks {
            debug!("event=task_{op} module=service status=noop");
            return;
        }

        self.tasks = next;
        if self.load_pending && !self.recover_stored() {
            self.snapshot.store(Arc::new(self.tasks.clone()));
            warn!(
                "event=task_{op} module=service status=degraded error_code=save_deferred count={}",
                self.tasks.len()
            );
            return;
        }
        self.snapshot.store(Arc::new(self.tasks.clone()));

        match self.repo.save(&self.tasks) {
            Ok(()) => {
                self.storage_status = StorageStatus::Healthy;
                debug!(
                    "event=task_{op} module=service status=ok count={}",
                    self.tasks.len()
                );
            }
            Err(err) => {
                warn!(
                    "event=task_{op} module=service status=degraded error_code=save_failed error={err}"
                );
                self.storage_status = StorageStatus::Degraded(err.to_string());
            }
        }
    }

    /// Retries the load that failed at open.
    ///
    /// On success the stored tasks go first, followed by session tasks whose
    /// IDs are not stored, and saving resumes.
    fn recover_stored(&mut self) -> bool {
        match self.repo.load() {
            Ok(stored) => {
                let known = stored.iter().map(|task| task.id).collect::<HashSet<_>>();
                let created = self.tasks.iter().filter(|task| !known.contains(&task.id));
                let merged = stored.iter().chain(created).cloned().collect::<Vec<_>>();
                info!(
                    "event=manager_recover module=service status=ok stored={} session={}",
                    stored.len(),
                    self.tasks.len()
                );
                self.tasks = merged;
                self.load_pending = false;
                true
            }
            Err(err) => {
                self.storage_status = StorageStatus::Degraded(err.to_string());
                false
            }
        }
    }
}
