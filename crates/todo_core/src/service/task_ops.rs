//! Pure task collection operations.
//!
//! # Responsibility
//! - Implement every mutation as `(current collection, args) -> new collection`.
//! - Provide read-side projections (category filter, due reminders).
//!
//! # Invariants
//! - Input slices are never mutated; callers swap in the returned collection.
//! - Unknown IDs leave the collection unchanged.
//! - After `start_editing`, at most one task has `is_editing = true`.
//! - Only `delete_task` removes tasks; `toggle_completed` may append one.

use crate::model::category::CategoryFilter;
use crate::model::task::{Task, TaskDraft, TaskId};
use crate::service::recurrence::next_occurrence;
use chrono::{DateTime, Utc};
use log::warn;
use std::collections::HashSet;

/// Identity of one reminder instant; changing a task's reminder yields a new key.
pub type ReminderKey = (TaskId, DateTime<Utc>);

/// Appends a task built from `draft` under `id`.
///
/// Blank text is a silent no-op: the collection is returned unchanged.
pub fn add_task(tasks: &[Task], draft: &TaskDraft, id: TaskId) -> Vec<Task> {
    let mut next = tasks.to_vec();
    if let Some(task) = draft.build(id) {
        next.push(task);
    }
    next
}

pub fn delete_task(tasks: &[Task], id: TaskId) -> Vec<Task> {
    tasks.iter().filter(|task| task.id != id).cloned().collect()
}

/// Flips `completed` on the matching task.
///
/// When the flip completes a recurring task, its next occurrence is appended
/// to the end of the collection. `next_id` is only called in that case.
pub fn toggle_completed(
    tasks: &[Task],
    id: TaskId,
    now: DateTime<Utc>,
    next_id: impl FnOnce() -> TaskId,
) -> Vec<Task> {
    let mut next = tasks.to_vec();
    let Some(task) = next.iter_mut().find(|task| task.id == id) else {
        return next;
    };

    task.completed = !task.completed;
    if !task.completed || !task.is_recurring() {
        return next;
    }

    let completed = task.clone();
    match next_occurrence(&completed, now, next_id()) {
        Some(spawned) => next.push(spawned),
        None => warn!(
            "event=task_recur module=service status=error error_code=date_out_of_range"
        ),
    }
    next
}

/// Puts the matching task in edit mode and takes every other task out of it.
///
/// An unknown ID leaves the collection unchanged.
pub fn start_editing(tasks: &[Task], id: TaskId) -> Vec<Task> {
    if !contains(tasks, id) {
        return tasks.to_vec();
    }
    tasks
        .iter()
        .map(|task| Task {
            is_editing: task.id == id,
            ..task.clone()
        })
        .collect()
}

/// Stores edited text (and notes, when given) and leaves edit mode.
///
/// Text is stored as-is: unlike `add_task`, blank text is accepted.
pub fn save_edit(tasks: &[Task], id: TaskId, text: &str, notes: Option<&str>) -> Vec<Task> {
    update_one(tasks, id, |task| {
        task.text = text.to_string();
        if let Some(notes) = notes {
            task.notes = Some(notes.to_string());
        }
        task.is_editing = false;
    })
}

pub fn save_notes(tasks: &[Task], id: TaskId, notes: &str) -> Vec<Task> {
    update_one(tasks, id, |task| task.notes = Some(notes.to_string()))
}

/// Moves the task at `source` so it ends up at `destination`.
///
/// A missing destination (cancelled drag) or out-of-range source is a no-op.
/// Destinations past the end are clamped to the last slot.
pub fn reorder(tasks: &[Task], source: usize, destination: Option<usize>) -> Vec<Task> {
    let mut next = tasks.to_vec();
    let Some(destination) = destination else {
        return next;
    };
    if source >= next.len() {
        return next;
    }

    let moved = next.remove(source);
    let destination = destination.min(next.len());
    next.insert(destination, moved);
    next
}

/// Returns tasks matching `filter` in collection order.
pub fn filter_by_category<'a>(tasks: &'a [Task], filter: &CategoryFilter) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|task| filter.matches(task.category.as_deref()))
        .collect()
}

/// Returns tasks whose reminder is strictly before `now` and not yet delivered.
pub fn scan_reminders<'a>(
    tasks: &'a [Task],
    now: DateTime<Utc>,
    delivered: &HashSet<ReminderKey>,
) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|task| match task.reminder {
            Some(reminder) => reminder < now && !delivered.contains(&(task.id, reminder)),
            None => false,
        })
        .collect()
}

/// Returns whether `tasks` holds a task with `id`.
pub fn contains(tasks: &[Task], id: TaskId) -> bool {
    tasks.iter().any(|task| task.id == id)
}

fn update_one(tasks: &[Task], id: TaskId, apply: impl FnOnce(&mut Task)) -> Vec<Task> {
    let mut next = tasks.to_vec();
    if let Some(task) = next.iter_mut().find(|task| task.id == id) {
        apply(task);
    }
    next
}
