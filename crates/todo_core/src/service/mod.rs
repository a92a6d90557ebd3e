//! Core use-case services.
//!
//! # Responsibility
//! - Implement task collection operations as pure functions.
//! - Wrap them in a stateful manager that persists and publishes results.
//! - Scan the published state for due reminders.

pub mod recurrence;
pub mod reminder;
pub mod task_manager;
pub mod task_ops;
