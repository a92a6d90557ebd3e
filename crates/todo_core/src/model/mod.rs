//! Task domain model.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep one record shape for list, edit and reminder projections.
//!
//! # Invariants
//! - Every task is identified by a stable `TaskId`.
//! - Removal is a hard delete; there are no tombstones.

pub mod category;
pub mod task;
