//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the key-value storage contract and its SQLite/in-memory backends.
//! - Encode the task collection for that storage.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`PayloadTooLarge`,
//!   `QuotaExceeded`) in addition to DB transport errors.

pub mod kv_store;
pub mod task_repo;
