//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `todo_core` linkage.
//! - Boot an in-memory session, exercise one recurring completion and one
//!   reminder scan, and print deterministic counts.

use std::sync::Arc;
use todo_core::db::open_db_in_memory;
use todo_core::{
    KvTaskRepository, LogNotifier, Recurrence, ReminderScanner, SqliteKeyValueStore, SystemClock,
    TaskDraft, TaskManager,
};

fn main() {
    println!("todo_core ping={}", todo_core::ping());
    println!("todo_core version={}", todo_core::core_version());

    let conn = match open_db_in_memory() {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("todo_core db_open failed: {err}");
            std::process::exit(1);
        }
    };

    let notifier = Arc::new(LogNotifier::granted());
    let clock = Arc::new(SystemClock);
    let mut manager = TaskManager::open(
        KvTaskRepository::new(SqliteKeyValueStore::new(conn)),
        notifier.clone(),
        clock.clone(),
    );

    let added = manager.add(&TaskDraft {
        recurrence: Some(Recurrence::Daily),
        ..TaskDraft::new("smoke check")
    });
    if let Some(id) = added {
        manager.toggle_completed(id);
    }

    let scanner = ReminderScanner::manual(manager.snapshot(), notifier, clock);
    println!("todo_core tasks={}", manager.tasks().len());
    println!("todo_core reminders_fired={}", scanner.scan_now());
}
