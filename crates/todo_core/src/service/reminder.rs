//! Periodic reminder scanning.
//!
//! # Responsibility
//! - Read the latest task snapshot on a fixed interval and fire one alert per
//!   due reminder.
//! - Stop and join the background thread when the owner goes away.
//!
//! # Invariants
//! - The scanner never mutates the task collection.
//! - A reminder fires once per `(task id, reminder instant)`; editing the
//!   reminder re-arms it. Delivery state is in-memory only.
//! - Dropping the scanner cancels the timer.

use crate::clock::Clock;
use crate::notify::{reminder_title, Notifier, REMINDER_BODY};
use crate::service::task_manager::TaskSnapshot;
use crate::service::task_ops::{scan_reminders, ReminderKey};
use log::{debug, error, info};
use std::collections::HashSet;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

const THREAD_NAME: &str = "todo-reminders";

/// Scan state shared between the timer thread and synchronous callers.
struct ScanState {
    snapshot: TaskSnapshot,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    delivered: Mutex<HashSet<ReminderKey>>,
}

impl ScanState {
    fn scan(&self) -> usize {
        let tasks = self.snapshot.load_full();
        let now = self.clock.now();
        let mut delivered = self
            .delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        delivered.retain(|(id, reminder)| {
            tasks
                .iter()
                .any(|task| task.id == *id && task.reminder == Some(*reminder))
        });

        let due = scan_reminders(&tasks, now, &delivered);
        for task in &due {
            self.notifier.notify(&reminder_title(&task.text), REMINDER_BODY);
        }
        let fired = due.len();
        let keys = due
            .iter()
            .filter_map(|task| task.reminder.map(|reminder| (task.id, reminder)))
            .collect::<Vec<_>>();
        delivered.extend(keys);

        if fired > 0 {
            info!("event=reminder_scan module=reminder status=ok fired={fired}");
        }
        fired
    }
}

/// Background reminder timer bound to one task snapshot.
pub struct ReminderScanner {
    state: Arc<ScanState>,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ReminderScanner {
    /// Creates a scanner without a timer; scans run only through [`Self::scan_now`].
    pub fn manual(
        snapshot: TaskSnapshot,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            state: Arc::new(ScanState {
                snapshot,
                notifier,
                clock,
                delivered: Mutex::new(HashSet::new()),
            }),
            stop_tx: None,
            handle: None,
        }
    }

    /// Starts a timer thread scanning every `interval`.
    ///
    /// Falls back to a manual scanner (logged) when the thread cannot start.
    pub fn spawn(
        snapshot: TaskSnapshot,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        let mut scanner = Self::manual(snapshot, notifier, clock);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let state = Arc::clone(&scanner.state);

        let spawned = std::thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        state.scan();
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            });

        match spawned {
            Ok(handle) => {
                info!(
                    "event=reminder_timer module=reminder status=start interval_ms={}",
                    interval.as_millis()
                );
                scanner.stop_tx = Some(stop_tx);
                scanner.handle = Some(handle);
            }
            Err(err) => {
                error!(
                    "event=reminder_timer module=reminder status=error error_code=spawn_failed error={err}"
                );
            }
        }
        scanner
    }

    /// Runs one scan immediately and returns how many alerts fired.
    pub fn scan_now(&self) -> usize {
        self.state.scan()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stops the timer thread and waits for it to exit. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("event=reminder_timer module=reminder status=error error_code=join_failed");
            } else {
                debug!("event=reminder_timer module=reminder status=stopped");
            }
        }
    }
}

impl Drop for ReminderScanner {
    fn drop(&mut self) {
        self.shutdown();
    }
}
