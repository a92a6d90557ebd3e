//! Notification adapter.
//!
//! # Responsibility
//! - Define the permission-gated alert boundary used for reminders.
//! - Provide a log-backed implementation for hosts without a native
//!   notification surface.
//!
//! # Invariants
//! - Neither call fails observably; callers never branch on delivery.

use log::{debug, info};

/// Title prefix for reminder alerts.
pub const REMINDER_TITLE_PREFIX: &str = "Reminder: ";
/// Body text for reminder alerts.
pub const REMINDER_BODY: &str = "Task due soon!";

/// Host notification permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    /// The user has not answered yet.
    Default,
    Granted,
    Denied,
}

/// Alert boundary consumed by the task manager and reminder scanner.
pub trait Notifier: Send + Sync {
    /// Asks for permission to show alerts. Idempotent and best-effort.
    fn request_permission(&self) -> PermissionState;

    /// Shows one alert. Fire-and-forget.
    fn notify(&self, title: &str, body: &str);
}

/// Builds the alert title for a task reminder.
pub fn reminder_title(task_text: &str) -> String {
    format!("{REMINDER_TITLE_PREFIX}{task_text}")
}

/// Notifier that writes alerts to the core log.
#[derive(Debug, Clone, Copy)]
pub struct LogNotifier {
    permission: PermissionState,
}

impl LogNotifier {
    pub fn new(permission: PermissionState) -> Self {
        Self { permission }
    }

    pub fn granted() -> Self {
        Self::new(PermissionState::Granted)
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::granted()
    }
}

impl Notifier for LogNotifier {
    fn request_permission(&self) -> PermissionState {
        debug!(
            "event=notify_permission module=notify status=ok state={:?}",
            self.permission
        );
        self.permission
    }

    fn notify(&self, title: &str, body: &str) {
        if self.permission != PermissionState::Granted {
            debug!("event=notify module=notify status=skipped reason=permission");
            return;
        }
        info!(
            "event=notify module=notify status=ok title_chars={} body_chars={}",
            title.chars().count(),
            body.chars().count()
        );
    }
}
