//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical to-do record shared by every view projection.
//! - Parse raw form input (tags, category) into explicit optional fields.
//!
//! # Invariants
//! - `id` is stable and never reused for another task.
//! - Optional fields carry explicit presence; absent values are `None`, never
//!   empty strings or empty tag lists.
//! - `is_editing` is transient UI state; the single-editor rule is enforced by
//!   the task operations, not by this type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Stable identifier for every task in a collection.
pub type TaskId = Uuid;

/// Task urgency shown as a badge by the view layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// Rule that spawns a follow-up task when a task is completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
    Weekly,
    Monthly,
}

/// Error returned when parsing an enum label from external input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub value: String,
}

impl Display for UnknownLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown {} `{}`", self.kind, self.value)
    }
}

impl std::error::Error for UnknownLabel {}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = UnknownLabel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(UnknownLabel {
                kind: "priority",
                value: other.to_string(),
            }),
        }
    }
}

impl Recurrence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl FromStr for Recurrence {
    type Err = UnknownLabel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(UnknownLabel {
                kind: "recurrence",
                value: other.to_string(),
            }),
        }
    }
}

/// Canonical to-do record.
///
/// Serialized with camelCase names so the persisted JSON array keeps the
/// `dueDate` / `isEditing` layout used by stored data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_editing: bool,
}

impl Task {
    /// Creates an incomplete task with default priority and no optional fields.
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), text)
    }

    /// Creates a task with a caller-provided stable ID.
    pub fn with_id(id: TaskId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            completed: false,
            priority: Priority::default(),
            due_date: None,
            reminder: None,
            category: None,
            tags: None,
            recurrence: None,
            notes: None,
            is_editing: false,
        }
    }

    /// Returns whether completing this task spawns a follow-up.
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }
}

/// Form input for creating a task.
///
/// `tags` is the raw comma-separated string typed by the user; it is split
/// when the task is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub text: String,
    pub due_date: Option<DateTime<Utc>>,
    pub reminder: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub category: Option<String>,
    pub tags: Option<String>,
    pub recurrence: Option<Recurrence>,
}

impl TaskDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Returns the trimmed text when it is acceptable for a new task.
    pub fn accepted_text(&self) -> Option<&str> {
        let trimmed = self.text.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Builds the task record for this draft under the given ID.
    ///
    /// Returns `None` when the text trims to empty.
    pub fn build(&self, id: TaskId) -> Option<Task> {
        let text = self.accepted_text()?;
        let mut task = Task::with_id(id, text);
        task.due_date = self.due_date;
        task.reminder = self.reminder;
        task.priority = self.priority;
        task.category = normalize_category(self.category.as_deref());
        task.tags = self.tags.as_deref().and_then(parse_tags);
        task.recurrence = self.recurrence;
        Some(task)
    }
}

/// Splits comma-separated tag input into its trimmed segments.
///
/// Every segment is kept, blank ones included, so `"a,,b"` yields
/// `["a", "", "b"]`. Only empty input means "no tags".
pub fn parse_tags(raw: &str) -> Option<Vec<String>> {
    if raw.is_empty() {
        return None;
    }
    Some(raw.split(',').map(|tag| tag.trim().to_string()).collect())
}

/// Keeps category text verbatim; only empty input means "no category".
pub fn normalize_category(raw: Option<&str>) -> Option<String> {
    raw.filter(|value| !value.is_empty()).map(str::to_string)
}

fn is_false(value: &bool) -> bool {
    !*value
}
