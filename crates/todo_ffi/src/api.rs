//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the task manager operations to Dart via FRB.
//! - Own the single session (manager + reminder timer) with an explicit
//!   open/close lifecycle.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Timestamps cross the boundary as epoch milliseconds, enums as lowercase
//!   labels.
//! - Closing or reopening a session stops its reminder timer.

use chrono::{DateTime, Utc};
use log::info;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use todo_core::db::open_db;
use todo_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, is_logging_active,
    parse_log_level, ping as ping_inner, CategoryFilter, KvTaskRepository, LogNotifier, Priority,
    Recurrence, ReminderScanner, SqliteKeyValueStore, StorageStatus, SystemClock, Task, TaskDraft,
    TaskId, TaskManager, TodoConfig, PRESET_CATEGORIES,
};
use uuid::Uuid;

type SessionManager = TaskManager<KvTaskRepository<SqliteKeyValueStore>>;

struct TodoSession {
    manager: SessionManager,
    // Held for its lifetime; dropping it stops the timer.
    _scanner: ReminderScanner,
}

static SESSION: Mutex<Option<TodoSession>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Starts the core log sink once per process.
///
/// Blank arguments fall back to `TODO_LOG_LEVEL` / `TODO_LOG_DIR` and then
/// to the build defaults.
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same settings (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    let mut config = TodoConfig::from_env();
    let level = level.trim();
    if !level.is_empty() {
        match parse_log_level(level) {
            Some(parsed) => config.log_level = parsed,
            None => return format!("unsupported log level `{level}`"),
        }
    }
    let log_dir = log_dir.trim();
    if !log_dir.is_empty() {
        config.log_dir = log_dir.into();
    }

    match init_logging_inner(&config) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Categories offered by the task form's picker, in display order.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_preset_categories() -> Vec<String> {
    PRESET_CATEGORIES
        .iter()
        .map(|category| category.to_string())
        .collect()
}

/// One task as rendered by the list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub id: String,
    pub text: String,
    pub completed: bool,
    /// `low|medium|high`.
    pub priority: String,
    pub due_date_ms: Option<i64>,
    pub reminder_ms: Option<i64>,
    pub category: Option<String>,
    /// Empty when the task has no tags.
    pub tags: Vec<String>,
    /// `daily|weekly|monthly`.
    pub recurrence: Option<String>,
    pub notes: Option<String>,
    pub is_editing: bool,
    /// Whether the notes panel is open. View state only.
    pub notes_expanded: bool,
}

/// List response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListResponse {
    pub ok: bool,
    pub items: Vec<TaskItem>,
    /// `false` when the last load/save failed; tasks are still usable.
    pub storage_ok: bool,
    pub message: String,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoActionResponse {
    pub ok: bool,
    /// Created task ID for `todo_add`.
    pub task_id: Option<String>,
    pub message: String,
}

impl TodoActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            task_id: None,
            message: message.into(),
        }
    }

    fn created(task_id: TaskId) -> Self {
        Self {
            ok: true,
            task_id: Some(task_id.to_string()),
            message: "Task added.".to_string(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            task_id: None,
            message: message.into(),
        }
    }
}

/// Opens the task session backed by the SQLite file at `db_path`.
///
/// A blank `db_path` falls back to `TODO_DB_PATH` or the temp directory.
/// Reopening replaces the current session.
///
/// # FFI contract
/// - Sync call; performs DB bootstrap and one load.
/// - Starts the log sink from `TODO_LOG_*` settings unless [`init_logging`]
///   already did. A sink failure is reported in `message`, not as `ok=false`.
/// - Starts the reminder timer.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_session_open(db_path: String) -> TodoActionResponse {
    let mut config = TodoConfig::from_env();
    let trimmed = db_path.trim();
    if !trimmed.is_empty() {
        config.db_path = trimmed.into();
    }

    let logging_note = if is_logging_active() {
        String::new()
    } else {
        match init_logging_inner(&config) {
            Ok(()) => String::new(),
            Err(err) => format!(" Logging unavailable: {err}"),
        }
    };

    let conn = match open_db(&config.db_path) {
        Ok(conn) => conn,
        Err(err) => {
            return TodoActionResponse::failure(format!("todo_session_open failed: {err}"))
        }
    };

    let notifier = Arc::new(LogNotifier::granted());
    let clock = Arc::new(SystemClock);
    let repo = KvTaskRepository::with_config(SqliteKeyValueStore::new(conn), &config);
    let manager = TaskManager::open(repo, notifier.clone(), clock.clone());
    let scanner =
        ReminderScanner::spawn(manager.snapshot(), notifier, clock, config.reminder_interval);
    let count = manager.tasks().len();

    let previous = lock_session().replace(TodoSession {
        manager,
        _scanner: scanner,
    });
    drop(previous);

    info!("event=session_open module=ffi status=ok count={count}");
    TodoActionResponse::success(format!("Session opened with {count} task(s).{logging_note}"))
}

/// Closes the session and stops its reminder timer. Idempotent.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_session_close() -> TodoActionResponse {
    let closed = lock_session().take();
    match closed {
        Some(session) => {
            drop(session);
            info!("event=session_close module=ffi status=ok");
            TodoActionResponse::success("Session closed.")
        }
        None => TodoActionResponse::success("No session open."),
    }
}

/// Lists tasks in collection order, filtered by category.
///
/// `category == "all"` returns every task; any other value is an exact match.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_list(category: String) -> TaskListResponse {
    let filter = CategoryFilter::parse(category.as_str());
    let listed = with_session(|session| {
        let manager = &session.manager;
        let items = manager
            .filter_by_category(&filter)
            .into_iter()
            .map(|task| to_task_item(task, manager.is_notes_expanded(task.id)))
            .collect::<Vec<_>>();
        let storage_ok = matches!(manager.storage_status(), StorageStatus::Healthy);
        (items, storage_ok)
    });

    match listed {
        Ok((items, storage_ok)) => TaskListResponse {
            ok: true,
            message: format!("{} task(s).", items.len()),
            items,
            storage_ok,
        },
        Err(message) => TaskListResponse {
            ok: false,
            items: Vec::new(),
            storage_ok: false,
            message,
        },
    }
}

/// Adds a task from form input.
///
/// Blank text is not an error: the response is `ok` without a `task_id`.
#[allow(clippy::too_many_arguments)]
#[flutter_rust_bridge::frb(sync)]
pub fn todo_add(
    text: String,
    due_date_ms: Option<i64>,
    reminder_ms: Option<i64>,
    priority: Option<String>,
    category: Option<String>,
    tags: Option<String>,
    recurrence: Option<String>,
) -> TodoActionResponse {
    let draft = match build_draft(
        text,
        due_date_ms,
        reminder_ms,
        priority,
        category,
        tags,
        recurrence,
    ) {
        Ok(draft) => draft,
        Err(message) => return TodoActionResponse::failure(format!("todo_add failed: {message}")),
    };

    match with_session(|session| session.manager.add(&draft)) {
        Ok(Some(task_id)) => TodoActionResponse::created(task_id),
        Ok(None) => TodoActionResponse::success("Nothing to add."),
        Err(message) => TodoActionResponse::failure(message),
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn todo_delete(task_id: String) -> TodoActionResponse {
    with_task("todo_delete", &task_id, |manager, id| manager.delete(id))
}

/// Flips completion; completing a recurring task adds its next occurrence.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_toggle_completed(task_id: String) -> TodoActionResponse {
    with_task("todo_toggle_completed", &task_id, |manager, id| {
        manager.toggle_completed(id)
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn todo_start_editing(task_id: String) -> TodoActionResponse {
    with_task("todo_start_editing", &task_id, |manager, id| {
        manager.start_editing(id)
    })
}

/// Saves edited text and, when given, notes. Text is stored untrimmed.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_save_edit(task_id: String, text: String, notes: Option<String>) -> TodoActionResponse {
    with_task("todo_save_edit", &task_id, |manager, id| {
        manager.save_edit(id, &text, notes.as_deref())
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn todo_save_notes(task_id: String, notes: String) -> TodoActionResponse {
    with_task("todo_save_notes", &task_id, |manager, id| {
        manager.save_notes(id, &notes)
    })
}

/// Opens or closes the notes panel of a task.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_toggle_notes(task_id: String) -> TodoActionResponse {
    let id = match parse_task_id(&task_id) {
        Ok(id) => id,
        Err(message) => {
            return TodoActionResponse::failure(format!("todo_toggle_notes failed: {message}"))
        }
    };
    match with_session(|session| session.manager.toggle_notes_expanded(id)) {
        Ok(true) => TodoActionResponse::success("Notes expanded."),
        Ok(false) => TodoActionResponse::success("Notes collapsed."),
        Err(message) => TodoActionResponse::failure(message),
    }
}

/// Moves a task between list positions. `destination = None` cancels.
#[flutter_rust_bridge::frb(sync)]
pub fn todo_reorder(source: u32, destination: Option<u32>) -> TodoActionResponse {
    let moved = with_session(|session| {
        session
            .manager
            .reorder(source as usize, destination.map(|value| value as usize))
    });
    match moved {
        Ok(()) => TodoActionResponse::success("OK."),
        Err(message) => TodoActionResponse::failure(message),
    }
}

fn lock_session() -> MutexGuard<'static, Option<TodoSession>> {
    SESSION.lock().unwrap_or_else(PoisonError::into_inner)
}

fn with_session<T>(f: impl FnOnce(&mut TodoSession) -> T) -> Result<T, String> {
    let mut guard = lock_session();
    match guard.as_mut() {
        Some(session) => Ok(f(session)),
        None => Err("no todo session open; call todo_session_open first".to_string()),
    }
}

fn with_task(
    op: &str,
    task_id: &str,
    f: impl FnOnce(&mut SessionManager, TaskId),
) -> TodoActionResponse {
    let id = match parse_task_id(task_id) {
        Ok(id) => id,
        Err(message) => return TodoActionResponse::failure(format!("{op} failed: {message}")),
    };
    match with_session(|session| f(&mut session.manager, id)) {
        Ok(()) => TodoActionResponse::success("OK."),
        Err(message) => TodoActionResponse::failure(message),
    }
}

fn parse_task_id(raw: &str) -> Result<TaskId, String> {
    Uuid::parse_str(raw.trim()).map_err(|_| format!("invalid task id `{raw}`"))
}

fn build_draft(
    text: String,
    due_date_ms: Option<i64>,
    reminder_ms: Option<i64>,
    priority: Option<String>,
    category: Option<String>,
    tags: Option<String>,
    recurrence: Option<String>,
) -> Result<TaskDraft, String> {
    let priority = match priority.as_deref().map(str::trim) {
        None | Some("") => Priority::default(),
        Some(label) => label.parse::<Priority>().map_err(|err| err.to_string())?,
    };
    let recurrence = match recurrence.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(label) => Some(label.parse::<Recurrence>().map_err(|err| err.to_string())?),
    };

    Ok(TaskDraft {
        text,
        due_date: from_epoch_ms(due_date_ms, "due_date_ms")?,
        reminder: from_epoch_ms(reminder_ms, "reminder_ms")?,
        priority,
        category,
        tags,
        recurrence,
    })
}

fn from_epoch_ms(value: Option<i64>, field: &str) -> Result<Option<DateTime<Utc>>, String> {
    match value {
        None => Ok(None),
        Some(ms) => DateTime::<Utc>::from_timestamp_millis(ms)
            .map(Some)
            .ok_or_else(|| format!("{field} out of range: {ms}")),
    }
}

fn to_task_item(task: &Task, notes_expanded: bool) -> TaskItem {
    TaskItem {
        id: task.id.to_string(),
        text: task.text.clone(),
        completed: task.completed,
        priority: task.priority.as_str().to_string(),
        due_date_ms: task.due_date.map(|value| value.timestamp_millis()),
        reminder_ms: task.reminder.map(|value| value.timestamp_millis()),
        category: task.category.clone(),
        tags: task.tags.clone().unwrap_or_default(),
        recurrence: task.recurrence.map(|value| value.as_str().to_string()),
        notes: task.notes.clone(),
        is_editing: task.is_editing,
        notes_expanded,
    }
}
