use chrono::{Duration, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use todo_core::db::open_db_in_memory;
use todo_core::{
    CategoryFilter, FixedClock, KeyValueStore, KvTaskRepository, MemoryKeyValueStore, Notifier,
    PermissionState, Recurrence, RepoError, RepoResult, SqliteKeyValueStore, StorageStatus,
    StoreError, Task, TaskDraft, TaskManager, TaskRepository, TodoConfig,
};

#[derive(Default)]
struct CountingNotifier {
    permission_requests: AtomicUsize,
    alerts: Mutex<Vec<String>>,
}

impl Notifier for CountingNotifier {
    fn request_permission(&self) -> PermissionState {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        PermissionState::Denied
    }

    fn notify(&self, title: &str, _body: &str) {
        self.alerts.lock().unwrap().push(title.to_string());
    }
}

/// Repository whose writes always fail.
struct BrokenRepo {
    saves: usize,
}

impl TaskRepository for BrokenRepo {
    fn load(&mut self) -> RepoResult<Vec<Task>> {
        Ok(Vec::new())
    }

    fn save(&mut self, _tasks: &[Task]) -> RepoResult<()> {
        self.saves += 1;
        Err(RepoError::PayloadTooLarge { size: 2, limit: 1 })
    }
}

/// Repository over a real store whose first `failing_loads` reads fail.
struct FlakyLoadRepo {
    inner: KvTaskRepository<MemoryKeyValueStore>,
    failing_loads: usize,
    saves: usize,
}

impl TaskRepository for FlakyLoadRepo {
    fn load(&mut self) -> RepoResult<Vec<Task>> {
        if self.failing_loads > 0 {
            self.failing_loads -= 1;
            return Err(RepoError::Store(StoreError::QuotaExceeded {
                requested: 0,
                quota: 0,
            }));
        }
        self.inner.load()
    }

    fn save(&mut self, tasks: &[Task]) -> RepoResult<()> {
        self.saves += 1;
        self.inner.save(tasks)
    }
}

fn flaky_repo_with(stored: &[Task], failing_loads: usize) -> FlakyLoadRepo {
    let mut inner = KvTaskRepository::new(MemoryKeyValueStore::new());
    inner.save(stored).unwrap();
    FlakyLoadRepo {
        inner,
        failing_loads,
        saves: 0,
    }
}

fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap(),
    ))
}

fn memory_manager() -> (TaskManager<KvTaskRepository<MemoryKeyValueStore>>, Arc<CountingNotifier>) {
    let notifier = Arc::new(CountingNotifier::default());
    let manager = TaskManager::open(
        KvTaskRepository::new(MemoryKeyValueStore::new()),
        notifier.clone(),
        fixed_clock(),
    );
    (manager, notifier)
}

#[test]
fn open_requests_permission_and_add_requests_again() {
    let (mut manager, notifier) = memory_manager();
    assert_eq!(notifier.permission_requests.load(Ordering::SeqCst), 1);

    manager.add(&TaskDraft::new("first")).unwrap();
    assert_eq!(notifier.permission_requests.load(Ordering::SeqCst), 2);

    assert!(manager.add(&TaskDraft::new("  ")).is_none());
    assert_eq!(notifier.permission_requests.load(Ordering::SeqCst), 2);
    assert_eq!(manager.tasks().len(), 1);
}

#[test]
fn every_mutation_is_persisted() {
    let (mut manager, _) = memory_manager();
    let first = manager.add(&TaskDraft::new("first")).unwrap();
    let second = manager.add(&TaskDraft::new("second")).unwrap();
    manager.toggle_completed(first);
    manager.save_notes(second, "note");
    manager.reorder(0, Some(1));

    let mut reloaded = KvTaskRepository::new(manager.repository().store().clone());
    assert_eq!(reloaded.load().unwrap(), manager.tasks());
}

#[test]
fn manager_reloads_state_from_sqlite() {
    let conn = open_db_in_memory().unwrap();
    let mut store = SqliteKeyValueStore::new(conn);
    let seeded = vec![Task::new("seeded")];
    store
        .set("tasks_v1", &serde_json::to_vec(&seeded).unwrap())
        .unwrap();

    let manager = TaskManager::open(
        KvTaskRepository::with_config(store, &TodoConfig::default()),
        Arc::new(CountingNotifier::default()),
        fixed_clock(),
    );
    assert_eq!(manager.tasks(), seeded.as_slice());
    assert_eq!(manager.storage_status(), &StorageStatus::Healthy);
}

#[test]
fn completing_recurring_task_appends_next_occurrence() {
    let (mut manager, _) = memory_manager();
    let due = Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap();
    let id = manager
        .add(&TaskDraft {
            recurrence: Some(Recurrence::Weekly),
            due_date: Some(due),
            reminder: Some(due - Duration::hours(1)),
            ..TaskDraft::new("team sync")
        })
        .unwrap();

    manager.toggle_completed(id);

    let tasks = manager.tasks();
    assert_eq!(tasks.len(), 2);
    assert!(tasks[0].completed);
    assert!(!tasks[1].completed);
    assert_ne!(tasks[1].id, id);
    assert_eq!(tasks[1].due_date, Some(due + Duration::days(7)));
    assert_eq!(
        tasks[1].reminder,
        Some(due + Duration::days(7) - Duration::hours(1))
    );
}

#[test]
fn recurring_without_due_date_uses_clock() {
    let (mut manager, _) = memory_manager();
    let id = manager
        .add(&TaskDraft {
            recurrence: Some(Recurrence::Daily),
            ..TaskDraft::new("journal")
        })
        .unwrap();

    manager.toggle_completed(id);
    assert_eq!(
        manager.tasks()[1].due_date,
        Some(Utc.with_ymd_and_hms(2024, 6, 2, 9, 0, 0).unwrap())
    );
}

#[test]
fn ids_stay_unique_across_adds_and_spawns() {
    let (mut manager, _) = memory_manager();
    for index in 0..20 {
        let id = manager
            .add(&TaskDraft {
                recurrence: Some(Recurrence::Daily),
                ..TaskDraft::new(format!("habit {index}"))
            })
            .unwrap();
        manager.toggle_completed(id);
    }

    let ids = manager
        .tasks()
        .iter()
        .map(|task| task.id)
        .collect::<HashSet<_>>();
    assert_eq!(manager.tasks().len(), 40);
    assert_eq!(ids.len(), 40);
}

#[test]
fn single_editor_is_enforced() {
    let (mut manager, _) = memory_manager();
    let a = manager.add(&TaskDraft::new("a")).unwrap();
    let b = manager.add(&TaskDraft::new("b")).unwrap();

    manager.start_editing(a);
    manager.start_editing(b);
    let editors = manager
        .tasks()
        .iter()
        .filter(|task| task.is_editing)
        .map(|task| task.id)
        .collect::<Vec<_>>();
    assert_eq!(editors, vec![b]);

    manager.save_edit(b, "b edited", None);
    assert!(manager.tasks().iter().all(|task| !task.is_editing));
    assert_eq!(manager.get(b).unwrap().text, "b edited");
}

#[test]
fn delete_unknown_id_is_noop_and_known_id_is_removed() {
    let (mut manager, _) = memory_manager();
    let keep = manager.add(&TaskDraft::new("keep")).unwrap();
    let drop_id = manager.add(&TaskDraft::new("drop")).unwrap();
    let before = manager.tasks().to_vec();

    manager.delete(uuid::Uuid::new_v4());
    assert_eq!(manager.tasks(), before.as_slice());

    manager.delete(drop_id);
    assert!(manager.get(drop_id).is_none());
    assert!(manager.get(keep).is_some());
}

#[test]
fn snapshot_tracks_latest_collection() {
    let (mut manager, _) = memory_manager();
    let snapshot = manager.snapshot();
    assert!(snapshot.load().is_empty());

    let id = manager.add(&TaskDraft::new("visible to timer")).unwrap();
    assert_eq!(snapshot.load().len(), 1);

    manager.delete(id);
    assert!(snapshot.load().is_empty());
}

#[test]
fn filter_by_category_reads_without_reordering() {
    let (mut manager, _) = memory_manager();
    for (text, category) in [("a", "Work"), ("b", "Personal"), ("c", "Work")] {
        manager.add(&TaskDraft {
            category: Some(category.to_string()),
            ..TaskDraft::new(text)
        });
    }

    let work = manager.filter_by_category(&CategoryFilter::parse("Work"));
    assert_eq!(work.len(), 2);
    assert_eq!(manager.filter_by_category(&CategoryFilter::All).len(), 3);
    assert_eq!(manager.tasks()[1].text, "b");
}

#[test]
fn notes_panel_state_is_transient_and_cleared_on_delete() {
    let (mut manager, _) = memory_manager();
    let id = manager.add(&TaskDraft::new("with notes")).unwrap();

    assert!(manager.toggle_notes_expanded(id));
    assert!(manager.is_notes_expanded(id));
    assert!(!manager.toggle_notes_expanded(id));
    assert!(manager.toggle_notes_expanded(id));

    manager.delete(id);
    assert!(!manager.is_notes_expanded(id));
    assert!(!manager.toggle_notes_expanded(id));
}

#[test]
fn storage_failures_degrade_without_losing_state() {
    let mut manager = TaskManager::open(
        BrokenRepo { saves: 0 },
        Arc::new(CountingNotifier::default()),
        fixed_clock(),
    );
    assert_eq!(manager.storage_status(), &StorageStatus::Healthy);

    let id = manager.add(&TaskDraft::new("still here")).unwrap();
    manager.toggle_completed(id);

    assert_eq!(manager.tasks().len(), 1);
    assert!(manager.get(id).unwrap().completed);
    assert_eq!(manager.repository().saves, 2);
    assert!(matches!(manager.storage_status(), StorageStatus::Degraded(_)));
}

#[test]
fn noop_operations_skip_persistence() {
    let mut manager = TaskManager::open(
        BrokenRepo { saves: 0 },
        Arc::new(CountingNotifier::default()),
        fixed_clock(),
    );
    manager.add(&TaskDraft::new(""));
    manager.reorder(0, None);
    manager.toggle_completed(uuid::Uuid::new_v4());
    assert_eq!(manager.repository().saves, 0);
}

#[test]
fn failed_load_never_overwrites_stored_tasks() {
    let stored = vec![Task::new("stored one"), Task::new("stored two")];
    let mut manager = TaskManager::open(
        flaky_repo_with(&stored, usize::MAX),
        Arc::new(CountingNotifier::default()),
        fixed_clock(),
    );
    assert!(matches!(manager.storage_status(), StorageStatus::Degraded(_)));
    assert!(manager.tasks().is_empty());

    let id = manager.add(&TaskDraft::new("made offline")).unwrap();
    manager.toggle_completed(id);

    assert_eq!(manager.repository().saves, 0);
    assert!(manager.get(id).unwrap().completed);
    assert_eq!(manager.snapshot().load().len(), 1);
    assert!(matches!(manager.storage_status(), StorageStatus::Degraded(_)));

    let mut reader = KvTaskRepository::new(manager.repository().inner.store().clone());
    assert_eq!(reader.load().unwrap(), stored);
}

#[test]
fn successful_retry_merges_stored_tasks_ahead_of_new_ones() {
    let stored = vec![Task::new("stored")];
    let mut manager = TaskManager::open(
        flaky_repo_with(&stored, 1),
        Arc::new(CountingNotifier::default()),
        fixed_clock(),
    );
    assert!(matches!(manager.storage_status(), StorageStatus::Degraded(_)));

    let id = manager.add(&TaskDraft::new("fresh")).unwrap();

    let texts = manager
        .tasks()
        .iter()
        .map(|task| task.text.as_str())
        .collect::<Vec<_>>();
    assert_eq!(texts, vec!["stored", "fresh"]);
    assert_eq!(manager.tasks()[1].id, id);
    assert_eq!(manager.snapshot().load().as_slice(), manager.tasks());
    assert_eq!(manager.repository().saves, 1);
    assert_eq!(manager.storage_status(), &StorageStatus::Healthy);

    let mut reader = KvTaskRepository::new(manager.repository().inner.store().clone());
    assert_eq!(reader.load().unwrap(), manager.tasks());
}
