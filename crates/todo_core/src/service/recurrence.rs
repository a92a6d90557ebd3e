//! Recurring task scheduling.
//!
//! # Responsibility
//! - Compute the due date of the next occurrence of a recurring task.
//! - Carry the reminder lead time over to the next occurrence.
//!
//! # Invariants
//! - Date math is calendar-aware and done in UTC; time of day is preserved.
//! - Monthly steps roll surplus days into the following month instead of
//!   clamping (Jan 31 + 1 month = Mar 3 in a non-leap year).
//! - A reminder without a due date has a zero lead: the next reminder lands
//!   on the next due date.

use crate::model::task::{Recurrence, Task, TaskId};
use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Utc};

/// Advances `base` by one recurrence step.
///
/// Returns `None` only when the result falls outside the representable range.
pub fn advance(base: DateTime<Utc>, recurrence: Recurrence) -> Option<DateTime<Utc>> {
    match recurrence {
        Recurrence::Daily => base.checked_add_days(Days::new(1)),
        Recurrence::Weekly => base.checked_add_days(Days::new(7)),
        Recurrence::Monthly => add_one_month_rolling(base),
    }
}

fn add_one_month_rolling(base: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let (year, month) = if base.month() == 12 {
        (base.year().checked_add(1)?, 1)
    } else {
        (base.year(), base.month() + 1)
    };
    let first_of_month = NaiveDate::from_ymd_opt(year, month, 1)?;
    let date = first_of_month.checked_add_days(Days::new(u64::from(base.day() - 1)))?;
    Some(date.and_time(base.time()).and_utc())
}

/// Returns how long before the due date the reminder fires.
///
/// - Both set: `due - reminder` (negative when the reminder is after the due date).
/// - Reminder only: zero.
/// - No reminder: `None`.
pub fn reminder_lead(
    due_date: Option<DateTime<Utc>>,
    reminder: Option<DateTime<Utc>>,
) -> Option<Duration> {
    match (due_date, reminder) {
        (_, None) => None,
        (Some(due), Some(reminder)) => Some(due - reminder),
        (None, Some(_)) => Some(Duration::zero()),
    }
}

/// Builds the follow-up task spawned when `task` is completed.
///
/// The base instant is the task's due date, or `now` when it has none.
/// Returns `None` when `task` has no recurrence or the date math overflows.
pub fn next_occurrence(task: &Task, now: DateTime<Utc>, id: TaskId) -> Option<Task> {
    let recurrence = task.recurrence?;
    let base = task.due_date.unwrap_or(now);
    let next_due = advance(base, recurrence)?;
    let next_reminder = match reminder_lead(task.due_date, task.reminder) {
        Some(lead) => Some(next_due.checked_sub_signed(lead)?),
        None => None,
    };

    Some(Task {
        id,
        completed: false,
        is_editing: false,
        due_date: Some(next_due),
        reminder: next_reminder,
        ..task.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::{advance, next_occurrence, reminder_lead};
    use crate::model::task::{Priority, Recurrence, Task};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 30, 0).unwrap()
    }

    #[test]
    fn daily_and_weekly_add_calendar_days() {
        assert_eq!(advance(at(2024, 2, 28, 9), Recurrence::Daily), Some(at(2024, 2, 29, 9)));
        assert_eq!(advance(at(2024, 12, 29, 9), Recurrence::Weekly), Some(at(2025, 1, 5, 9)));
    }

    #[test]
    fn monthly_keeps_day_when_it_exists() {
        assert_eq!(advance(at(2024, 1, 15, 8), Recurrence::Monthly), Some(at(2024, 2, 15, 8)));
        assert_eq!(advance(at(2024, 12, 15, 8), Recurrence::Monthly), Some(at(2025, 1, 15, 8)));
    }

    #[test]
    fn monthly_rolls_missing_days_into_next_month() {
        assert_eq!(advance(at(2023, 1, 31, 8), Recurrence::Monthly), Some(at(2023, 3, 3, 8)));
        assert_eq!(advance(at(2024, 1, 31, 8), Recurrence::Monthly), Some(at(2024, 3, 2, 8)));
        assert_eq!(advance(at(2024, 3, 31, 8), Recurrence::Monthly), Some(at(2024, 5, 1, 8)));
    }

    #[test]
    fn reminder_lead_covers_every_presence_combination() {
        let due = at(2024, 5, 1, 10);
        let reminder = due - Duration::hours(1);
        assert_eq!(reminder_lead(Some(due), Some(reminder)), Some(Duration::hours(1)));
        assert_eq!(reminder_lead(None, Some(reminder)), Some(Duration::zero()));
        assert_eq!(reminder_lead(Some(due), None), None);
        assert_eq!(reminder_lead(None, None), None);
    }

    #[test]
    fn next_occurrence_copies_fields_and_shifts_dates() {
        let due = at(2024, 5, 1, 10);
        let mut task = Task::new("standup notes");
        task.completed = true;
        task.is_editing = true;
        task.priority = Priority::High;
        task.category = Some("Work".to_string());
        task.tags = Some(vec!["team".to_string()]);
        task.notes = Some("bring agenda".to_string());
        task.recurrence = Some(Recurrence::Weekly);
        task.due_date = Some(due);
        task.reminder = Some(due - Duration::hours(1));

        let id = Uuid::new_v4();
        let next = next_occurrence(&task, at(2030, 1, 1, 0), id).unwrap();
        assert_eq!(next.id, id);
        assert!(!next.completed);
        assert!(!next.is_editing);
        assert_eq!(next.due_date, Some(due + Duration::days(7)));
        assert_eq!(next.reminder, Some(due + Duration::days(7) - Duration::hours(1)));
        assert_eq!(next.text, task.text);
        assert_eq!(next.priority, task.priority);
        assert_eq!(next.category, task.category);
        assert_eq!(next.tags, task.tags);
        assert_eq!(next.notes, task.notes);
        assert_eq!(next.recurrence, task.recurrence);
    }

    #[test]
    fn next_occurrence_without_due_date_uses_now_and_zero_lead() {
        let now = at(2024, 6, 10, 7);
        let mut task = Task::new("stretch");
        task.recurrence = Some(Recurrence::Daily);
        task.reminder = Some(at(2024, 6, 9, 7));

        let next = next_occurrence(&task, now, Uuid::new_v4()).unwrap();
        assert_eq!(next.due_date, Some(at(2024, 6, 11, 7)));
        assert_eq!(next.reminder, next.due_date);
    }

    #[test]
    fn non_recurring_task_has_no_next_occurrence() {
        let task = Task::new("one-off");
        assert!(next_occurrence(&task, Utc::now(), Uuid::new_v4()).is_none());
    }
}
