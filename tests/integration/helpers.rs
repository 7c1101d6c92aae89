//! Shared helpers for integration tests.

use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use std::time::Duration;
use taskminder::clock::ManualClock;
use taskminder::config::NotificationConfig;
use taskminder::notify::MemoryNotifier;
use taskminder::{ReminderScheduler, Task};

/// 2025-03-10 at `h:m`.
pub(crate) fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 10)
        .expect("valid date")
        .and_hms_opt(h, m, 0)
        .expect("valid time")
}

/// Task due on 2025-03-10.
pub(crate) fn task_due(id: &str, due_time: Option<&str>, lead: Option<u32>) -> Task {
    let mut task = Task::new(id, "user-1", format!("Task {id}"));
    task.due_date = NaiveDate::from_ymd_opt(2025, 3, 10);
    task.due_time = due_time.map(str::to_owned);
    task.reminder_minutes = lead;
    task
}

/// Scheduler whose clock reads 2025-03-10 08:00, displaying into `notifier`.
pub(crate) fn scheduler_at_eight(
    notifier: MemoryNotifier,
) -> (ReminderScheduler, Arc<MemoryNotifier>, Arc<ManualClock>) {
    let notifier = Arc::new(notifier);
    let clock = Arc::new(ManualClock::new(at(8, 0)));
    let scheduler = ReminderScheduler::new(
        notifier.clone(),
        clock.clone(),
        NotificationConfig::default(),
    );
    (scheduler, notifier, clock)
}

/// Advance paused tokio time and the manual clock together.
pub(crate) async fn advance(clock: &ManualClock, minutes: i64) {
    clock.advance(chrono::TimeDelta::minutes(minutes));
    tokio::time::sleep(Duration::from_secs(minutes.unsigned_abs() * 60)).await;
}
