//! Reminder arming, replacement and cancellation against a paused clock.

use taskminder::notify::{MemoryNotifier, NotificationKind, Permission};

use crate::helpers::{advance, at, scheduler_at_eight, task_due};

#[tokio::test(start_paused = true)]
async fn reminder_fires_forty_five_minutes_later() {
    let (scheduler, notifier, clock) = scheduler_at_eight(MemoryNotifier::granted());
    let task = task_due("call", Some("09:00"), Some(15));

    assert_eq!(scheduler.schedule_reminder(&task), Some(at(8, 45)));

    advance(&clock, 44).await;
    assert!(notifier.shown().is_empty());

    advance(&clock, 1).await;
    let shown = notifier.shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].title, "📅 Reminder: Task call");
    assert_eq!(shown[0].data.kind, NotificationKind::Reminder);
    assert!(shown[0].require_interaction);
    assert!(!scheduler.is_scheduled("call"));
}

#[tokio::test(start_paused = true)]
async fn date_only_task_due_at_midnight_is_not_armed() {
    let (scheduler, notifier, clock) = scheduler_at_eight(MemoryNotifier::granted());
    let task = task_due("report", None, Some(15));

    assert_eq!(scheduler.schedule_reminder(&task), None);
    assert_eq!(scheduler.pending_count(), 0);

    advance(&clock, 24 * 60).await;
    assert!(notifier.shown().is_empty());
}

#[tokio::test(start_paused = true)]
async fn rescheduling_keeps_only_the_latest_timer() {
    let (scheduler, notifier, clock) = scheduler_at_eight(MemoryNotifier::granted());

    scheduler.schedule_reminder(&task_due("t", Some("09:00"), Some(15)));
    scheduler.schedule_reminder(&task_due("t", Some("10:00"), Some(15)));
    assert_eq!(scheduler.pending_count(), 1);
    assert_eq!(scheduler.scheduled_at("t"), Some(at(9, 45)));

    // The superseded 08:45 timer stays silent.
    advance(&clock, 60).await;
    assert!(notifier.shown().is_empty());

    advance(&clock, 46).await;
    assert_eq!(notifier.shown_tags(), vec!["task-reminder-t".to_owned()]);
}

#[tokio::test(start_paused = true)]
async fn cancel_twice_is_safe() {
    let (scheduler, notifier, clock) = scheduler_at_eight(MemoryNotifier::granted());
    scheduler.schedule_reminder(&task_due("t", Some("09:00"), Some(15)));

    scheduler.cancel_reminder("t");
    scheduler.cancel_reminder("t");
    assert!(!scheduler.is_scheduled("t"));

    advance(&clock, 120).await;
    assert!(notifier.shown().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancel_all_silences_every_timer() {
    let (scheduler, notifier, clock) = scheduler_at_eight(MemoryNotifier::granted());
    for (id, time) in [("a", "09:00"), ("b", "10:30"), ("c", "23:00")] {
        scheduler.schedule_reminder(&task_due(id, Some(time), Some(15)));
    }
    assert_eq!(scheduler.pending_count(), 3);

    scheduler.cancel_all_reminders();
    assert_eq!(scheduler.pending_count(), 0);

    advance(&clock, 16 * 60).await;
    assert!(notifier.shown().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unsupported_host_refuses_permission_without_touching_timers() {
    let (scheduler, notifier, _clock) = scheduler_at_eight(MemoryNotifier::unsupported());
    scheduler.schedule_reminder(&task_due("t", Some("09:00"), Some(15)));

    assert!(!scheduler.request_permission().await);
    assert!(scheduler.is_scheduled("t"));
    assert!(!scheduler.capabilities().supported);
    assert!(notifier.shown().is_empty());
}

#[tokio::test(start_paused = true)]
async fn denied_permission_drops_reminder_quietly() {
    let (scheduler, notifier, clock) =
        scheduler_at_eight(MemoryNotifier::prompting(Permission::Denied));
    scheduler.schedule_reminder(&task_due("t", Some("09:00"), Some(15)));

    advance(&clock, 50).await;
    assert!(notifier.shown().is_empty());
    assert_eq!(notifier.permission_requests(), 1);
    assert_eq!(scheduler.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn reminder_after_clocks_fall_back_fires_an_hour_later_in_real_time() {
    use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};
    use std::sync::Arc;
    use std::time::Duration;
    use taskminder::ReminderScheduler;
    use taskminder::clock::{ManualClock, ManualZone};
    use taskminder::config::NotificationConfig;

    // New York: 02:00 EDT falls back to 01:00 EST on 2025-11-02.
    let zone = ManualZone::with_change(
        FixedOffset::west_opt(4 * 3600).expect("valid offset"),
        Utc.with_ymd_and_hms(2025, 11, 2, 6, 0, 0).unwrap(),
        FixedOffset::west_opt(5 * 3600).expect("valid offset"),
    );
    // Saturday 12:00 EDT.
    let now = Utc.with_ymd_and_hms(2025, 11, 1, 16, 0, 0).unwrap();
    let notifier = Arc::new(MemoryNotifier::granted());
    let scheduler = ReminderScheduler::new(
        notifier.clone(),
        Arc::new(ManualClock::in_zone(now, zone)),
        NotificationConfig::default(),
    );

    let mut task = task_due("call", Some("09:00"), Some(15));
    task.due_date = NaiveDate::from_ymd_opt(2025, 11, 2);
    let armed = scheduler.schedule_reminder(&task).expect("armed");
    assert_eq!(armed.to_string(), "2025-11-02 08:45:00");

    // 08:45 EST is 21h45m away; the wall clock suggests 20h45m.
    tokio::time::sleep(Duration::from_secs((20 * 60 + 46) * 60)).await;
    assert!(notifier.shown().is_empty());
    assert!(!scheduler.is_idle());

    scheduler.wait_until_idle().await;
    assert_eq!(notifier.shown().len(), 1);
}
