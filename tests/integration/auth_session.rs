//! Sign-in/out flows driving the reminder scheduler through a task session.

use std::sync::Arc;
use std::time::Duration;

use taskminder::auth::{AuthProvider, MemoryAuthProvider};
use taskminder::config::{AuthConfig, ReminderConfig};
use taskminder::notify::{MemoryNotifier, Notifier, Permission};
use taskminder::store::{MemoryTaskStore, TaskStore};
use taskminder::{NewTask, TaskPatch, TaskSession, TaskStatus, watch_auth_events};

use crate::helpers::{advance, scheduler_at_eight};

fn due_today(title: &str, time: &str) -> NewTask {
    NewTask {
        due_date: chrono::NaiveDate::from_ymd_opt(2025, 3, 10),
        due_time: Some(time.to_owned()),
        reminder_minutes: Some(15),
        ..NewTask::new("", title)
    }
}

#[tokio::test(start_paused = true)]
async fn logout_with_two_pending_reminders_shows_nothing() {
    let (scheduler, notifier, clock) = scheduler_at_eight(MemoryNotifier::granted());
    let auth = Arc::new(MemoryAuthProvider::new(&AuthConfig::default()).unwrap());
    let store = Arc::new(MemoryTaskStore::new());

    auth.sign_up("sam@example.com", "s3cretpw").await.unwrap();
    auth.sign_in_with_password("sam@example.com", "s3cretpw")
        .await
        .unwrap();

    let mut session = TaskSession::for_current_user(
        store,
        auth.clone(),
        scheduler.clone(),
        ReminderConfig::default(),
    )
    .await
    .unwrap();
    session.create_task(due_today("standup", "09:00")).await.unwrap();
    session.create_task(due_today("review", "11:00")).await.unwrap();
    assert_eq!(scheduler.pending_count(), 2);

    session.logout().await.unwrap();
    assert_eq!(scheduler.pending_count(), 0);
    assert!(auth.session().await.unwrap().is_none());

    advance(&clock, 5 * 60).await;
    assert!(notifier.shown().is_empty());
}

#[tokio::test(start_paused = true)]
async fn signing_out_elsewhere_cancels_reminders() {
    let (scheduler, notifier, clock) =
        scheduler_at_eight(MemoryNotifier::prompting(Permission::Granted));
    let auth = Arc::new(MemoryAuthProvider::new(&AuthConfig::default()).unwrap());
    let _watcher = watch_auth_events(auth.subscribe(), scheduler.clone(), true);

    let user = auth.sign_up("kim@example.com", "password").await.unwrap();
    auth.sign_in_with_password("kim@example.com", "password")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(notifier.permission(), Permission::Granted);

    let store = Arc::new(MemoryTaskStore::new());
    let mut session = TaskSession::new(
        user.id.clone(),
        store,
        auth.clone(),
        scheduler.clone(),
        ReminderConfig::default(),
    );
    session.create_task(due_today("one", "09:00")).await.unwrap();
    session.create_task(due_today("two", "09:30")).await.unwrap();

    auth.sign_out().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(scheduler.pending_count(), 0);

    advance(&clock, 120).await;
    assert!(notifier.shown().is_empty());
}

#[tokio::test(start_paused = true)]
async fn remote_edit_reschedules_reminder() {
    let (scheduler, notifier, clock) = scheduler_at_eight(MemoryNotifier::granted());
    let auth = Arc::new(MemoryAuthProvider::new(&AuthConfig::default()).unwrap());
    let store = Arc::new(MemoryTaskStore::new());
    let mut feed = store.subscribe("user-1").await.unwrap();

    let mut session = TaskSession::new(
        "user-1",
        store.clone(),
        auth,
        scheduler.clone(),
        ReminderConfig::default(),
    );
    let task = session.create_task(due_today("sync", "09:00")).await.unwrap();
    session.apply_change(feed.recv().await.unwrap());

    // Another device pushes the due time back an hour.
    let patch = TaskPatch {
        due_time: Some(Some("10:00".to_owned())),
        ..TaskPatch::default()
    };
    store.update(&task.id, "user-1", patch).await.unwrap();
    session.apply_change(feed.recv().await.unwrap());

    advance(&clock, 50).await;
    assert!(notifier.shown().is_empty());

    advance(&clock, 60).await;
    assert_eq!(notifier.shown().len(), 1);

    // Completing it afterwards shows the completed notice.
    session
        .update_task(&task.id, TaskPatch::status(TaskStatus::Completed))
        .await
        .unwrap();
    assert_eq!(notifier.shown().len(), 2);
}
