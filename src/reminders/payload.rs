//! Notification payloads for task events.

use crate::config::NotificationConfig;
use crate::notify::{Notification, NotificationData, NotificationKind};
use crate::task::Task;

/// Deduplication tag for a task notification, e.g. `task-reminder-42`.
pub fn tag(kind: NotificationKind, task_id: &str) -> String {
    format!("task-{}-{task_id}", kind.as_str())
}

fn build(
    kind: NotificationKind,
    task: &Task,
    title: String,
    body: String,
    require_interaction: bool,
    config: &NotificationConfig,
) -> Notification {
    Notification {
        title,
        body,
        icon: config.icon.clone(),
        badge: config.badge.clone(),
        tag: tag(kind, &task.id),
        require_interaction,
        data: NotificationData {
            task_id: task.id.clone(),
            kind,
        },
    }
}

/// Advance reminder shown `reminder_minutes` before the due instant.
pub fn reminder(task: &Task, config: &NotificationConfig) -> Notification {
    let date = task
        .due_date
        .map(|d| d.format(&config.date_format).to_string())
        .unwrap_or_else(|| "today".to_owned());
    let time = task
        .due_time
        .as_deref()
        .map(|t| format!(" ({t})"))
        .unwrap_or_default();
    build(
        NotificationKind::Reminder,
        task,
        format!("📅 Reminder: {}", task.title),
        format!("Due: {date}{time}"),
        true,
        config,
    )
}

/// The task has reached its due instant.
pub fn due(task: &Task, config: &NotificationConfig) -> Notification {
    build(
        NotificationKind::Due,
        task,
        format!("⏰ Due now: {}", task.title),
        "This task is now due".to_owned(),
        true,
        config,
    )
}

/// The task was marked completed. Dismisses itself.
pub fn completed(task: &Task, config: &NotificationConfig) -> Notification {
    build(
        NotificationKind::Completed,
        task,
        "✅ Task completed".to_owned(),
        format!("\"{}\" has been completed!", task.title),
        false,
        config,
    )
}
