//! Notifier that writes notifications to the tracing log.
//!
//! Useful on headless hosts where reminders should still be visible in the
//! service log.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

use super::{Notification, NotificationHandle, Notifier, Permission};

#[derive(Debug)]
pub struct LogNotifier {
    next_handle: AtomicU64,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self {
            next_handle: AtomicU64::new(1),
        }
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn is_supported(&self) -> bool {
        true
    }

    fn permission(&self) -> Permission {
        Permission::Granted
    }

    async fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    async fn show_via_agent(&self, _notification: &Notification) -> anyhow::Result<()> {
        anyhow::bail!("log notifier has no background agent")
    }

    async fn show(&self, notification: &Notification) -> anyhow::Result<NotificationHandle> {
        let handle = NotificationHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        info!(
            tag = %notification.tag,
            task_id = %notification.data.task_id,
            kind = notification.data.kind.as_str(),
            "{}: {}",
            notification.title,
            notification.body
        );
        Ok(handle)
    }

    fn close(&self, handle: NotificationHandle) {
        debug!("closed notification {}", handle.0);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::notify::{NotificationData, NotificationKind};

    #[tokio::test]
    async fn handles_are_distinct() {
        let notifier = LogNotifier::new();
        let notification = Notification {
            title: "Task completed".to_owned(),
            body: "done".to_owned(),
            icon: None,
            badge: None,
            tag: "task-completed-1".to_owned(),
            require_interaction: false,
            data: NotificationData {
                task_id: "1".to_owned(),
                kind: NotificationKind::Completed,
            },
        };
        let a = notifier.show(&notification).await.unwrap();
        let b = notifier.show(&notification).await.unwrap();
        assert_ne!(a, b);
        notifier.close(a);
    }
}
