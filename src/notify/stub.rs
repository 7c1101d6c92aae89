//! No-op notifier for hosts without a notification surface.

use async_trait::async_trait;

use super::{Notification, NotificationHandle, Notifier, Permission};

/// Stub notifier that reports no support.
///
/// Permission queries answer [`Permission::Default`]; display operations
/// return errors; closing is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedNotifier;

#[async_trait]
impl Notifier for UnsupportedNotifier {
    fn is_supported(&self) -> bool {
        false
    }

    fn permission(&self) -> Permission {
        Permission::Default
    }

    async fn request_permission(&self) -> Permission {
        Permission::Default
    }

    async fn show_via_agent(&self, _notification: &Notification) -> anyhow::Result<()> {
        anyhow::bail!("notifications are not supported on this host")
    }

    async fn show(&self, _notification: &Notification) -> anyhow::Result<NotificationHandle> {
        anyhow::bail!("notifications are not supported on this host")
    }

    fn close(&self, _handle: NotificationHandle) {}
}
