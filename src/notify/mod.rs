//! Platform notification surface.
//!
//! Provides the [`Notifier`] trait the reminder scheduler displays through,
//! the payload types passed across it, and the available implementations:
//! a desktop notifier that shells out to the platform's notification tool,
//! a tracing-backed notifier for headless hosts, an in-memory recorder, and
//! a stub for hosts with no notification support at all.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

mod desktop;
mod log_sink;
mod memory;
mod stub;

pub use desktop::{DesktopBackend, DesktopNotifier};
pub use log_sink::LogNotifier;
pub use memory::{Delivery, MemoryNotifier};
pub use stub::UnsupportedNotifier;

/// Notification permission as reported by the platform.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
    /// The user has not been asked yet.
    #[default]
    Default,
}

impl Permission {
    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }
}

/// Which event a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Reminder,
    Due,
    Completed,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reminder => "reminder",
            Self::Due => "due",
            Self::Completed => "completed",
        }
    }
}

/// Structured payload attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    pub task_id: String,
    pub kind: NotificationKind,
}

/// A notification ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: Option<String>,
    pub badge: Option<String>,
    /// Deduplication tag: a newer notification with the same tag replaces
    /// the older one on platforms that support it.
    pub tag: String,
    /// Stay on screen until the user dismisses it.
    pub require_interaction: bool,
    pub data: NotificationData,
}

/// Opaque handle to a notification shown directly (not via an agent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationHandle(pub u64);

/// Optional platform features.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifierFeatures {
    /// Action buttons on notifications.
    pub actions: bool,
    /// Badge images.
    pub badge: bool,
    /// Notifications that outlive the process via a background agent.
    pub persistent: bool,
}

/// Snapshot of what the notification surface can do.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub supported: bool,
    pub permission: Permission,
    pub background_agent_supported: bool,
    pub actions: bool,
    pub badge: bool,
    pub persistent: bool,
}

impl Capabilities {
    /// Conservative answer for hosts with no notification support.
    pub fn unsupported() -> Self {
        Self::default()
    }
}

/// The operating environment's notification capability.
///
/// Implementations must be cheap to query; `is_supported`, `permission`,
/// `features` and `has_background_agent` are called on hot paths.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Whether notifications can be shown at all.
    fn is_supported(&self) -> bool;

    /// Current permission state.
    fn permission(&self) -> Permission;

    /// Ask the user (or platform) for permission and return the outcome.
    async fn request_permission(&self) -> Permission;

    /// Optional feature set.
    fn features(&self) -> NotifierFeatures {
        NotifierFeatures::default()
    }

    /// Whether a persistent background agent is registered.
    fn has_background_agent(&self) -> bool {
        false
    }

    /// Hand the notification to the background agent, which owns its
    /// lifetime from then on.
    async fn show_via_agent(&self, notification: &Notification) -> anyhow::Result<()>;

    /// Display directly and return a handle that can later be closed.
    async fn show(&self, notification: &Notification) -> anyhow::Result<NotificationHandle>;

    /// Close a directly shown notification. Unknown handles are ignored.
    fn close(&self, handle: NotificationHandle);
}

/// Create the platform-appropriate notifier.
///
/// Returns the desktop notifier when the platform's notification tool is
/// installed, or the unsupported stub otherwise.
pub fn create_notifier() -> Arc<dyn Notifier> {
    match DesktopNotifier::detect() {
        Some(notifier) => Arc::new(notifier),
        None => {
            tracing::debug!("no desktop notification tool found, notifications disabled");
            Arc::new(UnsupportedNotifier)
        }
    }
}
