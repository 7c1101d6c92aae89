//! Desktop notifications via the platform's command-line notification tool.
//!
//! Linux and the BSDs use `notify-send` (libnotify); macOS uses
//! `osascript`. Neither tool can retract a notification once shown, so
//! [`Notifier::close`] is a no-op and expiry is left to the notification
//! server.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::process::Command;
use tracing::debug;

use super::{Notification, NotificationHandle, Notifier, Permission};

const APP_NAME: &str = "taskminder";

/// Which tool drives the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesktopBackend {
    NotifySend,
    Osascript,
}

impl DesktopBackend {
    /// Preferred backend for the compile target.
    pub fn for_platform() -> Self {
        if cfg!(target_os = "macos") {
            Self::Osascript
        } else {
            Self::NotifySend
        }
    }

    fn program_name(self) -> &'static str {
        match self {
            Self::NotifySend => "notify-send",
            Self::Osascript => "osascript",
        }
    }
}

/// Notifier backed by an external notification command.
#[derive(Debug)]
pub struct DesktopNotifier {
    program: PathBuf,
    backend: DesktopBackend,
    next_handle: AtomicU64,
}

impl DesktopNotifier {
    /// Locate the platform tool on `PATH`.
    pub fn detect() -> Option<Self> {
        let backend = DesktopBackend::for_platform();
        match which::which(backend.program_name()) {
            Ok(program) => {
                debug!("desktop notifications via {}", program.display());
                Some(Self::new(program, backend))
            }
            Err(e) => {
                debug!("{} not available: {e}", backend.program_name());
                None
            }
        }
    }

    /// Use an explicit program path.
    pub fn new(program: PathBuf, backend: DesktopBackend) -> Self {
        Self {
            program,
            backend,
            next_handle: AtomicU64::new(1),
        }
    }

    pub fn backend(&self) -> DesktopBackend {
        self.backend
    }
}

/// Command-line arguments that display `notification` with `backend`.
pub(crate) fn build_args(backend: DesktopBackend, notification: &Notification) -> Vec<String> {
    match backend {
        DesktopBackend::NotifySend => {
            let mut args = vec![
                "--app-name".to_owned(),
                APP_NAME.to_owned(),
                "--urgency".to_owned(),
                if notification.require_interaction {
                    "critical".to_owned()
                } else {
                    "normal".to_owned()
                },
                // Carries the tag so a newer notification replaces an older one
                // on servers that honour the hint.
                format!(
                    "--hint=string:x-canonical-private-synchronous:{}",
                    notification.tag
                ),
            ];
            if notification.require_interaction {
                args.push("--expire-time".to_owned());
                args.push("0".to_owned());
            }
            if let Some(icon) = &notification.icon {
                args.push("--icon".to_owned());
                args.push(icon.clone());
            }
            args.push(notification.title.clone());
            args.push(notification.body.clone());
            args
        }
        DesktopBackend::Osascript => {
            let script = format!(
                "display notification \"{}\" with title \"{}\"",
                applescript_escape(&notification.body),
                applescript_escape(&notification.title)
            );
            vec!["-e".to_owned(), script]
        }
    }
}

fn applescript_escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

#[async_trait]
impl Notifier for DesktopNotifier {
    fn is_supported(&self) -> bool {
        true
    }

    fn permission(&self) -> Permission {
        // Command-line tools have no permission prompt of their own.
        Permission::Granted
    }

    async fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    async fn show_via_agent(&self, _notification: &Notification) -> anyhow::Result<()> {
        anyhow::bail!("desktop notifier has no background agent")
    }

    async fn show(&self, notification: &Notification) -> anyhow::Result<NotificationHandle> {
        let args = build_args(self.backend, notification);
        let status = Command::new(&self.program).args(&args).status().await?;
        if !status.success() {
            anyhow::bail!("{} exited with {status}", self.program.display());
        }
        Ok(NotificationHandle(
            self.next_handle.fetch_add(1, Ordering::Relaxed),
        ))
    }

    fn close(&self, handle: NotificationHandle) {
        debug!("notification {} left to server expiry", handle.0);
    }
}
