//! Configuration types for taskminder.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskminderConfig {
    /// Notification presentation settings.
    pub notifications: NotificationConfig,
    /// Reminder scheduling defaults.
    pub reminders: ReminderConfig,
    /// Hosted auth backend settings.
    pub auth: AuthConfig,
}

/// How notifications are built and presented.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Master switch. When `false` nothing is ever displayed.
    pub enabled: bool,
    /// Icon passed to the platform notifier (path or icon name).
    pub icon: Option<String>,
    /// Badge passed to the platform notifier.
    pub badge: Option<String>,
    /// Seconds before a non-interactive notification is closed when no
    /// background agent owns it.
    pub completed_dismiss_secs: u64,
    /// Ask for notification permission whenever a user signs in.
    pub request_permission_on_sign_in: bool,
    /// `chrono` format string used for due dates in reminder bodies.
    pub date_format: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            icon: None,
            badge: None,
            completed_dismiss_secs: 5,
            request_permission_on_sign_in: true,
            date_format: "%Y-%m-%d".to_owned(),
        }
    }
}

/// Reminder defaults applied by the session layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Lead time applied to new tasks that have a due date but no explicit
    /// `reminder_minutes`.
    pub default_reminder_minutes: Option<u32>,
    /// Also arm reminders for tasks already marked completed.
    pub schedule_completed: bool,
}

/// Hosted auth backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Base URL of the auth service, used to build OAuth authorize URLs.
    pub base_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_owned(),
        }
    }
}

impl TaskminderConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::TaskminderError::Config(e.to_string()))
    }

    /// Load from `path` when it exists, otherwise return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &std::path::Path) -> crate::error::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::TaskminderError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/taskminder/config.toml`.
    pub fn default_config_path() -> PathBuf {
        crate::taskminder_dirs::config_file()
    }
}
