//! taskminder: the reminder core of a personal task manager.
//!
//! Tasks live in a hosted backend; this crate turns task edits into local
//! reminder notifications.
//!
//! # Architecture
//!
//! - **Tasks**: the record model, patches and list filters
//! - **Store / Auth**: traits for the hosted backend, with in-memory
//!   implementations
//! - **Reminders**: one pending timer per task, fired through a platform
//!   [`notify::Notifier`]
//! - **Session**: keeps reminders in step with task edits, change-feed
//!   events and sign-in/out

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod notify;
pub mod reminders;
pub mod session;
pub mod store;
pub mod task;
pub mod taskminder_dirs;

pub use config::TaskminderConfig;
pub use error::{Result, TaskminderError};
pub use reminders::ReminderScheduler;
pub use session::{TaskSession, watch_auth_events};
pub use task::{
    DueBucket, NewTask, Task, TaskFilter, TaskPatch, TaskPriority, TaskStats, TaskStatus,
};
