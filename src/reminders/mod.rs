//! Task reminders.
//!
//! [`ReminderScheduler`] arms one volatile timer per task and displays
//! reminder, due and completion notifications through a
//! [`Notifier`](crate::notify::Notifier). The [`payload`] module builds the
//! notification contents.

pub mod payload;
pub mod scheduler;

pub use scheduler::ReminderScheduler;
