//! Glue between task edits, auth events and the reminder scheduler.
//!
//! [`TaskSession`] is what a UI drives: every mutation goes to the store
//! first and only then touches reminders, so a failed write leaves the
//! pending reminder as it was.

use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::{AuthEvent, AuthProvider};
use crate::config::ReminderConfig;
use crate::error::{Result, TaskminderError};
use crate::reminders::ReminderScheduler;
use crate::store::{TaskChange, TaskStore};
use crate::task::{DueBucket, NewTask, Task, TaskFilter, TaskPatch, TaskStats};

/// React to auth lifecycle events until the channel closes.
///
/// Sign-in asks for notification permission when `request_on_sign_in` is
/// set; sign-out cancels every pending reminder.
pub fn watch_auth_events(
    mut events: broadcast::Receiver<AuthEvent>,
    scheduler: ReminderScheduler,
    request_on_sign_in: bool,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(AuthEvent::SignedIn(session)) => {
                    info!(user_id = %session.user.id, "user signed in");
                    if request_on_sign_in {
                        let granted = scheduler.request_permission().await;
                        debug!(granted, "notification permission after sign-in");
                    }
                }
                Ok(AuthEvent::SignedOut) => {
                    info!("user signed out, cancelling reminders");
                    scheduler.cancel_all_reminders();
                }
                Ok(AuthEvent::TokenRefreshed(session)) => {
                    debug!(user_id = %session.user.id, "auth token refreshed");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "auth event watcher lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!("auth event watcher stopped");
    })
}

/// One signed-in user's view of their tasks.
pub struct TaskSession {
    owner_id: String,
    store: Arc<dyn TaskStore>,
    auth: Arc<dyn AuthProvider>,
    scheduler: ReminderScheduler,
    config: ReminderConfig,
    /// Newest first, mirroring [`TaskStore::list`].
    tasks: Vec<Task>,
}

impl TaskSession {
    pub fn new(
        owner_id: impl Into<String>,
        store: Arc<dyn TaskStore>,
        auth: Arc<dyn AuthProvider>,
        scheduler: ReminderScheduler,
        config: ReminderConfig,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            store,
            auth,
            scheduler,
            config,
            tasks: Vec::new(),
        }
    }

    /// Session for whoever is currently signed in.
    ///
    /// # Errors
    ///
    /// Returns an auth error when nobody is signed in.
    pub async fn for_current_user(
        store: Arc<dyn TaskStore>,
        auth: Arc<dyn AuthProvider>,
        scheduler: ReminderScheduler,
        config: ReminderConfig,
    ) -> Result<Self> {
        let user = auth
            .user()
            .await?
            .ok_or_else(|| TaskminderError::Auth("not signed in".to_owned()))?;
        Ok(Self::new(user.id, store, auth, scheduler, config))
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn scheduler(&self) -> &ReminderScheduler {
        &self.scheduler
    }

    /// Cached tasks, newest first.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn filtered(&self, filter: &TaskFilter) -> Vec<&Task> {
        self.tasks.iter().filter(|t| filter.matches(t)).collect()
    }

    /// Cached tasks past due at `now` that are not completed.
    pub fn overdue(&self, now: NaiveDateTime) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| !t.is_completed() && t.is_overdue(now))
            .collect()
    }

    /// Summary counts over the session's task list at `now`.
    pub fn stats(&self, now: NaiveDateTime) -> TaskStats {
        TaskStats::collect(&self.tasks, now)
    }

    /// Tasks grouped into list sections at `now`, in list order within each.
    pub fn grouped(&self, now: NaiveDateTime) -> BTreeMap<DueBucket, Vec<&Task>> {
        let mut groups: BTreeMap<DueBucket, Vec<&Task>> = BTreeMap::new();
        for task in &self.tasks {
            groups.entry(task.due_bucket(now)).or_default().push(task);
        }
        groups
    }

    fn wants_reminder(&self, task: &Task) -> bool {
        if self.config.schedule_completed {
            task.reminder_lead().is_some() && task.due_date.is_some()
        } else {
            task.wants_reminder()
        }
    }

    fn rearm(&self, task: &Task) {
        self.scheduler.cancel_reminder(&task.id);
        if self.wants_reminder(task) {
            self.scheduler.schedule_reminder(task);
        }
    }

    /// Fetch the owner's tasks and arm their reminders.
    ///
    /// Returns how many reminders were armed.
    ///
    /// # Errors
    ///
    /// Returns the store error; the cache is left untouched.
    pub async fn load_tasks(&mut self) -> Result<usize> {
        let tasks = self.store.list(&self.owner_id).await?;
        let mut armed = 0;
        for task in &tasks {
            if self.wants_reminder(task) && self.scheduler.schedule_reminder(task).is_some() {
                armed += 1;
            }
        }
        info!(
            owner_id = %self.owner_id,
            tasks = tasks.len(),
            armed,
            "tasks loaded"
        );
        self.tasks = tasks;
        Ok(armed)
    }

    /// Store a new task for this owner and arm its reminder.
    ///
    /// # Errors
    ///
    /// Returns the store error.
    pub async fn create_task(&mut self, mut task: NewTask) -> Result<Task> {
        task.user_id.clone_from(&self.owner_id);
        if task.due_date.is_some() && task.reminder_minutes.is_none_or(|m| m == 0) {
            task.reminder_minutes = self.config.default_reminder_minutes;
        }
        let stored = self.store.insert(task).await?;
        if self.wants_reminder(&stored) {
            self.scheduler.schedule_reminder(&stored);
        }
        self.upsert(stored.clone());
        Ok(stored)
    }

    /// Apply `patch` and re-arm the reminder from the stored row.
    ///
    /// Shows the completed notification when the patch marks the task
    /// completed.
    ///
    /// # Errors
    ///
    /// Returns the store error; the pending reminder is untouched.
    pub async fn update_task(&mut self, id: &str, patch: TaskPatch) -> Result<Task> {
        let completes = patch.completes();
        let stored = self.store.update(id, &self.owner_id, patch).await?;
        self.rearm(&stored);
        if completes && stored.is_completed() {
            self.scheduler.show_completed_notification(&stored).await;
        }
        self.upsert(stored.clone());
        Ok(stored)
    }

    /// # Errors
    ///
    /// Returns the store error; the pending reminder is untouched.
    pub async fn delete_task(&mut self, id: &str) -> Result<()> {
        self.store.delete(id, &self.owner_id).await?;
        self.scheduler.cancel_reminder(id);
        self.tasks.retain(|t| t.id != id);
        Ok(())
    }

    /// Cancel every reminder, then sign out.
    ///
    /// # Errors
    ///
    /// Returns the auth error. Reminders are cancelled regardless.
    pub async fn logout(&mut self) -> Result<()> {
        self.scheduler.cancel_all_reminders();
        self.tasks.clear();
        self.auth.sign_out().await
    }

    /// Fold a change-feed event into the cache and reminders.
    pub fn apply_change(&mut self, change: TaskChange) {
        match change {
            TaskChange::Inserted(task) | TaskChange::Updated(task) => {
                if task.user_id != self.owner_id {
                    warn!(task_id = %task.id, "ignoring change for another owner");
                    return;
                }
                self.rearm(&task);
                self.upsert(task);
            }
            TaskChange::Deleted { id } => {
                self.scheduler.cancel_reminder(&id);
                self.tasks.retain(|t| t.id != id);
            }
        }
    }

    fn upsert(&mut self, task: Task) {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => *slot = task,
            None => self.tasks.insert(0, task),
        }
    }
}

impl std::fmt::Debug for TaskSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSession")
            .field("owner_id", &self.owner_id)
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}
