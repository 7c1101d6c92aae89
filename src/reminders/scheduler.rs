//! Reminder scheduler.
//!
//! Owns the map from task id to the single pending timer for that task and
//! mediates between task edits and the platform [`Notifier`]. Reminders are
//! volatile: nothing is persisted, and dropping the last scheduler handle
//! aborts every pending timer.

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::NotificationConfig;
use crate::notify::{self, Capabilities, Notification, Notifier};
use crate::reminders::payload;
use crate::task::Task;

/// Longest single sleep handed to the tokio timer; longer waits are chained.
const MAX_SLEEP_CHUNK: Duration = Duration::from_secs(30 * 24 * 3600);

static GLOBAL: OnceLock<ReminderScheduler> = OnceLock::new();

/// Handle to a reminder scheduler. Clones share the same pending map.
#[derive(Clone)]
pub struct ReminderScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: NotificationConfig,
    pending: Mutex<HashMap<String, PendingReminder>>,
    next_generation: AtomicU64,
    /// Fired reminders whose display has not finished yet.
    displaying: AtomicUsize,
    idle: Notify,
}

struct PendingReminder {
    /// Distinguishes a timer from the one that replaced it.
    generation: u64,
    /// Local wall time of the fire instant.
    fire_at: NaiveDateTime,
    timer: JoinHandle<()>,
}

impl ReminderScheduler {
    /// Create a scheduler that displays through `notifier`.
    pub fn new(
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                notifier,
                clock,
                config,
                pending: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(1),
                displaying: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Process-wide scheduler, created on first use with the platform
    /// notifier, the system clock and default notification settings.
    pub fn global() -> &'static ReminderScheduler {
        GLOBAL.get_or_init(|| {
            Self::new(
                notify::create_notifier(),
                Arc::new(SystemClock),
                NotificationConfig::default(),
            )
        })
    }

    /// Install `scheduler` as the process-wide instance.
    ///
    /// Returns `false` when [`global`](Self::global) was already initialized.
    pub fn init_global(scheduler: ReminderScheduler) -> bool {
        GLOBAL.set(scheduler).is_ok()
    }

    /// Ask for notification permission. Returns whether it is granted.
    ///
    /// Returns `false` when the host has no notification support and does
    /// not prompt again once permission is granted.
    pub async fn request_permission(&self) -> bool {
        self.inner.request_permission().await
    }

    /// Arm the reminder for `task`, replacing any pending one.
    ///
    /// Fires `reminder_minutes` of real time before the due instant. Does
    /// nothing when the task lacks a due date or lead time, when that
    /// instant is not in the future, or when called outside a tokio runtime.
    /// Returns the local wall time the reminder is armed for.
    pub fn schedule_reminder(&self, task: &Task) -> Option<NaiveDateTime> {
        if task.due_date.is_none() || task.reminder_lead().is_none() {
            debug!(task_id = %task.id, "no due date or lead time, reminder not armed");
            return None;
        }
        if task.due_date_time().is_none() {
            warn!(
                task_id = %task.id,
                due_time = task.due_time.as_deref().unwrap_or_default(),
                "malformed due time, reminder not armed"
            );
            return None;
        }

        let clock = self.inner.clock.as_ref();
        let fire_instant = task.reminder_at(clock)?;
        let fire_at = clock.to_local(fire_instant);
        let now = clock.now();
        if fire_instant <= now {
            debug!(task_id = %task.id, %fire_at, "reminder instant already passed");
            return None;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(task_id = %task.id, "cannot arm reminder outside a tokio runtime: {e}");
                return None;
            }
        };
        let delay = (fire_instant - now).to_std().unwrap_or_default();
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);

        // Held across the spawn so the timer cannot look up its entry before
        // it has been inserted.
        let mut pending = self.inner.lock_pending();
        if let Some(previous) = pending.remove(&task.id) {
            previous.timer.abort();
            debug!(task_id = %task.id, previous = %previous.fire_at, "replacing pending reminder");
        }

        let weak = Arc::downgrade(&self.inner);
        let snapshot = task.clone();
        let timer = runtime.spawn(async move {
            sleep_long(delay).await;
            fire(weak, snapshot, generation).await;
        });

        pending.insert(
            task.id.clone(),
            PendingReminder {
                generation,
                fire_at,
                timer,
            },
        );
        info!(task_id = %task.id, %fire_at, "reminder armed");
        Some(fire_at)
    }

    /// Cancel the pending reminder for `task_id`, if any.
    pub fn cancel_reminder(&self, task_id: &str) {
        if let Some(previous) = self.inner.lock_pending().remove(task_id) {
            previous.timer.abort();
            debug!(task_id, "reminder cancelled");
        }
        self.inner.idle.notify_waiters();
    }

    /// Cancel every pending reminder.
    pub fn cancel_all_reminders(&self) {
        let drained: Vec<PendingReminder> = {
            let mut pending = self.inner.lock_pending();
            pending.drain().map(|(_, p)| p).collect()
        };
        let count = drained.len();
        for reminder in drained {
            reminder.timer.abort();
        }
        if count > 0 {
            info!("cancelled {count} pending reminders");
        }
        self.inner.idle.notify_waiters();
    }

    /// Tell the user a task was completed. Dismisses itself.
    pub async fn show_completed_notification(&self, task: &Task) {
        let notification = payload::completed(task, &self.inner.config);
        self.inner.display(notification).await;
    }

    /// Tell the user a task is due now.
    pub async fn show_due_notification(&self, task: &Task) {
        let notification = payload::due(task, &self.inner.config);
        self.inner.display(notification).await;
    }

    /// What the notification surface supports.
    pub fn capabilities(&self) -> Capabilities {
        let notifier = &self.inner.notifier;
        if !notifier.is_supported() {
            return Capabilities::unsupported();
        }
        let features = notifier.features();
        Capabilities {
            supported: true,
            permission: notifier.permission(),
            background_agent_supported: notifier.has_background_agent(),
            actions: features.actions,
            badge: features.badge,
            persistent: features.persistent,
        }
    }

    pub fn is_scheduled(&self, task_id: &str) -> bool {
        self.inner.lock_pending().contains_key(task_id)
    }

    /// Instant the pending reminder for `task_id` is armed for.
    pub fn scheduled_at(&self, task_id: &str) -> Option<NaiveDateTime> {
        self.inner.lock_pending().get(task_id).map(|p| p.fire_at)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock_pending().len()
    }

    /// No reminder is pending and none is still being displayed.
    pub fn is_idle(&self) -> bool {
        self.pending_count() == 0 && self.inner.displaying.load(Ordering::SeqCst) == 0
    }

    /// Wait until [`is_idle`](Self::is_idle) holds.
    pub async fn wait_until_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}

impl std::fmt::Debug for ReminderScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderScheduler")
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

async fn sleep_long(delay: Duration) {
    let deadline = tokio::time::Instant::now() + delay;
    loop {
        let now = tokio::time::Instant::now();
        if now >= deadline {
            return;
        }
        let step = (deadline - now).min(MAX_SLEEP_CHUNK);
        tokio::time::sleep(step).await;
    }
}

/// Marks a fired reminder as in flight until dropped.
struct InFlight<'a>(&'a Inner);

impl<'a> InFlight<'a> {
    fn enter(inner: &'a Inner) -> Self {
        inner.displaying.fetch_add(1, Ordering::SeqCst);
        Self(inner)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.displaying.fetch_sub(1, Ordering::SeqCst);
        self.0.idle.notify_waiters();
    }
}

/// Timer body: drop our own entry, then display.
async fn fire(inner: Weak<Inner>, task: Task, generation: u64) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    // Entered before the entry is removed so the scheduler never looks idle
    // between removal and display.
    let _in_flight = InFlight::enter(&inner);
    if !inner.take_if_current(&task.id, generation) {
        debug!(task_id = %task.id, "stale reminder timer ignored");
        return;
    }
    let notification = payload::reminder(&task, &inner.config);
    inner.display(notification).await;
}

impl Inner {
    fn lock_pending(&self) -> MutexGuard<'_, HashMap<String, PendingReminder>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Remove the entry for `task_id` if it still belongs to `generation`.
    fn take_if_current(&self, task_id: &str, generation: u64) -> bool {
        let mut pending = self.lock_pending();
        match pending.get(task_id) {
            Some(p) if p.generation == generation => {
                pending.remove(task_id);
                true
            }
            _ => false,
        }
    }

    async fn request_permission(&self) -> bool {
        if !self.notifier.is_supported() {
            warn!("notifications are not supported on this host");
            return false;
        }
        if self.notifier.permission().is_granted() {
            return true;
        }
        let outcome = self.notifier.request_permission().await;
        debug!(?outcome, "notification permission requested");
        outcome.is_granted()
    }

    async fn display(&self, notification: Notification) {
        if !self.config.enabled {
            debug!(tag = %notification.tag, "notifications disabled, not shown");
            return;
        }
        if !self.notifier.is_supported() {
            debug!(tag = %notification.tag, "notifications unsupported, not shown");
            return;
        }
        if !self.notifier.permission().is_granted() && !self.request_permission().await {
            info!(tag = %notification.tag, "notification permission not granted, not shown");
            return;
        }

        if self.notifier.has_background_agent() {
            if let Err(e) = self.notifier.show_via_agent(&notification).await {
                warn!(tag = %notification.tag, "failed to show notification: {e}");
            }
            return;
        }

        match self.notifier.show(&notification).await {
            Ok(handle) => {
                if notification.require_interaction {
                    return;
                }
                let notifier = Arc::clone(&self.notifier);
                let dismiss = Duration::from_secs(self.config.completed_dismiss_secs);
                tokio::spawn(async move {
                    tokio::time::sleep(dismiss).await;
                    notifier.close(handle);
                });
            }
            Err(e) => warn!(tag = %notification.tag, "failed to show notification: {e}"),
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let pending = self.pending.get_mut().unwrap_or_else(|e| e.into_inner());
        for (_, reminder) in pending.drain() {
            reminder.timer.abort();
        }
    }
}
