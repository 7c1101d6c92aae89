//! In-memory notifier that records everything it is asked to do.
//!
//! Lets embedders and tests observe the notification surface without a
//! display: which notifications were shown (directly or through the
//! background agent), which handles were closed, and how often permission
//! was requested.

use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use super::{Notification, NotificationHandle, Notifier, NotifierFeatures, Permission};

/// How a recorded notification reached the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Direct(NotificationHandle),
    Agent,
}

#[derive(Debug)]
pub struct MemoryNotifier {
    supported: bool,
    background_agent: bool,
    features: NotifierFeatures,
    permission: Mutex<Permission>,
    request_outcome: Permission,
    fail_display: AtomicBool,
    display_delay: Duration,
    shown: Mutex<Vec<(Delivery, Notification)>>,
    closed: Mutex<Vec<NotificationHandle>>,
    permission_requests: AtomicUsize,
    next_handle: AtomicU64,
}

impl MemoryNotifier {
    fn with_state(supported: bool, permission: Permission, request_outcome: Permission) -> Self {
        Self {
            supported,
            background_agent: false,
            features: NotifierFeatures::default(),
            permission: Mutex::new(permission),
            request_outcome,
            fail_display: AtomicBool::new(false),
            display_delay: Duration::ZERO,
            shown: Mutex::new(Vec::new()),
            closed: Mutex::new(Vec::new()),
            permission_requests: AtomicUsize::new(0),
            next_handle: AtomicU64::new(1),
        }
    }

    /// Supported surface with permission already granted.
    pub fn granted() -> Self {
        Self::with_state(true, Permission::Granted, Permission::Granted)
    }

    /// Supported surface that has not asked yet; a request yields `outcome`.
    pub fn prompting(outcome: Permission) -> Self {
        Self::with_state(true, Permission::Default, outcome)
    }

    /// Host with no notification support.
    pub fn unsupported() -> Self {
        Self::with_state(false, Permission::Default, Permission::Default)
    }

    /// Register a persistent background agent.
    pub fn with_background_agent(mut self) -> Self {
        self.background_agent = true;
        self.features.persistent = true;
        self
    }

    pub fn with_features(mut self, features: NotifierFeatures) -> Self {
        self.features = features;
        self
    }

    /// Take `delay` to display each notification, like a slow platform tool.
    pub fn with_display_delay(mut self, delay: Duration) -> Self {
        self.display_delay = delay;
        self
    }

    /// Make every display attempt fail.
    pub fn set_fail_display(&self, fail: bool) {
        self.fail_display.store(fail, Ordering::SeqCst);
    }

    /// Notifications shown so far, in order.
    pub fn shown(&self) -> Vec<Notification> {
        lock(&self.shown).iter().map(|(_, n)| n.clone()).collect()
    }

    /// Notifications shown so far together with how they were delivered.
    pub fn deliveries(&self) -> Vec<(Delivery, Notification)> {
        lock(&self.shown).clone()
    }

    /// Tags of the notifications shown so far.
    pub fn shown_tags(&self) -> Vec<String> {
        lock(&self.shown).iter().map(|(_, n)| n.tag.clone()).collect()
    }

    pub fn closed(&self) -> Vec<NotificationHandle> {
        lock(&self.closed).clone()
    }

    pub fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }

    async fn settle(&self) {
        if !self.display_delay.is_zero() {
            tokio::time::sleep(self.display_delay).await;
        }
    }

    fn check_display(&self) -> anyhow::Result<()> {
        if !self.supported {
            anyhow::bail!("notifications are not supported");
        }
        if self.fail_display.load(Ordering::SeqCst) {
            anyhow::bail!("display failed");
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl Notifier for MemoryNotifier {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn permission(&self) -> Permission {
        *lock(&self.permission)
    }

    async fn request_permission(&self) -> Permission {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        if !self.supported {
            return Permission::Default;
        }
        let mut current = lock(&self.permission);
        // A decision, once made, sticks until the user changes it elsewhere.
        if *current == Permission::Default {
            *current = self.request_outcome;
        }
        *current
    }

    fn features(&self) -> NotifierFeatures {
        self.features
    }

    fn has_background_agent(&self) -> bool {
        self.background_agent
    }

    async fn show_via_agent(&self, notification: &Notification) -> anyhow::Result<()> {
        self.settle().await;
        self.check_display()?;
        if !self.background_agent {
            anyhow::bail!("no background agent registered");
        }
        lock(&self.shown).push((Delivery::Agent, notification.clone()));
        Ok(())
    }

    async fn show(&self, notification: &Notification) -> anyhow::Result<NotificationHandle> {
        self.settle().await;
        self.check_display()?;
        let handle = NotificationHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        lock(&self.shown).push((Delivery::Direct(handle), notification.clone()));
        Ok(handle)
    }

    fn close(&self, handle: NotificationHandle) {
        lock(&self.closed).push(handle);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::notify::{NotificationData, NotificationKind};

    fn sample() -> Notification {
        Notification {
            title: "t".to_owned(),
            body: "b".to_owned(),
            icon: None,
            badge: None,
            tag: "task-due-7".to_owned(),
            require_interaction: true,
            data: NotificationData {
                task_id: "7".to_owned(),
                kind: NotificationKind::Due,
            },
        }
    }

    #[tokio::test]
    async fn prompting_notifier_remembers_decision() {
        let notifier = MemoryNotifier::prompting(Permission::Denied);
        assert_eq!(notifier.permission(), Permission::Default);
        assert_eq!(notifier.request_permission().await, Permission::Denied);
        assert_eq!(notifier.permission(), Permission::Denied);
        assert_eq!(notifier.request_permission().await, Permission::Denied);
        assert_eq!(notifier.permission_requests(), 2);
    }

    #[tokio::test]
    async fn records_direct_and_agent_deliveries() {
        let notifier = MemoryNotifier::granted().with_background_agent();
        let handle = notifier.show(&sample()).await.unwrap();
        notifier.show_via_agent(&sample()).await.unwrap();
        notifier.close(handle);

        let deliveries = notifier.deliveries();
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0].0, Delivery::Direct(handle));
        assert_eq!(deliveries[1].0, Delivery::Agent);
        assert_eq!(notifier.closed(), vec![handle]);
    }

    #[tokio::test]
    async fn failing_display_records_nothing() {
        let notifier = MemoryNotifier::granted();
        notifier.set_fail_display(true);
        assert!(notifier.show(&sample()).await.is_err());
        assert!(notifier.shown().is_empty());
    }
}
