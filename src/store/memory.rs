//! In-process task store.
//!
//! Keeps rows in memory and fans changes out to per-owner subscribers.
//! Used by tests, the `taskminder-remind` host, and as a reference for
//! backend adapters.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::debug;

use super::{TaskChange, TaskStore, TaskSubscription};
use crate::error::{Result, TaskminderError};
use crate::task::{NewTask, Task, TaskPatch};

#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    /// Rows in insertion order.
    tasks: Mutex<Vec<Task>>,
    subscribers: Mutex<Vec<(String, mpsc::UnboundedSender<TaskChange>)>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-existing rows as-is.
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    fn rows(&self) -> MutexGuard<'_, Vec<Task>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Deliver `change` to `owner_id`'s subscribers, pruning closed ones.
    fn publish(&self, owner_id: &str, change: TaskChange) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|(owner, tx)| {
            if owner != owner_id {
                return !tx.is_closed();
            }
            tx.send(change.clone()).is_ok()
        });
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|(_, tx)| !tx.is_closed());
        subscribers.len()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn list(&self, owner_id: &str) -> Result<Vec<Task>> {
        let mut owned: Vec<Task> = self
            .rows()
            .iter()
            .rev()
            .filter(|t| t.user_id == owner_id)
            .cloned()
            .collect();
        // Stable: rows with equal timestamps keep newest-inserted first.
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn insert(&self, task: NewTask) -> Result<Task> {
        if task.user_id.trim().is_empty() {
            return Err(TaskminderError::Store("task has no owner".to_owned()));
        }
        let owner = task.user_id.clone();
        let stored = task.into_task(uuid::Uuid::new_v4().to_string(), Utc::now());
        self.rows().push(stored.clone());
        debug!(task_id = %stored.id, "task inserted");
        self.publish(&owner, TaskChange::Inserted(stored.clone()));
        Ok(stored)
    }

    async fn update(&self, id: &str, owner_id: &str, patch: TaskPatch) -> Result<Task> {
        let updated = {
            let mut rows = self.rows();
            let row = rows
                .iter_mut()
                .find(|t| t.id == id && t.user_id == owner_id)
                .ok_or_else(|| TaskminderError::NotFound(id.to_owned()))?;
            patch.apply_to(row, Utc::now());
            row.clone()
        };
        self.publish(owner_id, TaskChange::Updated(updated.clone()));
        Ok(updated)
    }

    async fn delete(&self, id: &str, owner_id: &str) -> Result<()> {
        {
            let mut rows = self.rows();
            let before = rows.len();
            rows.retain(|t| !(t.id == id && t.user_id == owner_id));
            if rows.len() == before {
                return Err(TaskminderError::NotFound(id.to_owned()));
            }
        }
        self.publish(owner_id, TaskChange::Deleted { id: id.to_owned() });
        Ok(())
    }

    async fn subscribe(&self, owner_id: &str) -> Result<TaskSubscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((owner_id.to_owned(), tx));
        Ok(TaskSubscription::new(rx))
    }
}
