//! Task persistence contract.
//!
//! The hosted backend owns storage, row-level security and the change feed;
//! this module only describes what taskminder consumes from it. Every
//! operation is scoped to an owner id and implementations must reject
//! cross-owner access.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::task::{NewTask, Task, TaskPatch};

mod memory;

pub use memory::MemoryTaskStore;

/// A change pushed by the store's change feed.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskChange {
    Inserted(Task),
    Updated(Task),
    Deleted { id: String },
}

impl TaskChange {
    /// Id of the affected task.
    pub fn task_id(&self) -> &str {
        match self {
            Self::Inserted(task) | Self::Updated(task) => &task.id,
            Self::Deleted { id } => id,
        }
    }
}

/// Live change feed for one owner. Dropping it unsubscribes.
#[derive(Debug)]
pub struct TaskSubscription {
    rx: mpsc::UnboundedReceiver<TaskChange>,
}

impl TaskSubscription {
    pub fn new(rx: mpsc::UnboundedReceiver<TaskChange>) -> Self {
        Self { rx }
    }

    /// Next change, or `None` once the store has shut the feed down.
    pub async fn recv(&mut self) -> Option<TaskChange> {
        self.rx.recv().await
    }

    /// Next change if one is already queued.
    pub fn try_recv(&mut self) -> Option<TaskChange> {
        self.rx.try_recv().ok()
    }
}

/// Owner-scoped task storage with a change feed.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// All tasks of `owner_id`, newest first.
    async fn list(&self, owner_id: &str) -> Result<Vec<Task>>;

    /// Store a new task and return the stored row.
    async fn insert(&self, task: NewTask) -> Result<Task>;

    /// Apply `patch` to task `id` owned by `owner_id` and return the stored row.
    async fn update(&self, id: &str, owner_id: &str, patch: TaskPatch) -> Result<Task>;

    /// Remove task `id` owned by `owner_id`.
    async fn delete(&self, id: &str, owner_id: &str) -> Result<()>;

    /// Subscribe to inserts, updates and deletes of `owner_id`'s tasks.
    async fn subscribe(&self, owner_id: &str) -> Result<TaskSubscription>;
}
