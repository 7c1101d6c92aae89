//! Error types for taskminder.

/// Top-level error type for the task manager core.
#[derive(Debug, thiserror::Error)]
pub enum TaskminderError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Data store failure (query, insert, update, delete, subscribe).
    #[error("store error: {0}")]
    Store(String),

    /// Row does not exist or is not owned by the caller.
    #[error("task not found: {0}")]
    NotFound(String),

    /// Authentication / session error.
    #[error("auth error: {0}")]
    Auth(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, TaskminderError>;
