//! Authentication contract.
//!
//! Session lifecycle belongs to the hosted auth service. taskminder only
//! needs to query the current session, drive sign-in/out, and react to
//! [`AuthEvent`]s.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use url::Url;

use crate::error::Result;

mod memory;

pub use memory::MemoryAuthProvider;

/// An authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A live login session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// Session lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut,
    TokenRefreshed(Session),
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Current session, if signed in.
    async fn session(&self) -> Result<Option<Session>>;

    /// Current user, if signed in.
    async fn user(&self) -> Result<Option<User>>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session>;

    /// Register a new account. Does not sign in.
    async fn sign_up(&self, email: &str, password: &str) -> Result<User>;

    /// URL the user must visit to authorize with `provider`; the service
    /// redirects back to `redirect_url` afterwards.
    async fn sign_in_with_oauth(&self, provider: &str, redirect_url: &str) -> Result<Url>;

    async fn sign_out(&self) -> Result<()>;

    /// Receive future auth events.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}
