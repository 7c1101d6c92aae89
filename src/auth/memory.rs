//! In-process auth provider.
//!
//! Accounts live in memory with salted SHA-256 password digests. Sessions
//! are opaque random tokens. OAuth only builds the authorize URL; the
//! redirect round-trip is the hosted service's job.

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, info};
use url::Url;

use super::{AuthEvent, AuthProvider, Session, User};
use crate::config::AuthConfig;
use crate::error::{Result, TaskminderError};

const MIN_PASSWORD_LEN: usize = 6;
const EVENT_CAPACITY: usize = 32;

struct Account {
    user: User,
    salt: String,
    digest: String,
}

pub struct MemoryAuthProvider {
    base_url: Url,
    session_ttl: TimeDelta,
    accounts: Mutex<HashMap<String, Account>>,
    session: Mutex<Option<Session>>,
    events: broadcast::Sender<AuthEvent>,
}

impl MemoryAuthProvider {
    /// # Errors
    ///
    /// Returns a config error when `config.base_url` is not a valid URL.
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| TaskminderError::Config(format!("invalid auth base_url: {e}")))?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            base_url,
            session_ttl: TimeDelta::hours(1),
            accounts: Mutex::new(HashMap::new()),
            session: Mutex::new(None),
            events,
        })
    }

    fn accounts(&self) -> MutexGuard<'_, HashMap<String, Account>> {
        self.accounts.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn current(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: AuthEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn new_session(&self, user: User) -> Session {
        Session {
            access_token: uuid::Uuid::new_v4().to_string(),
            refresh_token: uuid::Uuid::new_v4().to_string(),
            expires_at: Utc::now() + self.session_ttl,
            user,
        }
    }

    /// Rotate the session tokens and emit [`AuthEvent::TokenRefreshed`].
    ///
    /// # Errors
    ///
    /// Returns an auth error when nobody is signed in.
    pub fn refresh_session(&self) -> Result<Session> {
        let refreshed = {
            let mut current = self.current();
            let user = current
                .as_ref()
                .map(|s| s.user.clone())
                .ok_or_else(|| TaskminderError::Auth("no active session".to_owned()))?;
            let session = self.new_session(user);
            *current = Some(session.clone());
            session
        };
        debug!(user_id = %refreshed.user.id, "session refreshed");
        self.emit(AuthEvent::TokenRefreshed(refreshed.clone()));
        Ok(refreshed)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn password_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn session(&self) -> Result<Option<Session>> {
        let mut current = self.current();
        if current.as_ref().is_some_and(|s| s.expires_at <= Utc::now()) {
            *current = None;
        }
        Ok(current.clone())
    }

    async fn user(&self) -> Result<Option<User>> {
        Ok(self.session().await?.map(|s| s.user))
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let email = normalize_email(email);
        let user = {
            let accounts = self.accounts();
            match accounts.get(&email) {
                Some(account) if account.digest == password_digest(&account.salt, password) => {
                    account.user.clone()
                }
                _ => return Err(TaskminderError::Auth("invalid login credentials".to_owned())),
            }
        };
        let session = self.new_session(user);
        *self.current() = Some(session.clone());
        info!(user_id = %session.user.id, "signed in");
        self.emit(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(TaskminderError::Auth(format!("invalid email: {email}")));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(TaskminderError::Auth(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let mut accounts = self.accounts();
        if accounts.contains_key(&email) {
            return Err(TaskminderError::Auth("user already registered".to_owned()));
        }
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.clone(),
            created_at: Utc::now(),
        };
        let salt = uuid::Uuid::new_v4().to_string();
        let digest = password_digest(&salt, password);
        accounts.insert(
            email,
            Account {
                user: user.clone(),
                salt,
                digest,
            },
        );
        debug!(user_id = %user.id, "account created");
        Ok(user)
    }

    async fn sign_in_with_oauth(&self, provider: &str, redirect_url: &str) -> Result<Url> {
        let provider = provider.trim();
        if provider.is_empty() {
            return Err(TaskminderError::Auth("missing OAuth provider".to_owned()));
        }
        let redirect = Url::parse(redirect_url)
            .map_err(|e| TaskminderError::Auth(format!("invalid redirect URL: {e}")))?;
        let mut url = self
            .base_url
            .join("auth/v1/authorize")
            .map_err(|e| TaskminderError::Config(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect.as_str());
        Ok(url)
    }

    async fn sign_out(&self) -> Result<()> {
        let previous = self.current().take();
        if let Some(session) = previous {
            info!(user_id = %session.user.id, "signed out");
        }
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
