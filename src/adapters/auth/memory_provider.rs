//! In-process auth provider for local use and testing.
//!
//! Keeps accounts in memory, issues opaque tokens and pushes session events like a
//! remote provider would. Failure switches let callers simulate provider outages.

use crate::adapters::auth::broadcast::SessionBroadcaster;
use crate::domain::{AuthError, AuthUser, DomainError, Session, SessionEvent};
use crate::ports::{AuthProvider, Subscription};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::info;

const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    user_id: String,
    password: String,
}

/// Auth provider backed by process memory.
pub struct MemoryAuthProvider {
    accounts: Mutex<HashMap<String, Account>>,
    current: Mutex<Option<Session>>,
    broadcaster: SessionBroadcaster,
    next_id: AtomicU64,
    fail_revoke: AtomicBool,
    fail_lookup: AtomicBool,
}

impl Default for MemoryAuthProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAuthProvider {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            broadcaster: SessionBroadcaster::new(),
            next_id: AtomicU64::new(1),
            fail_revoke: AtomicBool::new(false),
            fail_lookup: AtomicBool::new(false),
        }
    }

    /// Pre-register an account.
    pub fn with_account(self, email: &str, password: &str) -> Self {
        let user_id = self.issue_id("user");
        lock(&self.accounts).insert(
            email.to_lowercase(),
            Account {
                user_id,
                password: password.to_string(),
            },
        );
        self
    }

    /// Make `sign_out` fail without touching the remote session.
    pub fn set_revoke_failure(&self, fail: bool) {
        self.fail_revoke.store(fail, Ordering::SeqCst);
    }

    /// Make `get_current_session` fail.
    pub fn set_lookup_failure(&self, fail: bool) {
        self.fail_lookup.store(fail, Ordering::SeqCst);
    }

    /// Simulate the remote session disappearing (expired, revoked elsewhere).
    pub fn drop_remote_session(&self) {
        lock(&self.current).take();
        self.broadcaster.publish(SessionEvent::signed_out());
    }

    /// Simulate a session established outside this process (e.g. another tab).
    pub fn restore_remote_session(&self, email: &str) -> Result<Session, AuthError> {
        let user_id = lock(&self.accounts)
            .get(&email.to_lowercase())
            .map(|a| a.user_id.clone())
            .ok_or_else(|| AuthError::new("User not found"))?;
        Ok(self.establish(user_id, email))
    }

    /// Peek at the provider-side session without going through the port.
    pub fn remote_session(&self) -> Option<Session> {
        lock(&self.current).clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.broadcaster.subscriber_count()
    }

    fn issue_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn establish(&self, user_id: String, email: &str) -> Session {
        let session = Session {
            user: AuthUser {
                id: user_id,
                email: Some(email.to_string()),
            },
            access_token: self.issue_id("access"),
            refresh_token: self.issue_id("refresh"),
            expires_at: None,
        };
        *lock(&self.current) = Some(session.clone());
        self.broadcaster
            .publish(SessionEvent::signed_in(session.clone()));
        session
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait::async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn get_current_session(&self) -> Result<Option<Session>, DomainError> {
        if self.fail_lookup.load(Ordering::SeqCst) {
            return Err(AuthError::new("session lookup unavailable").into());
        }
        Ok(lock(&self.current).clone())
    }

    fn subscribe(&self, tx: mpsc::UnboundedSender<SessionEvent>) -> Subscription {
        self.broadcaster.subscribe(tx)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let user_id = {
            let accounts = lock(&self.accounts);
            match accounts.get(&email.to_lowercase()) {
                Some(a) if a.password == password => a.user_id.clone(),
                _ => return Err(AuthError::with_status("Invalid login credentials", 400)),
            }
        };
        info!(user = %user_id, "memory provider: signed in");
        Ok(self.establish(user_id, email))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, AuthError> {
        if !email.contains('@') {
            return Err(AuthError::with_status(
                "Unable to validate email address: invalid format",
                400,
            ));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::with_status(
                format!("Password should be at least {} characters", MIN_PASSWORD_LEN),
                422,
            ));
        }
        let user_id = {
            let mut accounts = lock(&self.accounts);
            let key = email.to_lowercase();
            if accounts.contains_key(&key) {
                return Err(AuthError::with_status("User already registered", 422));
            }
            let user_id = self.issue_id("user");
            accounts.insert(
                key,
                Account {
                    user_id: user_id.clone(),
                    password: password.to_string(),
                },
            );
            user_id
        };
        info!(user = %user_id, "memory provider: account created");
        Ok(Some(self.establish(user_id, email)))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.fail_revoke.load(Ordering::SeqCst) {
            return Err(AuthError::with_status("revoke request failed", 503));
        }
        if lock(&self.current).take().is_none() {
            return Err(AuthError::with_status("Auth session missing!", 400));
        }
        self.broadcaster.publish(SessionEvent::signed_out());
        Ok(())
    }
}
