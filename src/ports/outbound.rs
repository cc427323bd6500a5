//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{AuthError, DomainError, Session, SessionEvent};
use crate::ports::query::{Query, Row, Scalar, Table};
use tokio::sync::mpsc;

/// Remote row-oriented record store.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Rows of `query.table` matching every filter, in the requested order, up to `limit`.
    async fn select(&self, query: &Query) -> Result<Vec<Row>, DomainError>;

    /// Number of rows matching the filters. Order and limit are ignored.
    async fn count(&self, query: &Query) -> Result<u64, DomainError>;

    /// Set `changes` on the row with primary key `id`. Errors if no such row exists.
    async fn update_by_id(
        &self,
        table: Table,
        id: &str,
        changes: &[(&'static str, Scalar)],
    ) -> Result<(), DomainError>;
}

/// Session-issuing auth service.
#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    /// The provider's current session, if any (restored from storage at startup).
    async fn get_current_session(&self) -> Result<Option<Session>, DomainError>;

    /// Register a notification sender. Every session change is pushed to it until the
    /// returned subscription is dropped or unsubscribed.
    fn subscribe(&self, tx: mpsc::UnboundedSender<SessionEvent>) -> Subscription;

    async fn sign_in_with_password(&self, email: &str, password: &str)
    -> Result<Session, AuthError>;

    /// `Ok(None)` when the account was created but still needs confirmation.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, AuthError>;

    /// Revoke the current session on the provider side.
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Local persisted key-value cache holding auth tokens.
/// Synchronous so cleanup can run from a drop guard.
pub trait TokenCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, DomainError>;

    fn set(&self, key: &str, value: &str) -> Result<(), DomainError>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), DomainError>;
}

/// Handle returned by `AuthProvider::subscribe`. Detaches on drop.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(f) = self.detach.take() {
            f();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(f) = self.detach.take() {
            f();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.detach.is_some())
            .finish()
    }
}
