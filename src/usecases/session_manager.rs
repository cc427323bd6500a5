//! Session reconciliation between local state and the auth provider.
//!
//! - Provider notifications arrive on one mpsc channel owned by the manager
//! - Every transition is applied by consuming that channel, in arrival order
//! - Readers observe the state through a `watch` handle; the manager is the only writer
//! - `sign_out` forces local logout on every exit path via a drop guard

use crate::domain::session::{AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::domain::{AuthError, AuthUser, SessionEvent, SessionState, SignOutWarning};
use crate::ports::{AuthProvider, Subscription, TokenCache};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Read-only view of the session, handed to whatever needs to know who is signed in.
#[derive(Clone)]
pub struct SessionHandle {
    rx: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn current(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    /// True until the provider has answered the startup query.
    pub fn is_loading(&self) -> bool {
        self.rx.borrow().is_loading()
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.rx.borrow().session().map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.rx.borrow().session().is_some()
    }

    /// Wait for the next state change. Returns false once the manager is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Owns the authoritative session value.
pub struct SessionManager {
    provider: Arc<dyn AuthProvider>,
    cache: Arc<dyn TokenCache>,
    state: watch::Sender<SessionState>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    subscription: Option<Subscription>,
}

impl SessionManager {
    /// Subscribe to the provider's notifications. The state starts as `Initializing`.
    pub fn new(provider: Arc<dyn AuthProvider>, cache: Arc<dyn TokenCache>) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let subscription = provider.subscribe(tx);
        let (state, _) = watch::channel(SessionState::Initializing);
        Self {
            provider,
            cache,
            state,
            events,
            subscription: Some(subscription),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            rx: self.state.subscribe(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Ask the provider for the current session and leave `Initializing`.
    /// A failed lookup is treated as no session.
    pub async fn initialize(&mut self) -> SessionState {
        let session = match self.provider.get_current_session().await {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "could not read current session; starting signed out");
                None
            }
        };
        self.set(SessionState::from_session(session));
        // Anything queued during the lookup is newer than its answer.
        self.pump();
        let state = self.state();
        info!(authenticated = state.session().is_some(), "session initialised");
        state
    }

    /// Apply every queued notification in arrival order. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Wait for one notification and apply it. `None` once the provider side is closed.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let event = self.events.recv().await?;
        self.apply(event.clone());
        Some(event)
    }

    /// Delegate to the provider. On success the resulting notification sets the state.
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<(), AuthError> {
        self.provider
            .sign_in_with_password(email, password)
            .await
            .inspect_err(|e| warn!(error = %e, "sign in rejected"))?;
        self.pump();
        Ok(())
    }

    /// Same contract as `sign_in`. An account awaiting confirmation stays anonymous.
    pub async fn sign_up(&mut self, email: &str, password: &str) -> Result<(), AuthError> {
        let session = self
            .provider
            .sign_up(email, password)
            .await
            .inspect_err(|e| warn!(error = %e, "sign up rejected"))?;
        if session.is_none() {
            info!("account created; waiting for confirmation before sign in");
        }
        self.pump();
        Ok(())
    }

    /// Revoke remotely if possible, then clear local state and cached tokens no matter what.
    /// Returns the non-fatal condition that was logged, if any.
    pub async fn sign_out(&mut self) -> Option<SignOutWarning> {
        let _cleanup = LocalLogout {
            state: &self.state,
            cache: self.cache.as_ref(),
            events: &mut self.events,
        };

        let warning = match self.provider.get_current_session().await {
            Ok(Some(_)) => match self.provider.sign_out().await {
                Ok(()) => None,
                Err(e) => Some(SignOutWarning::RevokeFailed(e.message)),
            },
            Ok(None) => Some(SignOutWarning::NoActiveSession),
            Err(e) => Some(SignOutWarning::SessionLookupFailed(e.to_string())),
        };
        if let Some(w) = &warning {
            warn!(warning = %w, "provider sign out not confirmed; clearing local session anyway");
        }
        warning
    }

    /// Detach from the provider. Queued notifications are dropped.
    pub fn shutdown(mut self) {
        if let Some(sub) = self.subscription.take() {
            sub.unsubscribe();
        }
        debug!("session manager shut down");
    }

    fn apply(&self, event: SessionEvent) {
        debug!(kind = ?event.kind, has_session = event.session.is_some(), "session event");
        self.set(SessionState::from_session(event.session));
    }

    fn set(&self, next: SessionState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

/// Scoped cleanup for `sign_out`. Runs on drop: normal return, panic, or a dropped future.
struct LocalLogout<'a> {
    state: &'a watch::Sender<SessionState>,
    cache: &'a dyn TokenCache,
    events: &'a mut mpsc::UnboundedReceiver<SessionEvent>,
}

impl Drop for LocalLogout<'_> {
    fn drop(&mut self) {
        // Notifications that raced the sign-out describe a session we are discarding.
        let mut discarded = 0usize;
        while self.events.try_recv().is_ok() {
            discarded += 1;
        }
        for key in [AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(e) = self.cache.remove(key) {
                warn!(key, error = %e, "could not erase cached token");
            }
        }
        self.state.send_if_modified(|current| {
            let changed = *current != SessionState::Anonymous;
            *current = SessionState::Anonymous;
            changed
        });
        info!(discarded, "local session cleared");
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &*self.state.borrow())
            .finish()
    }
}
