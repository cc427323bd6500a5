//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Record store error: {0}")]
    Store(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Token cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Invalid input: {0}")]
    Input(String),
}

/// Sign-in or sign-up rejected by the provider. Carries the provider's message verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Authentication failed: {message}")]
pub struct AuthError {
    pub message: String,
    /// HTTP status when the provider is remote.
    pub status: Option<u16>,
}

impl AuthError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }
}

/// Provider-side sign-out could not be confirmed. Logged; local logout still happens.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignOutWarning {
    #[error("no active session found, local cleanup only")]
    NoActiveSession,

    #[error("could not look up current session: {0}")]
    SessionLookupFailed(String),

    #[error("provider sign out failed: {0}")]
    RevokeFailed(String),
}
