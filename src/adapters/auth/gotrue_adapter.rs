//! GoTrue-compatible auth adapter (the REST API behind Supabase Auth).
//!
//! Implements `AuthProvider` over HTTP. Tokens are persisted in the `TokenCache` so a
//! session survives restarts; session changes are pushed to subscribers.

use crate::adapters::auth::broadcast::SessionBroadcaster;
use crate::domain::session::{AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::domain::{AuthError, AuthUser, DomainError, Session, SessionEvent};
use crate::ports::{AuthProvider, Subscription, TokenCache};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: UserResponse,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// GoTrue reports errors under several keys depending on the endpoint and version.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP auth provider.
pub struct GoTrueAuthProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    cache: Arc<dyn TokenCache>,
    current: Mutex<Option<Session>>,
    broadcaster: SessionBroadcaster,
}

impl GoTrueAuthProvider {
    /// # Arguments
    /// * `base_url` - project URL, e.g. `https://xyz.supabase.co` (`/auth/v1` is appended)
    /// * `api_key` - public anon key sent as the `apikey` header
    /// * `cache` - where access/refresh tokens are persisted
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, cache: Arc<dyn TokenCache>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            cache,
            current: Mutex::new(None),
            broadcaster: SessionBroadcaster::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    fn current(&self) -> MutexGuard<'_, Option<Session>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist_tokens(&self, session: &Session) {
        let stored = self
            .cache
            .set(AUTH_TOKEN_KEY, &session.access_token)
            .and_then(|_| self.cache.set(REFRESH_TOKEN_KEY, &session.refresh_token));
        if let Err(e) = stored {
            warn!(error = %e, "could not persist auth tokens");
        }
    }

    fn forget_tokens(&self) {
        for key in [AUTH_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(e) = self.cache.remove(key) {
                warn!(key, error = %e, "could not remove cached token");
            }
        }
    }

    /// Store the session locally and notify subscribers.
    fn adopt(&self, session: Session) -> Session {
        self.persist_tokens(&session);
        *self.current() = Some(session.clone());
        self.broadcaster
            .publish(SessionEvent::signed_in(session.clone()));
        session
    }

    async fn post_credentials(
        &self,
        url: &str,
        email: &str,
        password: &str,
    ) -> Result<serde_json::Value, AuthError> {
        let resp = self
            .client
            .post(url)
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AuthError::new(format!("auth request failed: {}", e)))?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AuthError::new(format!("auth response unreadable: {}", e)))?;
        if !status.is_success() {
            return Err(AuthError::with_status(error_message(status, &text), status.as_u16()));
        }
        serde_json::from_str(&text).map_err(|e| AuthError::new(format!("invalid auth response: {}", e)))
    }

    /// Validate cached tokens against `/user`. Stale tokens are dropped.
    async fn restore_from_cache(&self) -> Result<Option<Session>, DomainError> {
        let Some(access_token) = self.cache.get(AUTH_TOKEN_KEY)? else {
            return Ok(None);
        };
        let refresh_token = self.cache.get(REFRESH_TOKEN_KEY)?.unwrap_or_default();

        let resp = self
            .client
            .get(self.endpoint("/user"))
            .header("apikey", &self.api_key)
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(|e| AuthError::new(format!("session lookup failed: {}", e)))?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            info!("cached session rejected by provider; clearing tokens");
            self.forget_tokens();
            return Ok(None);
        }
        let text = resp
            .text()
            .await
            .map_err(|e| AuthError::new(format!("session lookup unreadable: {}", e)))?;
        if !status.is_success() {
            return Err(AuthError::with_status(error_message(status, &text), status.as_u16()).into());
        }
        let user: UserResponse = serde_json::from_str(&text)
            .map_err(|e| AuthError::new(format!("invalid user response: {}", e)))?;

        let session = Session {
            user: AuthUser {
                id: user.id,
                email: user.email,
            },
            access_token,
            refresh_token,
            expires_at: None,
        };
        *self.current() = Some(session.clone());
        info!(user = %session.user.id, "session restored from token cache");
        Ok(Some(session))
    }
}

#[async_trait::async_trait]
impl AuthProvider for GoTrueAuthProvider {
    async fn get_current_session(&self) -> Result<Option<Session>, DomainError> {
        let known = self.current().clone();
        if let Some(s) = known {
            return Ok(Some(s));
        }
        self.restore_from_cache().await
    }

    fn subscribe(&self, tx: mpsc::UnboundedSender<SessionEvent>) -> Subscription {
        self.broadcaster.subscribe(tx)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let body = self
            .post_credentials(&self.endpoint("/token?grant_type=password"), email, password)
            .await?;
        let token: TokenResponse = serde_json::from_value(body)
            .map_err(|e| AuthError::new(format!("invalid token response: {}", e)))?;
        let session = session_from_token(token, unix_now());
        info!(user = %session.user.id, "signed in");
        Ok(self.adopt(session))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, AuthError> {
        let body = self
            .post_credentials(&self.endpoint("/signup"), email, password)
            .await?;
        if body.get("access_token").is_none() {
            info!("sign-up accepted; email confirmation pending");
            return Ok(None);
        }
        let token: TokenResponse = serde_json::from_value(body)
            .map_err(|e| AuthError::new(format!("invalid sign-up response: {}", e)))?;
        let session = session_from_token(token, unix_now());
        info!(user = %session.user.id, "signed up");
        Ok(Some(self.adopt(session)))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let in_memory = self.current().as_ref().map(|s| s.access_token.clone());
        let access_token = in_memory.or_else(|| self.cache.get(AUTH_TOKEN_KEY).ok().flatten());
        let Some(access_token) = access_token else {
            return Err(AuthError::with_status("Auth session missing!", 400));
        };

        let resp = self
            .client
            .post(self.endpoint("/logout"))
            .header("apikey", &self.api_key)
            .bearer_auth(&access_token)
            .send()
            .await
            .map_err(|e| AuthError::new(format!("logout request failed: {}", e)))?;
        let status = resp.status();
        // 401/404: the provider no longer knows this session, which is the goal anyway.
        let gone = status == StatusCode::UNAUTHORIZED || status == StatusCode::NOT_FOUND;
        if !status.is_success() && !gone {
            let text = resp.text().await.unwrap_or_default();
            return Err(AuthError::with_status(error_message(status, &text), status.as_u16()));
        }
        debug!(status = status.as_u16(), "logout acknowledged");

        self.current().take();
        self.forget_tokens();
        self.broadcaster.publish(SessionEvent::signed_out());
        Ok(())
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

fn session_from_token(token: TokenResponse, now: i64) -> Session {
    let expires_at = token
        .expires_at
        .or_else(|| token.expires_in.map(|secs| now + secs));
    Session {
        user: AuthUser {
            id: token.user.id,
            email: token.user.email,
        },
        access_token: token.access_token,
        refresh_token: token.refresh_token,
        expires_at,
    }
}

/// Best human-readable message from an error response.
fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    [
        parsed.error_description,
        parsed.msg,
        parsed.message,
        parsed.error,
    ]
    .into_iter()
    .flatten()
    .find(|m| !m.trim().is_empty())
    .or_else(|| {
        let trimmed = body.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
    .unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::MemoryTokenCache;

    fn provider(cache: Arc<dyn TokenCache>) -> GoTrueAuthProvider {
        // Port 9 (discard): nothing in these tests may reach the network.
        GoTrueAuthProvider::new("http://127.0.0.1:9/", "anon-key", cache)
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let p = provider(Arc::new(MemoryTokenCache::new()));
        assert_eq!(
            p.endpoint("/token?grant_type=password"),
            "http://127.0.0.1:9/auth/v1/token?grant_type=password"
        );
    }

    #[test]
    fn error_message_prefers_description() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, body),
            "Invalid login credentials"
        );
        let body = r#"{"code":422,"msg":"User already registered"}"#;
        assert_eq!(
            error_message(StatusCode::UNPROCESSABLE_ENTITY, body),
            "User already registered"
        );
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, ""), "Bad Gateway");
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "upstream down"), "upstream down");
    }

    #[test]
    fn token_response_maps_to_session() {
        let body = r#"{
            "access_token": "at", "token_type": "bearer", "expires_in": 3600,
            "refresh_token": "rt", "user": {"id": "u-1", "email": "a@b.c", "role": "authenticated"}
        }"#;
        let token: TokenResponse = serde_json::from_str(body).unwrap();
        let s = session_from_token(token, 1_000);
        assert_eq!(s.user.id, "u-1");
        assert_eq!(s.expires_at, Some(4_600));
        assert_eq!(s.refresh_token, "rt");
    }

    #[tokio::test]
    async fn no_cached_tokens_means_no_session() {
        let p = provider(Arc::new(MemoryTokenCache::new()));
        assert_eq!(p.get_current_session().await.unwrap(), None);
    }

    #[tokio::test]
    async fn sign_out_without_any_session_fails_locally() {
        let p = provider(Arc::new(MemoryTokenCache::new()));
        let err = p.sign_out().await.unwrap_err();
        assert_eq!(err.message, "Auth session missing!");
    }
}
