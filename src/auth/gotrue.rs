//! GoTrue-compatible auth REST client.
//!
//! Thin HTTP wrapper for `{AUTH_URL}/auth/v1`. Holds the current session in
//! memory and broadcasts a `SessionEvent` on every transition. Payload
//! parsing lives in pure functions for testability.

use std::time::Duration;

use serde::Deserialize;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{AuthProvider, Identity, ProviderError, SESSION_EVENT_CAPACITY, Session, SessionEvent};
use crate::config::AuthConfig;

const AUTH_PATH: &str = "/auth/v1";

// =============================================================================
// CLIENT
// =============================================================================

pub struct GoTrueClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
}

impl GoTrueClient {
    /// Build a client from auth config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &AuthConfig) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ProviderError::Http(e.to_string()))?;
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Ok(Self {
            http,
            base_url: format!("{}{AUTH_PATH}", config.url.trim_end_matches('/')),
            anon_key: config.anon_key.clone(),
            session: RwLock::new(None),
            events,
        })
    }

    /// Seed the client with a previously persisted session.
    #[must_use]
    pub fn with_session(self, session: Session) -> Self {
        Self { session: RwLock::new(Some(session)), ..self }
    }

    /// Exchange the held refresh token for a fresh session.
    ///
    /// # Errors
    ///
    /// Returns `NoSession` if no refresh token is held, or the API error.
    pub async fn refresh_session(&self) -> Result<Session, ProviderError> {
        let refresh_token = self
            .session
            .read()
            .await
            .as_ref()
            .and_then(|s| s.refresh_token.clone())
            .ok_or(ProviderError::NoSession)?;

        let body = self
            .post(
                "/token?grant_type=refresh_token",
                &serde_json::json!({ "refresh_token": refresh_token }),
                None,
            )
            .await?;
        let session = parse_session(&body, unix_now())?;
        *self.session.write().await = Some(session.clone());
        self.emit(SessionEvent::TokenRefreshed(session.clone()));
        Ok(session)
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
        bearer: Option<&str>,
    ) -> Result<String, ProviderError> {
        let bearer = bearer.unwrap_or(&self.anon_key);
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {bearer}"))
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(parse_error(status, &text));
        }
        Ok(text)
    }

    async fn store_session(&self, session: Session) {
        *self.session.write().await = Some(session.clone());
        self.emit(SessionEvent::SignedIn(session));
    }

    fn emit(&self, event: SessionEvent) {
        debug!(event = event.name(), "auth session event");
        // No receivers is not an error.
        let _ = self.events.send(event);
    }
}

#[async_trait::async_trait]
impl AuthProvider for GoTrueClient {
    async fn current_session(&self) -> Result<Option<Session>, ProviderError> {
        Ok(self.session.read().await.clone())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        let body = self
            .post("/signup", &serde_json::json!({ "email": email, "password": password }), None)
            .await?;
        let (identity, session) = parse_sign_up(&body, unix_now())?;
        match session {
            Some(session) => self.store_session(session).await,
            None => debug!(user_id = %identity.id, "sign-up pending email confirmation; no session issued"),
        }
        Ok(identity)
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Identity, ProviderError> {
        let body = self
            .post(
                "/token?grant_type=password",
                &serde_json::json!({ "email": email, "password": password }),
                None,
            )
            .await?;
        let session = parse_session(&body, unix_now())?;
        let identity = session.identity.clone();
        self.store_session(session).await;
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };
        self.emit(SessionEvent::SignedOut);

        match self
            .post("/logout", &serde_json::json!({}), Some(&session.access_token))
            .await
        {
            Ok(_) => Ok(()),
            // The server already considers the token dead.
            Err(ProviderError::Api { status: 401 | 403 | 404, .. }) => Ok(()),
            Err(e) => {
                warn!(error = %e, "remote logout failed; local session cleared");
                Err(e)
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

fn unix_now() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Deserialize)]
struct UserPayload {
    id: Uuid,
    email: Option<String>,
}

#[derive(Deserialize)]
struct SessionPayload {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: UserPayload,
}

/// Sign-up returns a full session, or just the user when email
/// confirmation is required.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpPayload {
    Session(SessionPayload),
    User(UserPayload),
}

#[derive(Deserialize, Default)]
struct ErrorPayload {
    error_code: Option<String>,
    error: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

// =============================================================================
// PARSING
// =============================================================================

impl From<UserPayload> for Identity {
    fn from(u: UserPayload) -> Self {
        Self { id: u.id, email: u.email }
    }
}

fn session_from_payload(p: SessionPayload, now: i64) -> Session {
    let expires_at = p.expires_at.or_else(|| p.expires_in.map(|secs| now + secs));
    Session {
        identity: p.user.into(),
        access_token: p.access_token,
        refresh_token: p.refresh_token,
        expires_at,
    }
}

fn parse_session(json: &str, now: i64) -> Result<Session, ProviderError> {
    let payload: SessionPayload = serde_json::from_str(json).map_err(|e| ProviderError::Decode(e.to_string()))?;
    Ok(session_from_payload(payload, now))
}

fn parse_sign_up(json: &str, now: i64) -> Result<(Identity, Option<Session>), ProviderError> {
    let payload: SignUpPayload = serde_json::from_str(json).map_err(|e| ProviderError::Decode(e.to_string()))?;
    Ok(match payload {
        SignUpPayload::Session(p) => {
            let session = session_from_payload(p, now);
            (session.identity.clone(), Some(session))
        }
        SignUpPayload::User(u) => (u.into(), None),
    })
}

/// Map a non-2xx auth response onto the provider error taxonomy.
fn parse_error(status: u16, body: &str) -> ProviderError {
    let payload: ErrorPayload = serde_json::from_str(body).unwrap_or_default();
    let code = payload.error_code.or(payload.error).unwrap_or_default();
    let message = payload
        .msg
        .or(payload.message)
        .or(payload.error_description)
        .unwrap_or_else(|| body.trim().to_string());

    let lowered = message.to_ascii_lowercase();
    if matches!(code.as_str(), "user_already_exists" | "email_exists")
        || lowered.contains("already registered")
        || lowered.contains("already exists")
    {
        return ProviderError::DuplicateIdentity;
    }
    if matches!(code.as_str(), "invalid_credentials" | "invalid_grant") {
        return ProviderError::InvalidCredentials;
    }
    ProviderError::Api { status, message }
}

#[cfg(test)]
#[path = "gotrue_test.rs"]
mod tests;
