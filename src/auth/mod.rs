//! Auth provider contract — sessions, identities, session-change events.
//!
//! DESIGN
//! ======
//! The synchronizer never talks to the hosted auth service directly. It
//! consumes the narrow `AuthProvider` trait below, which the GoTrue HTTP
//! client implements for production and test fakes implement in unit tests.
//! Session-change notifications are delivered over a `broadcast` channel so
//! any number of listeners can observe sign-in/sign-out transitions.

pub mod gotrue;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Capacity of the session-change broadcast channel.
pub const SESSION_EVENT_CAPACITY: usize = 16;

/// The provider's unique principal for an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Provider-side proof of authentication for one identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub identity: Identity,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds) after which the access token is invalid.
    pub expires_at: Option<i64>,
}

/// Session lifecycle notification emitted by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(Session),
    SignedOut,
    TokenRefreshed(Session),
}

impl SessionEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SignedIn(_) => "signed_in",
            Self::SignedOut => "signed_out",
            Self::TokenRefreshed(_) => "token_refreshed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("an account with this email already exists")]
    DuplicateIdentity,
    #[error("invalid login credentials")]
    InvalidCredentials,
    #[error("no active session")]
    NoSession,
    #[error("auth request failed: {0}")]
    Http(String),
    #[error("auth api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("unexpected auth response: {0}")]
    Decode(String),
}

/// Narrow interface onto the hosted authentication service.
#[async_trait::async_trait]
pub trait AuthProvider: Send + Sync {
    /// Return the currently held session, if one exists.
    async fn current_session(&self) -> Result<Option<Session>, ProviderError>;

    /// Create an account. Fails with `DuplicateIdentity` if the email is taken.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, ProviderError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Identity, ProviderError>;

    /// Invalidate the current session. A no-op when none is held.
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Subscribe to session-change events for the lifetime of the receiver.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}
