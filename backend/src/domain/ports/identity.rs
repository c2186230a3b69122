//! Ports for the hosted identity provider.
//!
//! [`IdentityGateway`] is the server-wide adapter: it builds authorisation
//! URLs, exchanges codes, validates and refreshes tokens and signs sessions
//! out. [`IdentityProvider`] is the view a single client has of its own
//! session, which is what session bootstrap consumes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use url::Url;

use crate::domain::UserId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by identity adapters.
    pub enum IdentityError {
        /// The provider could not be reached.
        Connection { message } =>
            "identity provider unavailable: {message}",
        /// The provider refused the request (bad code, bad verifier).
        Rejected { message } =>
            "identity provider rejected the request: {message}",
        /// The presented token is expired or unknown.
        InvalidSession { message } => "session is not valid: {message}",
    }
}

/// Account details reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityUser {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl IdentityUser {
    /// Display name, else the e-mail local part, else `User`.
    pub fn preferred_name(&self) -> String {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .or_else(|| {
                self.email
                    .split('@')
                    .next()
                    .map(str::trim)
                    .filter(|local| !local.is_empty())
            })
            .unwrap_or("User")
            .to_owned()
    }
}

/// Tokens a client keeps between requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
    pub user_id: UserId,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// An authenticated provider session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: IdentityUser,
}

impl ProviderSession {
    /// Tokens to persist for this session.
    pub fn tokens(&self) -> SessionTokens {
        SessionTokens {
            user_id: self.user.id,
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }
}

/// Kind of provider notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// A provider session notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    pub user_id: UserId,
    /// The new session; absent for sign-out.
    pub session: Option<ProviderSession>,
}

impl SessionEvent {
    /// Event for a session that was created or refreshed.
    pub fn with_session(kind: SessionEventKind, session: ProviderSession) -> Self {
        Self {
            kind,
            user_id: session.user.id,
            session: Some(session),
        }
    }

    /// Event for a session that ended.
    pub fn signed_out(user_id: UserId) -> Self {
        Self {
            kind: SessionEventKind::SignedOut,
            user_id,
            session: None,
        }
    }
}

/// Where to send the browser, plus the PKCE verifier to keep until callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub code_verifier: String,
}

/// Server-wide identity adapter.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// Start an OAuth sign-in that returns to `redirect_to`.
    fn authorize(&self, redirect_to: &Url) -> Result<AuthorizationRequest, IdentityError>;

    /// Exchange an authorisation code for a session.
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<ProviderSession, IdentityError>;

    /// Resolve the session an access token belongs to.
    async fn session_for_token(&self, access_token: &str)
    -> Result<ProviderSession, IdentityError>;

    /// Trade a refresh token for a new session.
    async fn refresh(&self, refresh_token: &str) -> Result<ProviderSession, IdentityError>;

    /// End the session identified by `tokens`.
    async fn sign_out(&self, tokens: &SessionTokens) -> Result<(), IdentityError>;

    /// Notifications for every session this gateway touches.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}

/// A single client's view of its provider session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The current session, or `None` when signed out.
    async fn current_session(&self) -> Result<Option<ProviderSession>, IdentityError>;

    /// End the current session.
    async fn sign_out(&self) -> Result<(), IdentityError>;

    /// Notifications concerning this client's account.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}
