//! Identity gateway for a GoTrue-compatible auth service.
//!
//! Sign-in uses the OAuth PKCE flow: [`IdentityGateway::authorize`] returns
//! the provider URL plus a verifier the caller must keep until the callback
//! hands back a code.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::ports::{
    AuthorizationRequest, IdentityError, IdentityGateway, IdentityUser, ProviderSession,
    SessionEvent, SessionEventKind, SessionTokens,
};
use crate::domain::UserId;

use super::pkce;
use super::EVENT_CAPACITY;

/// Settings for [`HttpIdentityGateway`].
#[derive(Debug, Clone)]
pub struct HttpIdentitySettings {
    /// Project base URL; endpoints live under `/auth/v1`.
    pub base_url: Url,
    /// Public API key sent as `apikey`.
    pub api_key: String,
    /// OAuth provider name, e.g. `google`.
    pub provider: String,
    pub timeout: Duration,
}

/// [`IdentityGateway`] speaking the GoTrue REST protocol.
pub struct HttpIdentityGateway {
    client: Client,
    settings: HttpIdentitySettings,
    events: broadcast::Sender<SessionEvent>,
}

#[derive(Debug, Deserialize)]
struct UserMetadata {
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    id: uuid::Uuid,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<UserMetadata>,
}

impl UserBody {
    fn into_domain(self) -> IdentityUser {
        let display_name = self
            .user_metadata
            .and_then(|meta| meta.full_name.or(meta.name));
        IdentityUser {
            id: UserId::from_uuid(self.id),
            email: self.email.unwrap_or_default(),
            display_name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: UserBody,
}

impl TokenBody {
    fn into_session(self) -> ProviderSession {
        ProviderSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self
                .expires_at
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
            user: self.user.into_domain(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl HttpIdentityGateway {
    /// Build a gateway with a bounded request timeout.
    ///
    /// # Errors
    ///
    /// Returns the reqwest error when the client cannot be constructed.
    pub fn new(settings: HttpIdentitySettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            client,
            settings,
            events,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        self.settings
            .base_url
            .join(&format!("auth/v1/{path}"))
            .map_err(|err| IdentityError::connection(format!("invalid auth URL: {err}")))
    }

    fn post(&self, url: Url) -> RequestBuilder {
        self.client
            .post(url)
            .header("apikey", self.settings.api_key.as_str())
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<ProviderSession, IdentityError> {
        let mut url = self.endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        let request = self.post(url).json(&body);
        let token: TokenBody = send_json(request, IdentityError::rejected).await?;
        Ok(token.into_session())
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("no session listeners");
        }
    }
}

#[async_trait]
impl IdentityGateway for HttpIdentityGateway {
    fn authorize(&self, redirect_to: &Url) -> Result<AuthorizationRequest, IdentityError> {
        let code_verifier = pkce::generate_verifier();
        let mut url = self.endpoint("authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", &self.settings.provider)
            .append_pair("redirect_to", redirect_to.as_str())
            .append_pair("code_challenge", &pkce::challenge(&code_verifier))
            .append_pair("code_challenge_method", "s256");
        Ok(AuthorizationRequest { url, code_verifier })
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<ProviderSession, IdentityError> {
        let session = self
            .token_grant(
                "pkce",
                json!({ "auth_code": code, "code_verifier": code_verifier }),
            )
            .await?;
        debug!(user_id = %session.user.id, "exchanged authorisation code");
        self.emit(SessionEvent::with_session(
            SessionEventKind::SignedIn,
            session.clone(),
        ));
        Ok(session)
    }

    async fn session_for_token(
        &self,
        access_token: &str,
    ) -> Result<ProviderSession, IdentityError> {
        let url = self.endpoint("user")?;
        let request = self
            .client
            .get(url)
            .header("apikey", self.settings.api_key.as_str())
            .header(AUTHORIZATION, format!("Bearer {access_token}"));
        let user: UserBody = send_json(request, IdentityError::invalid_session).await?;
        Ok(ProviderSession {
            access_token: access_token.to_owned(),
            refresh_token: None,
            expires_at: None,
            user: user.into_domain(),
        })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<ProviderSession, IdentityError> {
        let session = self
            .token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await?;
        self.emit(SessionEvent::with_session(
            SessionEventKind::TokenRefreshed,
            session.clone(),
        ));
        Ok(session)
    }

    async fn sign_out(&self, tokens: &SessionTokens) -> Result<(), IdentityError> {
        let url = self.endpoint("logout")?;
        let response = self
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", tokens.access_token))
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        // An expired token has nothing left to revoke.
        if !status.is_success() && status != StatusCode::UNAUTHORIZED {
            let body = response.bytes().await.map_err(map_transport_error)?;
            return Err(map_status_error(status, &body, IdentityError::rejected));
        }
        self.emit(SessionEvent::signed_out(tokens.user_id));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

async fn send_json<T, F>(request: RequestBuilder, client_error: F) -> Result<T, IdentityError>
where
    T: serde::de::DeserializeOwned,
    F: Fn(String) -> IdentityError,
{
    let response = request.send().await.map_err(map_transport_error)?;
    let status = response.status();
    let body = response.bytes().await.map_err(map_transport_error)?;
    if !status.is_success() {
        return Err(map_status_error(status, &body, client_error));
    }
    serde_json::from_slice(&body).map_err(|err| {
        IdentityError::connection(format!("malformed identity response: {err}"))
    })
}

fn map_transport_error(error: reqwest::Error) -> IdentityError {
    if error.is_timeout() {
        IdentityError::connection("identity request timed out")
    } else {
        IdentityError::connection(error.to_string())
    }
}

fn map_status_error<F>(status: StatusCode, body: &[u8], client_error: F) -> IdentityError
where
    F: Fn(String) -> IdentityError,
{
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.error_description.or(body.msg).or(body.message))
        .unwrap_or_else(|| format!("status {}", status.as_u16()));
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        IdentityError::connection(message)
    } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        IdentityError::invalid_session(message)
    } else {
        client_error(message)
    }
}
