//! Sign-in, callback, sign-out and session inspection handlers.
//!
//! ```text
//! GET  /auth/sign-in?next=/products
//! GET  /auth/callback?code=...
//! POST /api/v1/auth/sign-out
//! GET  /api/v1/auth/session
//! ```

use std::sync::Arc;

use actix_web::http::header::LOCATION;
use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;
use utoipa::{IntoParams, ToSchema};

use crate::domain::session::{
    ProfileOrigin, ScopedIdentity, SessionManager, SessionSnapshot, map_identity_error,
};
use crate::domain::views::{LOGIN_PATH, PENDING_APPROVAL_PATH};
use crate::domain::{Error, Role, UserProfile};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::{PendingSignIn, SessionContext, safe_next, settle_session};
use crate::inbound::http::state::HttpState;

const CALLBACK_PATH: &str = "/auth/callback";
const AUTH_FAILED: &str = "auth_failed";

/// Query for `GET /auth/sign-in`.
#[derive(Debug, Deserialize, IntoParams)]
pub struct SignInQuery {
    /// Same-site path to land on after signing in.
    pub next: Option<String>,
}

/// Query the provider appends to the callback.
#[derive(Debug, Deserialize, IntoParams)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Session state as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    #[schema(example = "authenticated")]
    pub phase: String,
    pub is_loading: bool,
    pub profile: Option<UserProfile>,
}

impl From<&SessionSnapshot> for SessionPayload {
    fn from(snapshot: &SessionSnapshot) -> Self {
        Self {
            phase: snapshot.phase.name().to_owned(),
            is_loading: snapshot.is_loading,
            profile: snapshot.profile().cloned(),
        }
    }
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((LOCATION, location.to_owned()))
        .finish()
}

fn site_url(base: &Url, path: &str) -> Result<Url, Error> {
    base.join(path)
        .map_err(|err| Error::internal(format!("invalid redirect path {path}: {err}")))
}

fn login_redirect(base: &Url, message: Option<&str>) -> ApiResult<HttpResponse> {
    let mut url = site_url(base, LOGIN_PATH)?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("error", AUTH_FAILED);
        if let Some(message) = message {
            query.append_pair("message", message);
        }
    }
    Ok(redirect(url.as_str()))
}

/// Start OAuth sign-in and redirect to the provider.
#[utoipa::path(
    get,
    path = "/auth/sign-in",
    params(SignInQuery),
    responses(
        (status = 302, description = "Redirect to the identity provider"),
        (status = 503, description = "Identity provider unavailable", body = Error)
    ),
    tags = ["auth"],
    operation_id = "signIn",
    security([])
)]
#[get("/sign-in")]
pub async fn sign_in(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<SignInQuery>,
) -> ApiResult<HttpResponse> {
    let callback_url = site_url(&state.auth.public_base_url, CALLBACK_PATH)?;
    let request = state
        .identity
        .authorize(&callback_url)
        .map_err(map_identity_error)?;
    session.begin_sign_in(&PendingSignIn {
        code_verifier: request.code_verifier,
        next: safe_next(query.next.as_deref()),
    })?;
    Ok(redirect(request.url.as_str()))
}

/// Complete OAuth sign-in.
///
/// Exchanges the code, resolves or creates the local profile and redirects to
/// the remembered destination. Pending accounts land on the approval page;
/// failures land on the login page with `error=auth_failed`.
#[utoipa::path(
    get,
    path = "/auth/callback",
    params(CallbackQuery),
    responses(
        (status = 302, description = "Redirect after sign-in", headers(("Set-Cookie" = String, description = "Session cookie")))
    ),
    tags = ["auth"],
    operation_id = "authCallback",
    security([])
)]
#[get("/callback")]
pub async fn callback(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<CallbackQuery>,
) -> ApiResult<HttpResponse> {
    let base = &state.auth.public_base_url;
    let pending = session.take_sign_in();
    let CallbackQuery {
        code,
        error,
        error_description,
    } = query.into_inner();

    if let Some(error) = error {
        warn!(%error, "provider reported a sign-in failure");
        return login_redirect(base, Some(error_description.as_deref().unwrap_or(&error)));
    }
    let Some(code) = code else {
        return login_redirect(base, None);
    };
    let Some(pending) = pending else {
        return login_redirect(base, Some("sign-in expired, please try again"));
    };

    let provider_session = match state
        .identity
        .exchange_code(&code, &pending.code_verifier)
        .await
    {
        Ok(provider_session) => provider_session,
        Err(err) => {
            warn!(error = %err, "code exchange failed");
            return login_redirect(base, Some(&err.to_string()));
        }
    };

    let resolved = state.resolver.resolve(&provider_session.user).await;
    session.persist_tokens(&provider_session.tokens())?;
    info!(
        user_id = %resolved.profile.id,
        role = %resolved.profile.role,
        created = resolved.origin == ProfileOrigin::Created,
        "user signed in"
    );

    let destination = if resolved.profile.role == Role::Pending {
        PENDING_APPROVAL_PATH.to_owned()
    } else {
        pending.next
    };
    Ok(redirect(site_url(base, &destination)?.as_str()))
}

/// End the provider session and clear the cookie.
///
/// Provider failures are returned and the cookie is kept, so the client can
/// retry.
#[utoipa::path(
    post,
    path = "/api/v1/auth/sign-out",
    responses(
        (status = 204, description = "Signed out"),
        (status = 401, description = "Provider rejected the session", body = Error),
        (status = 503, description = "Identity provider unavailable", body = Error)
    ),
    tags = ["auth"],
    operation_id = "signOut"
)]
#[post("/auth/sign-out")]
pub async fn sign_out(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    let Some(tokens) = session.tokens()? else {
        return Ok(HttpResponse::NoContent().finish());
    };
    let user_id = tokens.user_id;
    let identity = Arc::new(ScopedIdentity::new(
        Arc::clone(&state.identity),
        Some(tokens),
    ));
    let manager = SessionManager::new(identity, Arc::clone(&state.resolver));
    manager.sign_out().await?;
    session.clear_tokens();
    info!(%user_id, "user signed out");
    Ok(HttpResponse::NoContent().finish())
}

/// Resolve the caller's session and profile.
#[utoipa::path(
    get,
    path = "/api/v1/auth/session",
    responses(
        (status = 200, description = "Settled session state", body = SessionPayload),
        (status = 500, description = "Internal server error", body = Error)
    ),
    tags = ["auth"],
    operation_id = "currentSession"
)]
#[get("/auth/session")]
pub async fn current_session(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<SessionPayload>> {
    let snapshot = settle_session(&state, &session).await?;
    Ok(web::Json(SessionPayload::from(&snapshot)))
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
