//! Cookie session helpers and the authenticated-user extractor.
//!
//! The cookie holds provider tokens, never profile data: every request
//! re-resolves the account through the identity gateway so revoked sessions
//! and role changes take effect immediately.

use std::sync::Arc;

use actix_session::Session;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::ports::{IdentityProvider as _, SessionTokens};
use crate::domain::session::{
    ScopedIdentity, SessionManager, SessionSnapshot, map_identity_error,
};
use crate::domain::{Actor, Error, UserProfile};

use super::state::HttpState;

pub(crate) const TOKENS_KEY: &str = "tokens";
pub(crate) const SIGN_IN_KEY: &str = "sign_in";

/// State kept between redirecting to the provider and its callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSignIn {
    pub code_verifier: String,
    pub next: String,
}

/// Newtype wrapper that exposes higher-level session operations.
#[derive(Clone)]
pub struct SessionContext(Session);

impl SessionContext {
    /// Construct a new wrapper from the underlying Actix session.
    pub fn new(session: Session) -> Self {
        Self(session)
    }

    /// Persist provider tokens for later requests.
    pub fn persist_tokens(&self, tokens: &SessionTokens) -> Result<(), Error> {
        self.0
            .insert(TOKENS_KEY, tokens)
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Stored tokens; unreadable cookies count as signed out.
    pub fn tokens(&self) -> Result<Option<SessionTokens>, Error> {
        match self.0.get::<SessionTokens>(TOKENS_KEY) {
            Ok(tokens) => Ok(tokens),
            Err(error) => {
                warn!(%error, "discarding unreadable session tokens");
                self.0.remove(TOKENS_KEY);
                Ok(None)
            }
        }
    }

    pub fn clear_tokens(&self) {
        self.0.remove(TOKENS_KEY);
    }

    /// Remember the PKCE verifier and post-login destination.
    pub fn begin_sign_in(&self, pending: &PendingSignIn) -> Result<(), Error> {
        self.0
            .insert(SIGN_IN_KEY, pending)
            .map_err(|error| Error::internal(format!("failed to persist session: {error}")))
    }

    /// Take the pending sign-in, leaving none behind.
    pub fn take_sign_in(&self) -> Option<PendingSignIn> {
        match self.0.remove_as::<PendingSignIn>(SIGN_IN_KEY) {
            Some(Ok(pending)) => Some(pending),
            Some(Err(raw)) => {
                warn!(len = raw.len(), "discarding unreadable pending sign-in");
                None
            }
            None => None,
        }
    }

    /// Store `current` when a refresh replaced the tokens we started with.
    fn sync_tokens(
        &self,
        original: Option<&SessionTokens>,
        current: Option<SessionTokens>,
    ) -> Result<(), Error> {
        if original == current.as_ref() {
            return Ok(());
        }
        match current {
            Some(tokens) => self.persist_tokens(&tokens),
            None => {
                self.clear_tokens();
                Ok(())
            }
        }
    }
}

impl FromRequest for SessionContext {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let fut = Session::from_request(req, payload);
        Box::pin(async move { fut.await.map(SessionContext::new) })
    }
}

/// Only same-site paths are accepted as post-login destinations.
pub(crate) fn safe_next(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_owned()
        }
        _ => "/".to_owned(),
    }
}

/// Run session bootstrap for the requesting client and wait for it to settle.
pub(crate) async fn settle_session(
    state: &HttpState,
    session: &SessionContext,
) -> Result<SessionSnapshot, Error> {
    let tokens = session.tokens()?;
    let identity = Arc::new(ScopedIdentity::new(
        Arc::clone(&state.identity),
        tokens.clone(),
    ));
    let manager = SessionManager::new(identity.clone(), Arc::clone(&state.resolver))
        .with_bootstrap_timeout(state.auth.bootstrap_timeout);
    manager.start();
    let snapshot = manager.settled().await;
    manager.teardown();
    session.sync_tokens(tokens.as_ref(), identity.tokens())?;
    Ok(snapshot)
}

/// The signed-in user making the request.
///
/// Extraction fails with `401` when no valid provider session exists. Role
/// checks are left to the services.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub actor: Actor,
    pub profile: UserProfile,
}

async fn resolve_current_user(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> Result<CurrentUser, Error> {
    let tokens = session
        .tokens()?
        .ok_or_else(|| Error::unauthorized("sign in required"))?;
    let identity = ScopedIdentity::new(Arc::clone(&state.identity), Some(tokens.clone()));
    let provider_session = identity
        .current_session()
        .await
        .map_err(map_identity_error)?;
    session.sync_tokens(Some(&tokens), identity.tokens())?;
    let provider_session =
        provider_session.ok_or_else(|| Error::unauthorized("session expired"))?;
    let resolved = state.resolver.resolve(&provider_session.user).await;
    Ok(CurrentUser {
        actor: Actor::from_profile(&resolved.profile),
        profile: resolved.profile,
    })
}

impl FromRequest for CurrentUser {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<HttpState>>().cloned();
        let session = SessionContext::from_request(req, payload);
        Box::pin(async move {
            let state = state.ok_or_else(|| {
                actix_web::Error::from(Error::internal("HTTP state is not configured"))
            })?;
            let session = session.await?;
            resolve_current_user(state, session)
                .await
                .map_err(actix_web::Error::from)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use actix_web::{App, HttpResponse};
    use rstest::rstest;

    #[rstest]
    #[case(None, "/")]
    #[case(Some("/products?page=2"), "/products?page=2")]
    #[case(Some("//evil.example"), "/")]
    #[case(Some("https://evil.example"), "/")]
    #[case(Some("/\\evil.example"), "/")]
    fn next_paths_stay_on_site(#[case] next: Option<&str>, #[case] expected: &str) {
        assert_eq!(safe_next(next), expected);
    }

    #[actix_web::test]
    async fn round_trips_tokens_and_pending_sign_in() {
        let tokens = SessionTokens {
            user_id: UserId::random(),
            access_token: "at".into(),
            refresh_token: Some("rt".into()),
        };
        let expected = tokens.clone();
        let app = actix_test::init_service(
            App::new()
                .wrap(crate::inbound::http::test_utils::test_session_middleware())
                .route(
                    "/set",
                    web::get().to(move |session: SessionContext| {
                        let tokens = tokens.clone();
                        async move {
                            session.persist_tokens(&tokens)?;
                            session.begin_sign_in(&PendingSignIn {
                                code_verifier: "v".into(),
                                next: "/products".into(),
                            })?;
                            Ok::<_, Error>(HttpResponse::Ok())
                        }
                    }),
                )
                .route(
                    "/get",
                    web::get().to(|session: SessionContext| async move {
                        let first = session.take_sign_in();
                        let second = session.take_sign_in();
                        let tokens = session.tokens()?;
                        Ok::<_, Error>(HttpResponse::Ok().json((first, second, tokens)))
                    }),
                ),
        )
        .await;

        let set_res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/set").to_request(),
        )
        .await;
        let cookie = set_res
            .response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .expect("session cookie set")
            .into_owned();
        let get_res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/get").cookie(cookie).to_request(),
        )
        .await;
        assert_eq!(get_res.status(), StatusCode::OK);

        let (first, second, stored): (
            Option<PendingSignIn>,
            Option<PendingSignIn>,
            Option<SessionTokens>,
        ) = actix_test::read_body_json(get_res).await;
        assert_eq!(first.map(|pending| pending.next).as_deref(), Some("/products"));
        assert!(second.is_none());
        assert_eq!(stored, Some(expected));
    }

    #[actix_web::test]
    async fn tampered_tokens_read_as_signed_out() {
        let app = actix_test::init_service(
            App::new()
                .wrap(crate::inbound::http::test_utils::test_session_middleware())
                .route(
                    "/set-invalid",
                    web::get().to(|session: Session| async move {
                        session.insert(TOKENS_KEY, "not-tokens").expect("insert");
                        HttpResponse::Ok()
                    }),
                )
                .route(
                    "/get",
                    web::get().to(|session: SessionContext| async move {
                        let present = session.tokens()?.is_some();
                        Ok::<_, Error>(HttpResponse::Ok().json(present))
                    }),
                ),
        )
        .await;

        let set_res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/set-invalid").to_request(),
        )
        .await;
        let cookie = set_res
            .response()
            .cookies()
            .find(|cookie| cookie.name() == "session")
            .expect("session cookie set")
            .into_owned();
        let res = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/get").cookie(cookie).to_request(),
        )
        .await;
        let present: bool = actix_test::read_body_json(res).await;
        assert!(!present);
    }
}
