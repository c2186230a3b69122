//! WebSocket live channel.
//!
//! Responsibilities:
//! - validate upgrade requests against the configured origin allow-list
//! - require a signed-in session before upgrading
//! - hand the connection to a per-connection task that streams session and
//!   catalogue updates

use std::sync::Arc;

use actix_web::web::{self, Payload};
use actix_web::{
    HttpRequest, HttpResponse, get,
    http::header::{HeaderValue, ORIGIN},
};
use tracing::{error, info, warn};
use url::Url;

use crate::domain::Error;
use crate::domain::session::{ScopedIdentity, SessionManager};
use crate::inbound::http::session::{SessionContext, settle_session};
use crate::inbound::http::state::HttpState;

mod session;

pub mod messages;
pub mod state;

use state::WsState;

/// Upgrade `GET /ws` into the live channel.
#[get("/ws")]
pub async fn ws_entry(
    http: web::Data<HttpState>,
    ws: web::Data<WsState>,
    session: SessionContext,
    req: HttpRequest,
    stream: Payload,
) -> actix_web::Result<HttpResponse> {
    let mut origins = req.headers().get_all(ORIGIN);
    let origin = origins.next().ok_or_else(|| {
        warn!("missing Origin header on live channel upgrade");
        actix_web::error::ErrorForbidden("Origin not allowed")
    })?;
    if origins.next().is_some() {
        error!("multiple Origin headers on live channel upgrade");
        return Err(actix_web::error::ErrorBadRequest("Invalid Origin header"));
    }
    validate_origin(&ws, origin)?;

    // Settle first so refreshed tokens land in the cookie on the upgrade
    // response; the connection task cannot write cookies.
    let snapshot = settle_session(&http, &session).await?;
    let Some(profile) = snapshot.profile() else {
        return Err(Error::unauthorized("sign in required").into());
    };
    let user_id = profile.id;

    let identity = Arc::new(ScopedIdentity::new(
        Arc::clone(&http.identity),
        session.tokens()?,
    ));
    let manager = SessionManager::new(identity, Arc::clone(&http.resolver))
        .with_bootstrap_timeout(http.auth.bootstrap_timeout);
    let changes = ws.changes.subscribe();

    let (response, ws_session, messages) = actix_ws::handle(&req, stream).map_err(|error| {
        error!(%error, "live channel upgrade failed");
        actix_web::error::ErrorInternalServerError("WebSocket upgrade failed")
    })?;
    manager.start();
    info!(%user_id, "live channel opened");
    actix_web::rt::spawn(session::handle_ws_session(
        manager, changes, ws_session, messages,
    ));
    Ok(response)
}

fn validate_origin(ws: &WsState, header: &HeaderValue) -> actix_web::Result<()> {
    let raw = header.to_str().map_err(|error| {
        error!(%error, "Origin header is not visible ASCII");
        actix_web::error::ErrorBadRequest("Invalid Origin header")
    })?;
    let origin = Url::parse(raw).map_err(|error| {
        error!(%error, "Origin header is not a URL");
        actix_web::error::ErrorBadRequest("Invalid Origin header")
    })?;

    if ws.allows(&origin) {
        Ok(())
    } else {
        warn!(origin = raw, "rejected live channel upgrade from disallowed origin");
        Err(actix_web::error::ErrorForbidden("Origin not allowed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::FixtureChangeFeed;
    use actix_web::http::StatusCode;
    use rstest::{fixture, rstest};

    #[fixture]
    fn ws_state() -> WsState {
        WsState::new(
            Arc::new(FixtureChangeFeed),
            vec![
                Url::parse("https://stock.example.com").expect("url"),
                Url::parse("http://localhost:3000").expect("url"),
            ],
        )
    }

    #[rstest]
    #[case("https://stock.example.com")]
    #[case("https://stock.example.com:443")]
    #[case("http://localhost:3000")]
    fn accepts_configured_origins(ws_state: WsState, #[case] origin: &str) {
        let header = HeaderValue::from_str(origin).expect("header");
        assert!(validate_origin(&ws_state, &header).is_ok());
    }

    #[rstest]
    #[case("http://stock.example.com")]
    #[case("https://evil.example.com")]
    #[case("http://localhost:4000")]
    #[case("https://stock.example.com.evil.net")]
    fn rejects_other_origins(ws_state: WsState, #[case] origin: &str) {
        let header = HeaderValue::from_str(origin).expect("header");
        let error = validate_origin(&ws_state, &header).expect_err("rejected");
        assert_eq!(error.as_response_error().status_code(), StatusCode::FORBIDDEN);
    }

    #[rstest]
    fn rejects_unparsable_origins(ws_state: WsState) {
        for header in [
            HeaderValue::from_bytes(&[0x80]).expect("opaque header"),
            HeaderValue::from_static("not a url"),
        ] {
            let error = validate_origin(&ws_state, &header).expect_err("rejected");
            assert_eq!(
                error.as_response_error().status_code(),
                StatusCode::BAD_REQUEST
            );
        }
    }
}
