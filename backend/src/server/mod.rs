//! Server construction and middleware wiring.

mod config;
mod state_builders;

pub use config::ServerConfig;
pub use state_builders::{AppStates, StartupError, build_states};

use actix_session::{
    SessionMiddleware,
    config::{CookieContentSecurity, PersistentSession},
    storage::CookieSessionStore,
};
use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpServer, web};

use invento::Trace;
#[cfg(debug_assertions)]
use invento::doc::ApiDoc;
use invento::inbound::http::health::{HealthState, live, ready};
use invento::inbound::http::session_config::{SESSION_COOKIE_NAME, SessionSettings};
use invento::inbound::http::state::HttpState;
use invento::inbound::http::{configure_api, configure_auth};
use invento::inbound::ws;
use invento::inbound::ws::state::WsState;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    ws_state: web::Data<WsState>,
    session: SessionSettingsParts,
}

#[derive(Clone)]
struct SessionSettingsParts {
    key: actix_web::cookie::Key,
    cookie_secure: bool,
    same_site: actix_web::cookie::SameSite,
    ttl_secs: i64,
}

impl From<SessionSettings> for SessionSettingsParts {
    fn from(settings: SessionSettings) -> Self {
        Self {
            key: settings.key,
            cookie_secure: settings.cookie_secure,
            same_site: settings.same_site,
            ttl_secs: i64::try_from(settings.ttl.as_secs()).unwrap_or(i64::MAX),
        }
    }
}

fn session_middleware(parts: SessionSettingsParts) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), parts.key)
        .cookie_name(SESSION_COOKIE_NAME.to_owned())
        .cookie_path("/".into())
        .cookie_secure(parts.cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(parts.same_site)
        .session_lifecycle(
            PersistentSession::default()
                .session_ttl(actix_web::cookie::time::Duration::seconds(parts.ttl_secs)),
        )
        .build()
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        ws_state,
        session,
    } = deps;

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(ws_state)
        .service(web::scope("/auth").configure(configure_auth))
        .service(web::scope("/api/v1").configure(configure_api))
        .service(ws::ws_entry)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // Registered last so the trace scope wraps the session middleware too.
    app.wrap(session_middleware(session)).wrap(Trace)
}

/// Construct the HTTP server over prepared handler state.
///
/// # Errors
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    states: AppStates,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let ServerConfig { session, bind_addr } = config;
    let session = SessionSettingsParts::from(session);
    let http_state = web::Data::new(states.http);
    let ws_state = web::Data::new(states.ws);
    let server_health_state = health_state.clone();

    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            ws_state: ws_state.clone(),
            session: session.clone(),
        })
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
