//! Inventory server entry point.

mod server;

use actix_web::web;
use color_eyre::eyre::{Context, Result};
use mockable::DefaultEnv;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use invento::config::AppSettings;
use invento::inbound::http::health::HealthState;
use invento::inbound::http::session_config::{BuildMode, session_settings_from_env};
use server::{ServerConfig, build_states, create_server};

#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    if let Err(error) = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .try_init()
    {
        warn!(%error, "tracing init failed");
    }

    let settings = AppSettings::load_from_iter(std::env::args_os()).wrap_err("failed to load settings")?;
    let session = session_settings_from_env(&DefaultEnv::new(), BuildMode::from_debug_assertions())
        .wrap_err("invalid session configuration")?;
    let bind_addr = settings.bind_addr()?;
    let states = build_states(&settings)
        .await
        .wrap_err("failed to wire adapters")?;

    let health_state = web::Data::new(HealthState::new(states.backend));
    let server = create_server(
        health_state.clone(),
        states,
        ServerConfig::new(session, bind_addr),
    )
    .wrap_err_with(|| format!("failed to bind {bind_addr}"))?;
    info!(%bind_addr, "invento listening");

    let result = server.await;
    health_state.mark_unhealthy();
    result.wrap_err("server terminated")
}
