//! HTTP server configuration object.

use std::net::SocketAddr;

use invento::inbound::http::session_config::SessionSettings;

/// Everything `create_server` needs besides the adapter wiring.
pub struct ServerConfig {
    pub(crate) session: SessionSettings,
    pub(crate) bind_addr: SocketAddr,
}

impl ServerConfig {
    #[must_use]
    pub fn new(session: SessionSettings, bind_addr: SocketAddr) -> Self {
        Self { session, bind_addr }
    }
}
