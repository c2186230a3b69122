//! Shared WebSocket adapter state.

use std::sync::Arc;

use url::Url;

use crate::domain::ports::ChangeFeed;

/// Dependencies of the live channel beyond the HTTP state.
#[derive(Clone)]
pub struct WsState {
    pub changes: Arc<dyn ChangeFeed>,
    /// Browser origins permitted to open the channel.
    pub allowed_origins: Arc<[Url]>,
}

impl WsState {
    pub fn new(changes: Arc<dyn ChangeFeed>, allowed_origins: Vec<Url>) -> Self {
        Self {
            changes,
            allowed_origins: allowed_origins.into(),
        }
    }

    /// Whether `origin` matches an allowed origin by scheme, host and port.
    pub fn allows(&self, origin: &Url) -> bool {
        let origin = origin.origin();
        self.allowed_origins
            .iter()
            .any(|allowed| allowed.origin() == origin)
    }
}
