//! Wire-level frames for the live channel.
//!
//! ```text
//! server: {"type":"session","phase":"authenticated","isLoading":false,"profile":{...}}
//! server: {"type":"catalogueChanged","kind":"updated","productId":"..."}
//! server: {"type":"resync"}
//! client: {"type":"refresh"}
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::ports::CatalogueChange;
use crate::inbound::http::auth::SessionPayload;

/// Frames pushed to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Session state changed.
    Session(SessionPayload),
    /// A product was written; refetch what is on screen.
    CatalogueChanged(CatalogueChange),
    /// Notifications were dropped; refetch everything.
    Resync,
}

/// Frames accepted from the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Resend the current session state.
    Refresh,
}
