//! Identity gateway adapters.

mod http;
pub(crate) mod pkce;

pub use http::{HttpIdentityGateway, HttpIdentitySettings};

/// Buffered session notifications per gateway.
pub(crate) const EVENT_CAPACITY: usize = 64;
