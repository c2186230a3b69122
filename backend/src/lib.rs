//! Inventory backend: product catalogue, CSV import, role-gated sessions
//! and an audit trail over a hosted store or in-process adapters.

pub mod config;
pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
