//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **rest**: the hosted Postgres store over PostgREST
//! - **identity**: GoTrue-compatible OAuth gateway with PKCE
//! - **memory**: process-local stand-ins for development and tests
//!
//! Adapters translate between domain types and wire representations and
//! contain no business logic.

pub mod identity;
pub mod memory;
pub mod rest;
