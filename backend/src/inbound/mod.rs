//! Inbound adapters that translate browser requests into domain service
//! calls while keeping framework details at the edge.
//!
//! [`http`] carries the sign-in flow and the REST API; [`ws`] pushes session
//! and catalogue changes to open dashboards.

pub mod http;
pub mod ws;
