//! Adapters for the hosted Postgres store, spoken to over PostgREST.
//!
//! Tables: `products` (unique `new_code`), `profiles` (keyed by the identity
//! user id) and `audit_logs` (foreign key `user_id` to `profiles`).

mod audit_logs;
mod client;
mod products;
mod profiles;
mod rows;

pub use audit_logs::RestAuditLogRepository;
pub use client::{RestClient, RestError, RestSettings};
pub use products::RestProductRepository;
pub use profiles::RestProfileRepository;
