//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Each port exposes a `thiserror` enum so adapters map their failures into
//! predictable variants, plus a fixture implementation for tests.

mod macros;
pub(crate) use macros::define_port_error;

mod audit_log_repository;
mod change_feed;
mod identity;
mod product_repository;
mod profile_repository;

#[cfg(test)]
pub use audit_log_repository::MockAuditLogRepository;
pub use audit_log_repository::{
    AuditLogRepository, AuditLogRepositoryError, FixtureAuditLogRepository,
};
#[cfg(test)]
pub use change_feed::MockChangeFeed;
pub use change_feed::{CatalogueChange, CatalogueChangeKind, ChangeFeed, FixtureChangeFeed};
#[cfg(test)]
pub use identity::{MockIdentityGateway, MockIdentityProvider};
pub use identity::{
    AuthorizationRequest, IdentityError, IdentityGateway, IdentityProvider, IdentityUser,
    ProviderSession, SessionEvent, SessionEventKind, SessionTokens,
};
#[cfg(test)]
pub use product_repository::MockProductRepository;
pub use product_repository::{
    FixtureProductRepository, ProductRepository, ProductRepositoryError,
};
#[cfg(test)]
pub use profile_repository::MockProfileRepository;
pub use profile_repository::{
    FixtureProfileRepository, ProfileRepository, ProfileRepositoryError,
};
