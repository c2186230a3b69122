//! Domain entities, services and ports.
//!
//! Purpose: keep inventory rules transport agnostic. Inbound adapters call
//! the services with an [`Actor`]; services reach storage, identity and
//! change notification through [`ports`].
//!
//! Public surface:
//! - Error / ErrorCode: API error payload and stable identifiers.
//! - Product, ProductDraft: catalogue entities.
//! - UserProfile, Role, Actor: local profiles and authorisation.
//! - import, session, catalogue: the import pipeline, session bootstrap and
//!   catalogue browsing.

pub mod audit;
pub mod catalogue;
pub mod error;
pub mod import;
pub mod ports;
pub mod product;
pub mod product_service;
pub mod role;
pub mod session;
pub mod user;
pub mod user_admin;
pub mod views;

pub use self::audit::{
    AuditAction, AuditActorSummary, AuditLogEntry, AuditTrail, NewAuditEntry,
};
pub use self::catalogue::{CatalogueCache, CatalogueQuery, CatalogueService, CatalogueStats, ProductPage};
pub use self::error::{Error, ErrorCode};
pub use self::product::{Product, ProductDraft, ProductId, ProductValidationError};
pub use self::product_service::ProductService;
pub use self::role::{Role, RoleParseError};
pub use self::user::{Actor, NewProfile, UserId, UserProfile, UserValidationError};
pub use self::user_admin::UserAdminService;
pub use self::views::View;

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use invento::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("admin role required"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
