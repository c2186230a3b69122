//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they depend on
//! domain services and ports only, and stay testable without I/O.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::domain::ports::IdentityGateway;
use crate::domain::session::{DEFAULT_BOOTSTRAP_TIMEOUT, ProfileResolver};
use crate::domain::{AuditTrail, CatalogueService, ProductService, UserAdminService};
use crate::domain::import::ImportService;

/// Sign-in routing settings.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Externally visible base URL; the OAuth callback hangs off it.
    pub public_base_url: Url,
    /// Safety-net timeout for session bootstrap.
    pub bootstrap_timeout: Duration,
}

impl AuthSettings {
    pub fn new(public_base_url: Url) -> Self {
        Self {
            public_base_url,
            bootstrap_timeout: DEFAULT_BOOTSTRAP_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_bootstrap_timeout(mut self, timeout: Duration) -> Self {
        self.bootstrap_timeout = timeout;
        self
    }
}

/// Dependency bundle for HTTP handlers.
///
/// Services are cheap to clone; each holds `Arc`s to its ports.
#[derive(Clone)]
pub struct HttpState {
    pub products: ProductService,
    pub catalogue: CatalogueService,
    pub imports: ImportService,
    pub users: UserAdminService,
    pub audit: AuditTrail,
    pub identity: Arc<dyn IdentityGateway>,
    pub resolver: Arc<ProfileResolver>,
    pub auth: AuthSettings,
}
