//! Dashboard views and who may open them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Role;
use crate::domain::session::{GateDecision, RoleGate, SessionSnapshot};

/// Where unauthenticated visitors are sent.
pub const LOGIN_PATH: &str = "/login";
/// Where signed-in accounts awaiting approval are sent.
pub const PENDING_APPROVAL_PATH: &str = "/pending-approval";

/// A dashboard view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    Dashboard,
    Products,
    ProductDetail,
    ProductCreate,
    ProductEdit,
    Import,
    Users,
    PendingApproval,
}

impl View {
    /// Every view.
    pub const ALL: [Self; 8] = [
        Self::Dashboard,
        Self::Products,
        Self::ProductDetail,
        Self::ProductCreate,
        Self::ProductEdit,
        Self::Import,
        Self::Users,
        Self::PendingApproval,
    ];

    /// URL slug.
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Products => "products",
            Self::ProductDetail => "product-detail",
            Self::ProductCreate => "product-create",
            Self::ProductEdit => "product-edit",
            Self::Import => "import",
            Self::Users => "users",
            Self::PendingApproval => "pending-approval",
        }
    }

    /// Gate guarding this view.
    pub fn gate(self) -> RoleGate {
        const BROWSE: [Role; 2] = [Role::Admin, Role::Readonly];
        match self {
            Self::Dashboard | Self::Products | Self::ProductDetail => {
                RoleGate::new(BROWSE, PENDING_APPROVAL_PATH)
            }
            Self::ProductCreate | Self::ProductEdit | Self::Import => {
                RoleGate::new([Role::Admin], "/products")
            }
            Self::Users => RoleGate::new([Role::Admin], "/"),
            Self::PendingApproval => RoleGate::new([Role::Pending], "/"),
        }
    }

    /// Decide access for `snapshot`. Settled sessions without a profile go
    /// to the login page.
    pub fn decide(self, snapshot: &SessionSnapshot) -> GateDecision {
        if !snapshot.is_loading && !snapshot.is_authenticated() {
            return GateDecision::Redirect(LOGIN_PATH.to_owned());
        }
        self.gate().decide(snapshot)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Error for unknown view slugs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown view '{0}'")]
pub struct UnknownView(pub String);

impl FromStr for View {
    type Err = UnknownView;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|view| view.slug() == value)
            .ok_or_else(|| UnknownView(value.to_owned()))
    }
}
