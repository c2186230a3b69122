//! Authorisation roles assigned to user profiles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Role held by a user profile.
///
/// - `admin` has full access to catalogue, import, user, and audit features.
/// - `readonly` may browse and search the catalogue.
/// - `pending` has no access until an administrator approves the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access.
    Admin,
    /// Browse and search only.
    Readonly,
    /// Awaiting approval; no access.
    Pending,
}

/// Error returned when parsing an unknown role name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'; expected admin|readonly|pending")]
pub struct RoleParseError(pub String);

impl Role {
    /// Every role, most privileged first.
    pub const ALL: [Self; 3] = [Self::Admin, Self::Readonly, Self::Pending];

    /// Stable wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Readonly => "readonly",
            Self::Pending => "pending",
        }
    }

    /// Whether this role may read the catalogue.
    pub const fn can_browse(self) -> bool {
        matches!(self, Self::Admin | Self::Readonly)
    }

    /// Whether this role may perform administrative mutations.
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "readonly" | "read_only" | "read-only" => Ok(Self::Readonly),
            "pending" => Ok(Self::Pending),
            _ => Err(RoleParseError(value.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("admin", Role::Admin)]
    #[case(" READONLY ", Role::Readonly)]
    #[case("read-only", Role::Readonly)]
    #[case("pending", Role::Pending)]
    fn parses_known_roles(#[case] raw: &str, #[case] expected: Role) {
        assert_eq!(raw.parse::<Role>(), Ok(expected));
    }

    #[rstest]
    fn rejects_unknown_roles() {
        let err = "owner".parse::<Role>().expect_err("unknown role");
        assert_eq!(err, RoleParseError("owner".to_owned()));
    }

    #[rstest]
    #[case(Role::Admin, true, true)]
    #[case(Role::Readonly, true, false)]
    #[case(Role::Pending, false, false)]
    fn capabilities_follow_role(#[case] role: Role, #[case] browse: bool, #[case] admin: bool) {
        assert_eq!(role.can_browse(), browse);
        assert_eq!(role.is_admin(), admin);
    }

    #[rstest]
    fn wire_names_round_trip_through_serde() {
        for role in Role::ALL {
            let json = serde_json::to_string(&role).expect("serialise role");
            assert_eq!(json, format!("\"{}\"", role.as_str()));
        }
    }
}
