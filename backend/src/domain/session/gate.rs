//! Stateless role gate for dashboard views.

use crate::domain::Role;

use super::SessionSnapshot;

/// What a view should do for the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Session is still loading; show a spinner.
    Wait,
    /// Render the view.
    Render,
    /// Navigate to the given path.
    Redirect(String),
}

/// Allowed roles plus the path to send everyone else to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGate {
    allowed: Vec<Role>,
    fallback: String,
}

impl RoleGate {
    /// Gate admitting `allowed`; others go to `fallback`.
    pub fn new(allowed: impl Into<Vec<Role>>, fallback: impl Into<String>) -> Self {
        Self {
            allowed: allowed.into(),
            fallback: fallback.into(),
        }
    }

    /// Roles this gate admits.
    pub fn allowed(&self) -> &[Role] {
        &self.allowed
    }

    /// Path used for redirects.
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Decide for `snapshot`. Never redirects while loading.
    pub fn decide(&self, snapshot: &SessionSnapshot) -> GateDecision {
        if snapshot.is_loading {
            return GateDecision::Wait;
        }
        match snapshot.role() {
            Some(role) if self.allowed.contains(&role) => GateDecision::Render,
            _ => GateDecision::Redirect(self.fallback.clone()),
        }
    }
}
