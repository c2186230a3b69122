//! Session phases and the snapshot observers receive.

use crate::domain::{Role, UserProfile};

/// Where session bootstrap currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing has been checked yet.
    Uninitialized,
    /// Waiting for the provider to report the current session.
    CheckingSession,
    /// A session exists; the local profile is being fetched or created.
    ResolvingProfile,
    /// Signed in with a resolved profile.
    Authenticated(UserProfile),
    /// No provider session.
    Unauthenticated,
}

impl SessionPhase {
    /// Stable name for logs and payloads.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::CheckingSession => "checking_session",
            Self::ResolvingProfile => "resolving_profile",
            Self::Authenticated(_) => "authenticated",
            Self::Unauthenticated => "unauthenticated",
        }
    }
}

/// Observable session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub is_loading: bool,
}

impl SessionSnapshot {
    /// State before `start`: uninitialised and loading.
    pub const fn initial() -> Self {
        Self {
            phase: SessionPhase::Uninitialized,
            is_loading: true,
        }
    }

    pub(crate) const fn loading(phase: SessionPhase) -> Self {
        Self {
            phase,
            is_loading: true,
        }
    }

    /// Settled, signed-out state.
    pub const fn unauthenticated() -> Self {
        Self {
            phase: SessionPhase::Unauthenticated,
            is_loading: false,
        }
    }

    /// Settled, signed-in state.
    pub const fn authenticated(profile: UserProfile) -> Self {
        Self {
            phase: SessionPhase::Authenticated(profile),
            is_loading: false,
        }
    }

    /// Whether a profile has been resolved.
    pub fn is_authenticated(&self) -> bool {
        matches!(self.phase, SessionPhase::Authenticated(_))
    }

    /// The resolved profile, if any.
    pub fn profile(&self) -> Option<&UserProfile> {
        match &self.phase {
            SessionPhase::Authenticated(profile) => Some(profile),
            _ => None,
        }
    }

    /// The resolved role, if any.
    pub fn role(&self) -> Option<Role> {
        self.profile().map(|profile| profile.role)
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}
