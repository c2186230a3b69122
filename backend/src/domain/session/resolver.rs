//! Fetch-or-create of the local profile behind a provider session.
//!
//! Resolution never fails: when the store cannot be read or written, the
//! caller gets an in-memory profile carrying the default role so the
//! dashboard is not blocked. Those cases are logged.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use mockable::Clock;
use tracing::{info, warn};

use crate::domain::ports::{IdentityUser, ProfileRepository, ProfileRepositoryError};
use crate::domain::{NewProfile, Role, UserProfile};

/// Where a resolved profile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileOrigin {
    /// Read from the store.
    Stored,
    /// Created on this sign-in.
    Created,
    /// Built in memory after the store failed.
    Synthesised,
}

/// Outcome of [`ProfileResolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProfile {
    pub profile: UserProfile,
    pub origin: ProfileOrigin,
}

/// Retry and default-role policy for profile resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverPolicy {
    /// Role given to new and synthesised profiles.
    pub default_role: Role,
    /// Fetch attempts before giving up on a failing store.
    pub max_attempts: NonZeroU32,
    /// Fixed pause between attempts.
    pub retry_delay: Duration,
}

impl Default for ResolverPolicy {
    fn default() -> Self {
        Self {
            default_role: Role::Pending,
            max_attempts: NonZeroU32::new(3).unwrap_or(NonZeroU32::MIN),
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Resolves provider accounts to local profiles.
pub struct ProfileResolver {
    profiles: Arc<dyn ProfileRepository>,
    clock: Arc<dyn Clock>,
    policy: ResolverPolicy,
}

impl ProfileResolver {
    /// Build a resolver.
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        clock: Arc<dyn Clock>,
        policy: ResolverPolicy,
    ) -> Self {
        Self {
            profiles,
            clock,
            policy,
        }
    }

    /// Policy in effect.
    pub fn policy(&self) -> &ResolverPolicy {
        &self.policy
    }

    /// Fetch the profile for `user`, creating it when the store reports no
    /// rows. Transient fetch failures are retried with a fixed delay.
    pub async fn resolve(&self, user: &IdentityUser) -> ResolvedProfile {
        let attempts = self.policy.max_attempts.get();
        for attempt in 1..=attempts {
            match self.profiles.find_by_id(&user.id).await {
                Ok(Some(profile)) => {
                    return ResolvedProfile {
                        profile,
                        origin: ProfileOrigin::Stored,
                    };
                }
                Ok(None) => return self.create(user).await,
                Err(error) => {
                    warn!(%error, user_id = %user.id, attempt, attempts, "profile fetch failed");
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.retry_delay).await;
                    }
                }
            }
        }
        warn!(user_id = %user.id, "profile fetch retries exhausted; using default profile");
        self.synthesise(user)
    }

    async fn create(&self, user: &IdentityUser) -> ResolvedProfile {
        let new_profile = NewProfile {
            id: user.id,
            email: user.email.clone(),
            display_name: Some(user.preferred_name()),
            role: self.policy.default_role,
        };
        match self.profiles.insert(&new_profile).await {
            Ok(profile) => {
                info!(user_id = %user.id, role = %profile.role, "profile created on first sign-in");
                ResolvedProfile {
                    profile,
                    origin: ProfileOrigin::Created,
                }
            }
            Err(ProfileRepositoryError::AlreadyExists { .. }) => {
                match self.profiles.find_by_id(&user.id).await {
                    Ok(Some(profile)) => ResolvedProfile {
                        profile,
                        origin: ProfileOrigin::Stored,
                    },
                    _ => self.synthesise(user),
                }
            }
            Err(error) => {
                warn!(%error, user_id = %user.id, "profile creation failed; using default profile");
                self.synthesise(user)
            }
        }
    }

    fn synthesise(&self, user: &IdentityUser) -> ResolvedProfile {
        ResolvedProfile {
            profile: UserProfile {
                id: user.id,
                email: user.email.clone(),
                display_name: Some(user.preferred_name()),
                role: self.policy.default_role,
                created_at: self.clock.utc(),
            },
            origin: ProfileOrigin::Synthesised,
        }
    }
}
