//! Port for local user profiles.

use async_trait::async_trait;

use crate::domain::{NewProfile, Role, UserId, UserProfile};

use super::define_port_error;

define_port_error! {
    /// Errors raised by profile repository adapters.
    pub enum ProfileRepositoryError {
        /// Repository connection could not be established.
        Connection { message } =>
            "profile repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message } =>
            "profile repository query failed: {message}",
        /// The targeted profile does not exist.
        NotFound { id } => "profile {id} not found",
        /// A profile with this id already exists.
        AlreadyExists { id } => "profile {id} already exists",
    }
}

/// Port for profile storage.
///
/// `find_by_id` distinguishes "no rows" (`Ok(None)`) from transient failures
/// so session bootstrap can decide between creating a profile and retrying.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Fetch a profile by the identity-provider account id.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserProfile>, ProfileRepositoryError>;

    /// Create a profile and return the stored row.
    async fn insert(&self, profile: &NewProfile) -> Result<UserProfile, ProfileRepositoryError>;

    /// All profiles, newest first.
    async fn list(&self) -> Result<Vec<UserProfile>, ProfileRepositoryError>;

    /// Change a profile's role.
    async fn update_role(
        &self,
        id: &UserId,
        role: Role,
    ) -> Result<UserProfile, ProfileRepositoryError>;

    /// Remove a profile. The identity-provider account is untouched.
    async fn delete(&self, id: &UserId) -> Result<(), ProfileRepositoryError>;
}

/// Fixture implementation with no stored profiles.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureProfileRepository;

#[async_trait]
impl ProfileRepository for FixtureProfileRepository {
    async fn find_by_id(
        &self,
        _id: &UserId,
    ) -> Result<Option<UserProfile>, ProfileRepositoryError> {
        Ok(None)
    }

    async fn insert(&self, profile: &NewProfile) -> Result<UserProfile, ProfileRepositoryError> {
        Ok(UserProfile {
            id: profile.id,
            email: profile.email.clone(),
            display_name: profile.display_name.clone(),
            role: profile.role,
            created_at: chrono::Utc::now(),
        })
    }

    async fn list(&self) -> Result<Vec<UserProfile>, ProfileRepositoryError> {
        Ok(Vec::new())
    }

    async fn update_role(
        &self,
        id: &UserId,
        _role: Role,
    ) -> Result<UserProfile, ProfileRepositoryError> {
        Err(ProfileRepositoryError::not_found(id.to_string()))
    }

    async fn delete(&self, id: &UserId) -> Result<(), ProfileRepositoryError> {
        Err(ProfileRepositoryError::not_found(id.to_string()))
    }
}
