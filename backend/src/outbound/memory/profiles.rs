//! In-memory profile store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use tokio::sync::RwLock;

use crate::domain::ports::{ProfileRepository, ProfileRepositoryError};
use crate::domain::{NewProfile, Role, UserId, UserProfile};

/// [`ProfileRepository`] holding profiles in a process-local map.
pub struct InMemoryProfileRepository {
    rows: RwLock<HashMap<UserId, UserProfile>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryProfileRepository {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Insert or overwrite a profile, e.g. to seed the development admin.
    pub async fn seed(&self, profile: NewProfile) -> UserProfile {
        let stored = self.materialise(profile);
        self.rows.write().await.insert(stored.id, stored.clone());
        stored
    }

    fn materialise(&self, profile: NewProfile) -> UserProfile {
        UserProfile {
            id: profile.id,
            email: profile.email,
            display_name: profile.display_name,
            role: profile.role,
            created_at: self.clock.utc(),
        }
    }
}

impl Default for InMemoryProfileRepository {
    fn default() -> Self {
        Self::new(Arc::new(DefaultClock))
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserProfile>, ProfileRepositoryError> {
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn insert(&self, profile: &NewProfile) -> Result<UserProfile, ProfileRepositoryError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&profile.id) {
            return Err(ProfileRepositoryError::already_exists(profile.id.to_string()));
        }
        let stored = self.materialise(profile.clone());
        rows.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list(&self) -> Result<Vec<UserProfile>, ProfileRepositoryError> {
        let mut profiles: Vec<UserProfile> = self.rows.read().await.values().cloned().collect();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(profiles)
    }

    async fn update_role(
        &self,
        id: &UserId,
        role: Role,
    ) -> Result<UserProfile, ProfileRepositoryError> {
        let mut rows = self.rows.write().await;
        let profile = rows
            .get_mut(id)
            .ok_or_else(|| ProfileRepositoryError::not_found(id.to_string()))?;
        profile.role = role;
        Ok(profile.clone())
    }

    async fn delete(&self, id: &UserId) -> Result<(), ProfileRepositoryError> {
        self.rows
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ProfileRepositoryError::not_found(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn new_profile(role: Role) -> NewProfile {
        NewProfile {
            id: UserId::random(),
            email: "ops@example.com".into(),
            display_name: None,
            role,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn second_insert_reports_existing_profile() {
        let repo = InMemoryProfileRepository::default();
        let profile = new_profile(Role::Pending);
        repo.insert(&profile).await.expect("first insert");
        let err = repo.insert(&profile).await.expect_err("already there");
        assert_eq!(err, ProfileRepositoryError::already_exists(profile.id.to_string()));
    }

    #[rstest]
    #[tokio::test]
    async fn role_updates_are_persisted() {
        let repo = InMemoryProfileRepository::default();
        let stored = repo.seed(new_profile(Role::Pending)).await;
        repo.update_role(&stored.id, Role::Readonly)
            .await
            .expect("update");
        let found = repo
            .find_by_id(&stored.id)
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(found.role, Role::Readonly);
    }
}
