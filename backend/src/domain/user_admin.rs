//! User administration: list profiles, change roles, remove access.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::domain::audit::{AuditAction, AuditTrail, NewAuditEntry};
use crate::domain::ports::{ProfileRepository, ProfileRepositoryError};
use crate::domain::{Actor, Error, Role, UserId, UserProfile};

const TABLE: &str = "profiles";

/// Map profile store failures onto domain errors.
pub(crate) fn map_profile_error(error: ProfileRepositoryError) -> Error {
    match error {
        ProfileRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("profile repository unavailable: {message}"))
        }
        ProfileRepositoryError::Query { message } => {
            Error::internal(format!("profile repository error: {message}"))
        }
        ProfileRepositoryError::NotFound { id } => {
            Error::not_found(format!("user {id} not found"))
        }
        ProfileRepositoryError::AlreadyExists { id } => {
            Error::conflict(format!("user {id} already exists"))
        }
    }
}

/// Admin-only profile management.
#[derive(Clone)]
pub struct UserAdminService {
    profiles: Arc<dyn ProfileRepository>,
    audit: AuditTrail,
}

impl UserAdminService {
    /// Create the service.
    pub fn new(profiles: Arc<dyn ProfileRepository>, audit: AuditTrail) -> Self {
        Self { profiles, audit }
    }

    /// All profiles, newest first.
    pub async fn list(&self, actor: &Actor) -> Result<Vec<UserProfile>, Error> {
        actor.require_admin()?;
        let mut profiles = self.profiles.list().await.map_err(map_profile_error)?;
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(profiles)
    }

    /// Change `user_id`'s role.
    pub async fn change_role(
        &self,
        actor: &Actor,
        user_id: &UserId,
        role: Role,
    ) -> Result<UserProfile, Error> {
        actor.require_admin()?;
        let profile = self
            .profiles
            .update_role(user_id, role)
            .await
            .map_err(map_profile_error)?;

        self.audit
            .record(NewAuditEntry::new(
                actor.user_id,
                AuditAction::Update,
                TABLE,
                Some(user_id.to_string()),
                json!({ "role": role, "email": profile.email }),
            ))
            .await;
        info!(user_id = %user_id, %role, "user role changed");
        Ok(profile)
    }

    /// Remove `user_id`'s profile. Admins cannot remove their own.
    pub async fn delete(&self, actor: &Actor, user_id: &UserId) -> Result<(), Error> {
        actor.require_admin()?;
        if actor.user_id == *user_id {
            return Err(Error::invalid_request("you cannot delete your own account"));
        }
        self.profiles
            .delete(user_id)
            .await
            .map_err(map_profile_error)?;

        self.audit
            .record(NewAuditEntry::new(
                actor.user_id,
                AuditAction::Delete,
                TABLE,
                Some(user_id.to_string()),
                json!({ "id": user_id }),
            ))
            .await;
        info!(user_id = %user_id, "user profile deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use crate::domain::ports::{FixtureAuditLogRepository, MockAuditLogRepository, MockProfileRepository};
    use chrono::{Duration, Utc};
    use rstest::rstest;

    fn admin() -> Actor {
        Actor {
            user_id: UserId::random(),
            role: Role::Admin,
        }
    }

    fn profile(email: &str, age_days: i64) -> UserProfile {
        UserProfile {
            id: UserId::random(),
            email: email.to_owned(),
            display_name: None,
            role: Role::Readonly,
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    fn service(repo: MockProfileRepository) -> UserAdminService {
        UserAdminService::new(
            Arc::new(repo),
            AuditTrail::new(Arc::new(FixtureAuditLogRepository)),
        )
    }

    #[tokio::test]
    async fn list_orders_newest_first() {
        let mut repo = MockProfileRepository::new();
        repo.expect_list()
            .return_once(|| Ok(vec![profile("old@x.id", 9), profile("new@x.id", 1)]));

        let listed = service(repo).list(&admin()).await.expect("list");
        assert_eq!(listed[0].email, "new@x.id");
    }

    #[tokio::test]
    async fn change_role_audits_role_and_email() {
        let target = profile("ana@x.id", 1);
        let target_id = target.id;
        let mut repo = MockProfileRepository::new();
        repo.expect_update_role()
            .withf(move |id, role| *id == target_id && *role == Role::Admin)
            .return_once(move |_, role| Ok(UserProfile { role, ..target }));
        let mut audit = MockAuditLogRepository::new();
        audit
            .expect_append()
            .withf(|entry| {
                entry.table_name == "profiles"
                    && entry.changes == json!({"role": "admin", "email": "ana@x.id"})
            })
            .times(1)
            .return_once(|_| Ok(()));

        let service = UserAdminService::new(Arc::new(repo), AuditTrail::new(Arc::new(audit)));
        let updated = service
            .change_role(&admin(), &target_id, Role::Admin)
            .await
            .expect("role changed");
        assert_eq!(updated.role, Role::Admin);
    }

    #[tokio::test]
    async fn admins_cannot_delete_themselves() {
        let mut repo = MockProfileRepository::new();
        repo.expect_delete().never();
        let me = admin();

        let err = service(repo)
            .delete(&me, &me.user_id)
            .await
            .expect_err("self delete");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[case(Role::Readonly)]
    #[case(Role::Pending)]
    #[tokio::test]
    async fn non_admins_are_forbidden(#[case] role: Role) {
        let mut repo = MockProfileRepository::new();
        repo.expect_list().never();
        repo.expect_delete().never();
        let caller = Actor {
            user_id: UserId::random(),
            role,
        };
        let service = service(repo);

        let list = service.list(&caller).await;
        let delete = service.delete(&caller, &UserId::random()).await;
        assert_eq!(list.expect_err("forbidden").code(), ErrorCode::Forbidden);
        assert_eq!(delete.expect_err("forbidden").code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn delete_reports_missing_profile() {
        let mut repo = MockProfileRepository::new();
        repo.expect_delete()
            .return_once(|id| Err(ProfileRepositoryError::not_found(id.to_string())));

        let err = service(repo)
            .delete(&admin(), &UserId::random())
            .await
            .expect_err("missing");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
