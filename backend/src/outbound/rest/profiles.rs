//! Profile table adapter.

use async_trait::async_trait;

use crate::domain::ports::{ProfileRepository, ProfileRepositoryError};
use crate::domain::{NewProfile, Role, UserId, UserProfile};

use super::client::{RestClient, RestError, Returning, eq};
use super::rows::{PROFILES, ProfileRow, ProfileWrite, RoleWrite};

/// [`ProfileRepository`] backed by the hosted store.
#[derive(Clone)]
pub struct RestProfileRepository {
    client: RestClient,
}

impl RestProfileRepository {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

fn map_error(error: RestError) -> ProfileRepositoryError {
    if error.is_unavailable() {
        ProfileRepositoryError::connection(error.to_string())
    } else {
        ProfileRepositoryError::query(error.to_string())
    }
}

fn convert(row: ProfileRow) -> Result<UserProfile, ProfileRepositoryError> {
    row.into_domain()
        .map_err(|err| ProfileRepositoryError::query(err.to_string()))
}

fn first(rows: Vec<ProfileRow>, id: &UserId) -> Result<UserProfile, ProfileRepositoryError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| ProfileRepositoryError::not_found(id.to_string()))
        .and_then(convert)
}

fn id_filter(id: &UserId) -> Vec<(&'static str, String)> {
    vec![("id", eq(id)), ("select", "*".to_owned())]
}

#[async_trait]
impl ProfileRepository for RestProfileRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserProfile>, ProfileRepositoryError> {
        let row: Option<ProfileRow> = self
            .client
            .select_one(PROFILES, &id_filter(id))
            .await
            .map_err(map_error)?;
        row.map(convert).transpose()
    }

    async fn insert(&self, profile: &NewProfile) -> Result<UserProfile, ProfileRepositoryError> {
        let rows: Vec<ProfileRow> = self
            .client
            .insert(
                PROFILES,
                &[ProfileWrite::new(profile)],
                Returning::Representation,
            )
            .await
            .map_err(|err| {
                if err.is_unique_violation() {
                    ProfileRepositoryError::already_exists(profile.id.to_string())
                } else {
                    map_error(err)
                }
            })?;
        first(rows, &profile.id)
    }

    async fn list(&self) -> Result<Vec<UserProfile>, ProfileRepositoryError> {
        let rows: Vec<ProfileRow> = self
            .client
            .select(
                PROFILES,
                &[
                    ("select", "*".to_owned()),
                    ("order", "created_at.desc".to_owned()),
                ],
            )
            .await
            .map_err(map_error)?;
        rows.into_iter().map(convert).collect()
    }

    async fn update_role(
        &self,
        id: &UserId,
        role: Role,
    ) -> Result<UserProfile, ProfileRepositoryError> {
        let rows: Vec<ProfileRow> = self
            .client
            .update(
                PROFILES,
                &id_filter(id),
                &RoleWrite {
                    role: role.as_str(),
                },
            )
            .await
            .map_err(map_error)?;
        first(rows, id)
    }

    async fn delete(&self, id: &UserId) -> Result<(), ProfileRepositoryError> {
        let rows: Vec<ProfileRow> = self
            .client
            .delete(PROFILES, &id_filter(id))
            .await
            .map_err(map_error)?;
        first(rows, id).map(|_| ())
    }
}
