//! Audit log table adapter.

use async_trait::async_trait;

use crate::domain::ports::{AuditLogRepository, AuditLogRepositoryError};
use crate::domain::{AuditLogEntry, NewAuditEntry};

use super::client::{RestClient, RestError, Returning};
use super::rows::{AUDIT_LOGS, AuditRow, AuditWrite};

/// Columns selected for the activity feed, joined with the actor's profile.
const RECENT_SELECT: &str = "*,profiles(email,full_name)";

/// [`AuditLogRepository`] backed by the hosted store.
#[derive(Clone)]
pub struct RestAuditLogRepository {
    client: RestClient,
}

impl RestAuditLogRepository {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

fn map_error(error: RestError) -> AuditLogRepositoryError {
    if error.is_unavailable() {
        AuditLogRepositoryError::connection(error.to_string())
    } else {
        AuditLogRepositoryError::query(error.to_string())
    }
}

#[async_trait]
impl AuditLogRepository for RestAuditLogRepository {
    async fn append(&self, entry: &NewAuditEntry) -> Result<(), AuditLogRepositoryError> {
        let _: Vec<serde_json::Value> = self
            .client
            .insert(AUDIT_LOGS, &[AuditWrite::new(entry)], Returning::Minimal)
            .await
            .map_err(map_error)?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditLogEntry>, AuditLogRepositoryError> {
        let rows: Vec<AuditRow> = self
            .client
            .select(
                AUDIT_LOGS,
                &[
                    ("select", RECENT_SELECT.to_owned()),
                    ("order", "created_at.desc".to_owned()),
                    ("limit", limit.to_string()),
                ],
            )
            .await
            .map_err(map_error)?;
        Ok(rows.into_iter().map(AuditRow::into_domain).collect())
    }
}
