//! In-memory audit log.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::ports::{AuditLogRepository, AuditLogRepositoryError, ProfileRepository};
use crate::domain::{AuditActorSummary, AuditLogEntry, NewAuditEntry};

/// [`AuditLogRepository`] appending to a vector; `recent` joins actor
/// details from the profile store the way the hosted store's join does.
pub struct InMemoryAuditLogRepository {
    entries: RwLock<Vec<AuditLogEntry>>,
    profiles: Arc<dyn ProfileRepository>,
    clock: Arc<dyn Clock>,
}

impl InMemoryAuditLogRepository {
    pub fn new(profiles: Arc<dyn ProfileRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            profiles,
            clock,
        }
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditLogRepository {
    async fn append(&self, entry: &NewAuditEntry) -> Result<(), AuditLogRepositoryError> {
        let stored = AuditLogEntry {
            id: Uuid::new_v4(),
            user_id: Some(entry.user_id),
            action: entry.action,
            table_name: entry.table_name.clone(),
            record_id: entry.record_id.clone(),
            changes: entry.changes.clone(),
            created_at: self.clock.utc(),
            actor: None,
        };
        self.entries.write().await.push(stored);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<AuditLogEntry>, AuditLogRepositoryError> {
        let latest: Vec<AuditLogEntry> = self
            .entries
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect();
        let mut joined = Vec::with_capacity(latest.len());
        for mut entry in latest {
            if let Some(user_id) = entry.user_id {
                entry.actor = self
                    .profiles
                    .find_by_id(&user_id)
                    .await
                    .map_err(|err| AuditLogRepositoryError::query(err.to_string()))?
                    .map(|profile| AuditActorSummary {
                        email: profile.email,
                        display_name: profile.display_name,
                    });
            }
            joined.push(entry);
        }
        Ok(joined)
    }
}
