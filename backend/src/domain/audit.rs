//! Activity log entries and the best-effort recorder shared by services.
//!
//! Audit writes never fail the action that triggered them: the recorder logs
//! a warning and moves on. Listing is admin only and degrades to an empty
//! list when the store is unavailable.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

use super::ports::AuditLogRepository;
use super::{Actor, Error, UserId};

/// Number of entries returned when the caller omits a limit.
pub const DEFAULT_RECENT_LIMIT: usize = 10;
/// Largest page a caller may request.
pub const MAX_RECENT_LIMIT: usize = 100;

/// Kind of change recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Import,
}

impl AuditAction {
    /// Wire name stored in the log.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Import => "import",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry to append to the log.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub user_id: UserId,
    pub action: AuditAction,
    pub table_name: String,
    /// `None` for bulk operations such as imports.
    pub record_id: Option<String>,
    pub changes: Value,
}

impl NewAuditEntry {
    /// Build an entry against `table_name`.
    pub fn new(
        user_id: UserId,
        action: AuditAction,
        table_name: impl Into<String>,
        record_id: Option<String>,
        changes: Value,
    ) -> Self {
        Self {
            user_id,
            action,
            table_name: table_name.into(),
            record_id,
            changes,
        }
    }
}

/// Contact details of the acting user, joined from profiles when available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditActorSummary {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// A stored activity log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: Uuid,
    #[schema(value_type = Option<String>)]
    pub user_id: Option<UserId>,
    pub action: AuditAction,
    pub table_name: String,
    pub record_id: Option<String>,
    pub changes: Value,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<AuditActorSummary>,
}

/// Writes and reads the activity log on behalf of the other services.
#[derive(Clone)]
pub struct AuditTrail {
    repo: Arc<dyn AuditLogRepository>,
}

impl AuditTrail {
    /// Wrap the audit log port.
    pub fn new(repo: Arc<dyn AuditLogRepository>) -> Self {
        Self { repo }
    }

    /// Append `entry`, logging and swallowing any store failure.
    pub async fn record(&self, entry: NewAuditEntry) {
        if let Err(error) = self.repo.append(&entry).await {
            warn!(
                %error,
                action = %entry.action,
                table = %entry.table_name,
                "failed to write audit log entry"
            );
        }
    }

    /// Most recent entries, newest first.
    ///
    /// The limit defaults to [`DEFAULT_RECENT_LIMIT`] and is clamped to
    /// `1..=MAX_RECENT_LIMIT`. A store failure yields an empty list.
    pub async fn recent(
        &self,
        actor: &Actor,
        limit: Option<usize>,
    ) -> Result<Vec<AuditLogEntry>, Error> {
        actor.require_admin()?;
        let limit = limit
            .unwrap_or(DEFAULT_RECENT_LIMIT)
            .clamp(1, MAX_RECENT_LIMIT);
        match self.repo.recent(limit).await {
            Ok(mut entries) => {
                entries.truncate(limit);
                Ok(entries)
            }
            Err(error) => {
                warn!(%error, "failed to load audit log entries");
                Ok(Vec::new())
            }
        }
    }
}
