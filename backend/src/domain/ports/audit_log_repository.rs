//! Port for the append-only activity log.

use async_trait::async_trait;

use crate::domain::{AuditLogEntry, NewAuditEntry};

use super::define_port_error;

define_port_error! {
    /// Errors raised by audit log adapters.
    pub enum AuditLogRepositoryError {
        /// Repository connection could not be established.
        Connection { message } =>
            "audit log connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message } => "audit log query failed: {message}",
    }
}

/// Port for writing and reading activity log entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Append one entry.
    async fn append(&self, entry: &NewAuditEntry) -> Result<(), AuditLogRepositoryError>;

    /// Up to `limit` entries, newest first, with actor details joined.
    async fn recent(&self, limit: usize) -> Result<Vec<AuditLogEntry>, AuditLogRepositoryError>;
}

/// Fixture implementation that discards writes.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureAuditLogRepository;

#[async_trait]
impl AuditLogRepository for FixtureAuditLogRepository {
    async fn append(&self, _entry: &NewAuditEntry) -> Result<(), AuditLogRepositoryError> {
        Ok(())
    }

    async fn recent(&self, _limit: usize) -> Result<Vec<AuditLogEntry>, AuditLogRepositoryError> {
        Ok(Vec::new())
    }
}
