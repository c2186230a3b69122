//! Recent activity feed.
//!
//! ```text
//! GET /api/v1/audit-logs?limit=10
//! ```

use actix_web::{get, web};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::domain::{AuditLogEntry, Error};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::CurrentUser;
use crate::inbound::http::state::HttpState;

/// Query parameters for the activity feed.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct RecentQuery {
    /// Entries to return; defaults to 10, at most 100.
    pub limit: Option<usize>,
}

/// Most recent audit entries with their actors.
#[utoipa::path(
    get,
    path = "/api/v1/audit-logs",
    params(RecentQuery),
    responses(
        (status = 200, description = "Newest entries first", body = [AuditLogEntry]),
        (status = 403, description = "Admin role required", body = Error)
    ),
    tags = ["audit"],
    operation_id = "recentAuditLogs"
)]
#[get("/audit-logs")]
pub async fn recent_audit_logs(
    state: web::Data<HttpState>,
    user: CurrentUser,
    query: web::Query<RecentQuery>,
) -> ApiResult<web::Json<Vec<AuditLogEntry>>> {
    let entries = state.audit.recent(&user.actor, query.limit).await?;
    Ok(web::Json(entries))
}
