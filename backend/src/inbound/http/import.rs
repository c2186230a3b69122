//! CSV import handlers.
//!
//! ```text
//! GET  /api/v1/products/import/template
//! POST /api/v1/products/import/preview       (text/csv body)
//! POST /api/v1/products/import?strategy=     (text/csv body)
//! ```

use actix_web::http::header::{self, ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpResponse, get, post, web};
use serde::Deserialize;
use tracing::debug;
use utoipa::IntoParams;

use crate::domain::Error;
use crate::domain::import::{
    ImportOutcome, ImportPreview, ImportStrategy, TEMPLATE_FILE_NAME, template_csv,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::CurrentUser;
use crate::inbound::http::state::HttpState;

/// Largest accepted upload.
pub const MAX_IMPORT_BYTES: usize = 5 * 1024 * 1024;

/// Query parameters for committing an import.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct CommitQuery {
    /// `skip` (default) or `replace`.
    #[param(value_type = Option<String>, example = "replace")]
    pub strategy: Option<ImportStrategy>,
}

fn csv_text(body: &web::Bytes) -> Result<&str, Error> {
    if body.is_empty() {
        return Err(Error::invalid_request("import file is empty"));
    }
    // Spreadsheet exports often lead with a byte order mark.
    let text = std::str::from_utf8(body)
        .map_err(|_| Error::invalid_request("import file must be UTF-8 text"))?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
}

/// Download the import template with an example row.
#[utoipa::path(
    get,
    path = "/api/v1/products/import/template",
    responses(
        (status = 200, description = "CSV template", content_type = "text/csv", body = String),
        (status = 401, description = "Sign in required", body = Error),
        (status = 403, description = "Admin role required", body = Error)
    ),
    tags = ["import"],
    operation_id = "importTemplate"
)]
#[get("/products/import/template")]
pub async fn import_template(user: CurrentUser) -> ApiResult<HttpResponse> {
    user.actor.require_admin()?;
    let body = template_csv()?;
    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(TEMPLATE_FILE_NAME.to_owned())],
        })
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .body(body))
}

/// Classify every row of an upload without writing.
#[utoipa::path(
    post,
    path = "/api/v1/products/import/preview",
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Classified rows", body = ImportPreview),
        (status = 400, description = "Unreadable file", body = Error),
        (status = 403, description = "Admin role required", body = Error)
    ),
    tags = ["import"],
    operation_id = "previewImport"
)]
#[post("/products/import/preview")]
pub async fn preview_import(
    state: web::Data<HttpState>,
    user: CurrentUser,
    body: web::Bytes,
) -> ApiResult<web::Json<ImportPreview>> {
    let csv = csv_text(&body)?;
    let preview = state.imports.preview(&user.actor, csv).await?;
    Ok(web::Json(preview))
}

/// Commit the rows the chosen strategy admits.
#[utoipa::path(
    post,
    path = "/api/v1/products/import",
    params(CommitQuery),
    request_body(content = String, content_type = "text/csv"),
    responses(
        (status = 200, description = "Import finished", body = ImportOutcome),
        (status = 400, description = "Unreadable file", body = Error),
        (status = 403, description = "Admin role required", body = Error),
        (status = 503, description = "Store failed mid-import", body = Error)
    ),
    tags = ["import"],
    operation_id = "commitImport"
)]
#[post("/products/import")]
pub async fn commit_import(
    state: web::Data<HttpState>,
    user: CurrentUser,
    query: web::Query<CommitQuery>,
    body: web::Bytes,
) -> ApiResult<web::Json<ImportOutcome>> {
    let csv = csv_text(&body)?;
    let strategy = query.strategy.unwrap_or_default();
    let outcome = state
        .imports
        .commit(&user.actor, csv, strategy, |progress| {
            debug!(
                imported = progress.imported,
                total = progress.total,
                percent = progress.percent,
                "import progress"
            );
        })
        .await?;
    Ok(web::Json(outcome))
}
