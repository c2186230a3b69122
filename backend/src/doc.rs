//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] collects every HTTP endpoint under `/auth`, `/api/v1` and
//! `/health`, the domain payloads they exchange, and the session cookie
//! security scheme. Swagger UI serves it in debug builds and the
//! `openapi-dump` binary prints it for external tooling.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::audit::{AuditAction, AuditActorSummary, AuditLogEntry};
use crate::domain::import::{
    DuplicateSource, ImportOutcome, ImportPreview, ImportProgress, ImportRow, ImportStrategy,
    ImportSummary,
};
use crate::domain::{
    CatalogueStats, Error, ErrorCode, Product, ProductDraft, ProductPage, Role, UserProfile, View,
};
use crate::inbound::http::auth::SessionPayload;
use crate::inbound::http::health::{Backend, HealthReport};
use crate::inbound::http::session_config::SESSION_COOKIE_NAME;
use crate::inbound::http::users::RoleChangeRequest;
use crate::inbound::http::views::{AccessDecision, ViewAccess};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                SESSION_COOKIE_NAME,
                "Private session cookie issued by GET /auth/callback.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Invento API",
        description = "Product catalogue, CSV import, user administration and audit trail.",
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::auth::sign_in,
        crate::inbound::http::auth::callback,
        crate::inbound::http::auth::sign_out,
        crate::inbound::http::auth::current_session,
        crate::inbound::http::views::view_access,
        crate::inbound::http::products::list_products,
        crate::inbound::http::products::list_categories,
        crate::inbound::http::products::catalogue_stats,
        crate::inbound::http::products::get_product,
        crate::inbound::http::products::create_product,
        crate::inbound::http::products::update_product,
        crate::inbound::http::products::delete_product,
        crate::inbound::http::import::import_template,
        crate::inbound::http::import::preview_import,
        crate::inbound::http::import::commit_import,
        crate::inbound::http::users::list_users,
        crate::inbound::http::users::change_user_role,
        crate::inbound::http::users::delete_user,
        crate::inbound::http::audit::recent_audit_logs,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        UserProfile,
        Role,
        RoleChangeRequest,
        Product,
        ProductDraft,
        ProductPage,
        CatalogueStats,
        ImportStrategy,
        ImportRow,
        DuplicateSource,
        ImportSummary,
        ImportPreview,
        ImportProgress,
        ImportOutcome,
        AuditAction,
        AuditActorSummary,
        AuditLogEntry,
        SessionPayload,
        View,
        AccessDecision,
        ViewAccess,
        Backend,
        HealthReport,
    )),
    tags(
        (name = "auth", description = "OAuth sign-in and session lifecycle"),
        (name = "views", description = "Role gates for dashboard views"),
        (name = "products", description = "Catalogue reads and admin edits"),
        (name = "import", description = "CSV template, preview and commit"),
        (name = "users", description = "User approval and role administration"),
        (name = "audit", description = "Audit trail of catalogue changes"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
