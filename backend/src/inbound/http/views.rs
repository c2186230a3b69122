//! View access checks for the dashboard shell.
//!
//! ```text
//! GET /api/v1/views/import/access
//! ```

use actix_web::{get, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::session::GateDecision;
use crate::domain::{Error, View};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::{SessionContext, settle_session};
use crate::inbound::http::state::HttpState;

/// Outcome of a view gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccessDecision {
    Wait,
    Render,
    Redirect,
}

/// Response body for view access checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViewAccess {
    pub view: View,
    pub decision: AccessDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "/pending-approval")]
    pub redirect_to: Option<String>,
}

impl ViewAccess {
    fn new(view: View, decision: GateDecision) -> Self {
        let (decision, redirect_to) = match decision {
            GateDecision::Wait => (AccessDecision::Wait, None),
            GateDecision::Render => (AccessDecision::Render, None),
            GateDecision::Redirect(path) => (AccessDecision::Redirect, Some(path)),
        };
        Self {
            view,
            decision,
            redirect_to,
        }
    }
}

/// Decide whether the caller may open a view.
#[utoipa::path(
    get,
    path = "/api/v1/views/{view}/access",
    params(("view" = String, Path, description = "View slug, e.g. `product-edit`")),
    responses(
        (status = 200, description = "Access decision", body = ViewAccess),
        (status = 404, description = "Unknown view", body = Error)
    ),
    tags = ["auth"],
    operation_id = "viewAccess"
)]
#[get("/views/{view}/access")]
pub async fn view_access(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ViewAccess>> {
    let view: View = path
        .parse()
        .map_err(|err: crate::domain::views::UnknownView| Error::not_found(err.to_string()))?;
    let snapshot = settle_session(&state, &session).await?;
    Ok(web::Json(ViewAccess::new(view, view.decide(&snapshot))))
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use rstest::rstest;
    use serde_json::Value;

    use crate::domain::Role;
    use crate::inbound::http::test_utils::{Harness, sign_in_cookie};

    #[rstest]
    #[case::admin_imports(Role::Admin, "import", "render", None)]
    #[case::readonly_imports(Role::Readonly, "import", "redirect", Some("/products"))]
    #[case::readonly_browses(Role::Readonly, "products", "render", None)]
    #[case::pending_browses(Role::Pending, "dashboard", "redirect", Some("/pending-approval"))]
    #[case::pending_waits(Role::Pending, "pending-approval", "render", None)]
    #[case::readonly_admin_page(Role::Readonly, "users", "redirect", Some("/"))]
    #[actix_web::test]
    async fn gates_views_by_role(
        #[case] role: Role,
        #[case] view: &str,
        #[case] decision: &str,
        #[case] redirect: Option<&str>,
    ) {
        let harness = Harness::new();
        let user = harness.account("someone@invento.test", role).await;
        let app = test::init_service(harness.app()).await;
        let cookie = sign_in_cookie(&app, user.id).await;

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/api/v1/views/{view}/access"))
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["view"], view);
        assert_eq!(body["decision"], decision);
        assert_eq!(body["redirectTo"].as_str(), redirect);
    }

    #[actix_web::test]
    async fn signed_out_visitors_go_to_login() {
        let harness = Harness::new();
        let app = test::init_service(harness.app()).await;

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/v1/views/dashboard/access")
                .to_request(),
        )
        .await;

        let body: Value = test::read_body_json(res).await;
        assert_eq!(body["redirectTo"], "/login");
    }

    #[actix_web::test]
    async fn unknown_views_are_not_found() {
        let harness = Harness::new();
        let app = test::init_service(harness.app()).await;

        let res = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/v1/views/reports/access")
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
