//! User administration handlers.
//!
//! ```text
//! GET    /api/v1/users
//! PATCH  /api/v1/users/{id}/role  {"role":"readonly"}
//! DELETE /api/v1/users/{id}
//! ```

use actix_web::{HttpResponse, delete, get, patch, web};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{Error, Role, UserId, UserProfile};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::CurrentUser;
use crate::inbound::http::state::HttpState;

/// Request body for a role change.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct RoleChangeRequest {
    pub role: Role,
}

/// All profiles, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "Profiles", body = [UserProfile]),
        (status = 401, description = "Sign in required", body = Error),
        (status = 403, description = "Admin role required", body = Error)
    ),
    tags = ["users"],
    operation_id = "listUsers"
)]
#[get("/users")]
pub async fn list_users(
    state: web::Data<HttpState>,
    user: CurrentUser,
) -> ApiResult<web::Json<Vec<UserProfile>>> {
    Ok(web::Json(state.users.list(&user.actor).await?))
}

/// Change a user's role.
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}/role",
    params(("id" = Uuid, Path, description = "User identifier")),
    request_body = RoleChangeRequest,
    responses(
        (status = 200, description = "Updated profile", body = UserProfile),
        (status = 400, description = "Unknown role", body = Error),
        (status = 403, description = "Admin role required", body = Error),
        (status = 404, description = "User not found", body = Error)
    ),
    tags = ["users"],
    operation_id = "changeUserRole"
)]
#[patch("/users/{id}/role")]
pub async fn change_user_role(
    state: web::Data<HttpState>,
    user: CurrentUser,
    path: web::Path<Uuid>,
    payload: web::Json<RoleChangeRequest>,
) -> ApiResult<web::Json<UserProfile>> {
    let target = UserId::from_uuid(path.into_inner());
    let profile = state
        .users
        .change_role(&user.actor, &target, payload.role)
        .await?;
    Ok(web::Json(profile))
}

/// Remove a user's profile.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User identifier")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Cannot delete own account", body = Error),
        (status = 403, description = "Admin role required", body = Error),
        (status = 404, description = "User not found", body = Error)
    ),
    tags = ["users"],
    operation_id = "deleteUser"
)]
#[delete("/users/{id}")]
pub async fn delete_user(
    state: web::Data<HttpState>,
    user: CurrentUser,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let target = UserId::from_uuid(path.into_inner());
    state.users.delete(&user.actor, &target).await?;
    Ok(HttpResponse::NoContent().finish())
}
