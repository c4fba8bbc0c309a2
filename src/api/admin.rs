//! User administration endpoints (admin only)

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::user::{EmailSearchQuery, Role, UpdateUserRole, UserAccount, UserIdQuery, UserWithRoles},
};

use super::{ApiJson, ApiQuery, AuthenticatedUser};

/// Role change confirmation
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoleUpdated {
    pub user_id: Uuid,
    pub role: Role,
    pub message: String,
}

/// Search confirmed users whose email contains the given fragment
#[utoipa::path(
    get,
    path = "/Admin/GetUsersEmails",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(EmailSearchQuery),
    responses(
        (status = 200, description = "Matching users", body = Vec<UserAccount>),
        (status = 400, description = "Missing email fragment"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn get_users_emails(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiQuery(query): ApiQuery<EmailSearchQuery>,
) -> AppResult<Json<Vec<UserAccount>>> {
    claims.require_admin()?;

    let users = state
        .services
        .users
        .search_by_email(query.email.as_deref())
        .await?;
    Ok(Json(users))
}

/// Get a user with their roles
#[utoipa::path(
    get,
    path = "/Admin/GetUser",
    tag = "admin",
    security(("bearer_auth" = [])),
    params(UserIdQuery),
    responses(
        (status = 200, description = "User and roles", body = UserWithRoles),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiQuery(query): ApiQuery<UserIdQuery>,
) -> AppResult<Json<UserWithRoles>> {
    claims.require_admin()?;

    let user = state.services.users.get_user(query.user_id).await?;
    Ok(Json(user))
}

/// Replace a user's role
#[utoipa::path(
    post,
    path = "/Admin/UpdateUserRole",
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = UpdateUserRole,
    responses(
        (status = 200, description = "Role updated", body = RoleUpdated),
        (status = 400, description = "Unknown role"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "User not found or not confirmed")
    )
)]
pub async fn update_user_role(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiJson(request): ApiJson<UpdateUserRole>,
) -> AppResult<Json<RoleUpdated>> {
    claims.require_admin()?;

    let role = state
        .services
        .users
        .update_role(request.user_id, &request.role)
        .await?;

    Ok(Json(RoleUpdated {
        user_id: request.user_id,
        role,
        message: format!("User role updated to {}", role),
    }))
}
