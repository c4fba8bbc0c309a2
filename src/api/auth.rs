//! Registration, login and email confirmation endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::user::{LoginRequest, RegisterUser},
    services::auth::LoginResponse,
};

use super::{ApiJson, ApiQuery, MessageResponse};

/// Query carrying the emailed confirmation token
#[derive(Deserialize, IntoParams)]
pub struct ConfirmEmailQuery {
    pub token: String,
}

/// Register a new account
#[utoipa::path(
    post,
    path = "/Auth/register",
    tag = "auth",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "User registered", body = MessageResponse),
        (status = 400, description = "Invalid request"),
        (status = 409, description = "Username or email already taken")
    )
)]
pub async fn register(
    State(state): State<crate::AppState>,
    ApiJson(request): ApiJson<RegisterUser>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    state.services.auth.register(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("User registered successfully")),
    ))
}

/// Login with username or email
#[utoipa::path(
    post,
    path = "/Auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let response = state.services.auth.login(request).await?;
    Ok(Json(response))
}

/// Confirm an email address from the link sent at registration
#[utoipa::path(
    get,
    path = "/Auth/confirm-email",
    tag = "auth",
    params(ConfirmEmailQuery),
    responses(
        (status = 200, description = "Email confirmed", body = MessageResponse),
        (status = 400, description = "Unknown user or already confirmed"),
        (status = 401, description = "Invalid or expired token")
    )
)]
pub async fn confirm_email(
    State(state): State<crate::AppState>,
    ApiQuery(query): ApiQuery<ConfirmEmailQuery>,
) -> AppResult<Json<MessageResponse>> {
    state.services.auth.confirm_email(&query.token).await?;
    Ok(Json(MessageResponse::new("Email confirmed successfully.")))
}
