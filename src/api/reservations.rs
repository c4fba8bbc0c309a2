//! Reservation lifecycle endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::{
        reservation::{CreateReservation, Reservation, ReservationDetails, UpdateReservation},
        user::UserIdQuery,
    },
};

use super::{ApiJson, ApiPath, ApiQuery, AuthenticatedUser};

/// List all reservations
#[utoipa::path(
    get,
    path = "/Reservation",
    tag = "reservations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All reservations", body = Vec<Reservation>),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Reservation>>> {
    claims.require_admin()?;

    let reservations = state.services.reservations.list().await?;
    Ok(Json(reservations))
}

/// Reserve an available book
#[utoipa::path(
    post,
    path = "/Reservation",
    tag = "reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservation,
    responses(
        (status = 201, description = "Reservation created", body = Reservation),
        (status = 403, description = "Cannot reserve for another user"),
        (status = 404, description = "User or book not found"),
        (status = 409, description = "Book is not available")
    )
)]
pub async fn create_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiJson(request): ApiJson<CreateReservation>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    claims.require_self_or_admin(request.user_id)?;

    let reservation = state.services.reservations.create(&request).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Get reservation by ID
#[utoipa::path(
    get,
    path = "/Reservation/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation", body = Reservation),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn get_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<Reservation>> {
    let reservation = state.services.reservations.get(id).await?;
    claims.require_self_or_admin(reservation.user_id)?;

    Ok(Json(reservation))
}

/// Overwrite the due date or expired flag
#[utoipa::path(
    put,
    path = "/Reservation/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    request_body = UpdateReservation,
    responses(
        (status = 204, description = "Reservation updated"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn update_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
    ApiJson(update): ApiJson<UpdateReservation>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.reservations.update(id, update).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a reservation
#[utoipa::path(
    delete,
    path = "/Reservation/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 204, description = "Reservation deleted"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn delete_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.reservations.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reservations waiting to be picked up
#[utoipa::path(
    get,
    path = "/Reservation/GetPendingReservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Unclaimed reservations", body = Vec<ReservationDetails>),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn get_pending_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ReservationDetails>>> {
    claims.require_admin()?;

    let reservations = state.services.reservations.pending_claims().await?;
    Ok(Json(reservations))
}

/// Books currently out on loan
#[utoipa::path(
    get,
    path = "/Reservation/GetPendingReturns",
    tag = "reservations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Claimed, not yet returned reservations", body = Vec<ReservationDetails>),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn get_pending_returns(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ReservationDetails>>> {
    claims.require_admin()?;

    let reservations = state.services.reservations.pending_returns().await?;
    Ok(Json(reservations))
}

/// All reservations of one user
#[utoipa::path(
    get,
    path = "/Reservation/GetUserReservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(UserIdQuery),
    responses(
        (status = 200, description = "User's reservations", body = Vec<ReservationDetails>),
        (status = 403, description = "Not allowed to view this user's reservations"),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiQuery(query): ApiQuery<UserIdQuery>,
) -> AppResult<Json<Vec<ReservationDetails>>> {
    claims.require_self_or_admin(query.user_id)?;

    let reservations = state
        .services
        .reservations
        .user_reservations(query.user_id)
        .await?;
    Ok(Json(reservations))
}

/// Record that the user picked the book up
#[utoipa::path(
    put,
    path = "/Reservation/ClaimReservation/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation claimed", body = Reservation),
        (status = 400, description = "Reservation cannot be claimed"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn claim_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<Reservation>> {
    claims.require_admin()?;

    let reservation = state.services.reservations.claim(id).await?;
    Ok(Json(reservation))
}

/// Record that the book came back
#[utoipa::path(
    put,
    path = "/Reservation/ReturnReservation/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation returned", body = Reservation),
        (status = 400, description = "Reservation cannot be returned"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn return_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<Reservation>> {
    claims.require_admin()?;

    let reservation = state.services.reservations.return_book(id).await?;
    Ok(Json(reservation))
}

/// Push the due date back, only allowed shortly before it
#[utoipa::path(
    put,
    path = "/Reservation/ExtendReservation/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation extended", body = Reservation),
        (status = 400, description = "Reservation cannot be extended"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn extend_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<Reservation>> {
    if !claims.is_admin() {
        let reservation = state.services.reservations.get(id).await?;
        claims.require_self_or_admin(reservation.user_id)?;
    }

    let reservation = state.services.reservations.extend(id).await?;
    Ok(Json(reservation))
}

/// Force a reservation into the expired state
#[utoipa::path(
    post,
    path = "/Reservation/{id}/expire",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 204, description = "Reservation expired"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn expire_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;

    state.services.reservations.expire(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
