//! API handlers for the library REST endpoints

pub mod admin;
pub mod auth;
pub mod books;
pub mod health;
pub mod openapi;
pub mod reservations;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
    routing::{get, post, put},
    Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::Serialize;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|rejection| {
                    if rejection.is_missing() {
                        AppError::Authentication("Missing authorization header".to_string())
                    } else {
                        AppError::Authentication("Invalid authorization header format".to_string())
                    }
                })?;

        let claims = UserClaims::from_token(bearer.token(), &state.config.auth)
            .map_err(|e| AppError::Authentication(format!("Invalid token: {}", e)))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// JSON body whose rejections are reported as validation errors
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string whose rejections are reported as validation errors
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path parameters whose rejections are reported as validation errors
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Plain message response
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health
        .route("/Test", get(health::test))
        .route("/health", get(health::readiness_check))
        // Authentication
        .route("/Auth/register", post(auth::register))
        .route("/Auth/login", post(auth::login))
        .route("/Auth/confirm-email", get(auth::confirm_email))
        // Books (catalog)
        .route("/Books", get(books::list_books).post(books::add_book))
        .route("/Books/GetBook/:id", get(books::get_book))
        .route("/Books/GetRecommendedBooks", get(books::get_recommended_books))
        .route("/Books/:id/cover", get(books::get_cover))
        // Reservations
        .route(
            "/Reservation",
            get(reservations::list_reservations).post(reservations::create_reservation),
        )
        .route(
            "/Reservation/GetPendingReservations",
            get(reservations::get_pending_reservations),
        )
        .route(
            "/Reservation/GetPendingReturns",
            get(reservations::get_pending_returns),
        )
        .route(
            "/Reservation/GetUserReservations",
            get(reservations::get_user_reservations),
        )
        .route(
            "/Reservation/ClaimReservation/:id",
            put(reservations::claim_reservation),
        )
        .route(
            "/Reservation/ReturnReservation/:id",
            put(reservations::return_reservation),
        )
        .route(
            "/Reservation/ExtendReservation/:id",
            put(reservations::extend_reservation),
        )
        .route(
            "/Reservation/:id",
            get(reservations::get_reservation)
                .put(reservations::update_reservation)
                .delete(reservations::delete_reservation),
        )
        .route("/Reservation/:id/expire", post(reservations::expire_reservation))
        // Administration
        .route("/Admin/GetUsersEmails", get(admin::get_users_emails))
        .route("/Admin/GetUser", get(admin::get_user))
        .route("/Admin/UpdateUserRole", post(admin::update_user_role))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .merge(openapi::create_openapi_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
