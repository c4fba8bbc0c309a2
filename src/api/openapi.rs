//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{admin, auth, books, health, reservations};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library API",
        version = "1.0.0",
        description = "Public library catalog and reservation REST API"
    ),
    servers(
        (url = "/api", description = "API")
    ),
    paths(
        // Health
        health::test,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::confirm_email,
        // Books
        books::list_books,
        books::add_book,
        books::get_book,
        books::get_recommended_books,
        books::get_cover,
        // Reservations
        reservations::list_reservations,
        reservations::create_reservation,
        reservations::get_reservation,
        reservations::update_reservation,
        reservations::delete_reservation,
        reservations::get_pending_reservations,
        reservations::get_pending_returns,
        reservations::get_user_reservations,
        reservations::claim_reservation,
        reservations::return_reservation,
        reservations::extend_reservation,
        reservations::expire_reservation,
        // Admin
        admin::get_users_emails,
        admin::get_user,
        admin::update_user_role,
    ),
    components(
        schemas(
            // Auth
            crate::models::user::RegisterUser,
            crate::models::user::LoginRequest,
            crate::services::auth::LoginResponse,
            // Books
            crate::models::book::Book,
            crate::models::book::CreateBook,
            // Reservations
            crate::models::reservation::Reservation,
            crate::models::reservation::ReservationState,
            crate::models::reservation::ReservationDetails,
            crate::models::reservation::CreateReservation,
            crate::models::reservation::UpdateReservation,
            // Users
            crate::models::user::Role,
            crate::models::user::UserSummary,
            crate::models::user::UserAccount,
            crate::models::user::UserWithRoles,
            crate::models::user::UpdateUserRole,
            admin::RoleUpdated,
            // Health
            health::HealthResponse,
            // Common
            crate::api::MessageResponse,
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration and login"),
        (name = "books", description = "Catalog"),
        (name = "reservations", description = "Reservation lifecycle"),
        (name = "admin", description = "User administration")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
