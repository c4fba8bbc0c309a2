//! Catalog endpoints

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::{
    error::AppResult,
    models::book::{Book, CreateBook, RecommendedQuery},
};

use super::{ApiJson, ApiPath, ApiQuery, AuthenticatedUser};

/// List all books
#[utoipa::path(
    get,
    path = "/Books",
    tag = "books",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All books ordered by title", body = Vec<Book>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.catalog.list_books().await?;
    Ok(Json(books))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/Books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid book or cover image"),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn add_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiJson(book): ApiJson<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    claims.require_admin()?;

    let created = state.services.catalog.add_book(book).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Get book by ID
#[utoipa::path(
    get,
    path = "/Books/GetBook/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Books ordered for a user, genres they reserved before first
#[utoipa::path(
    get,
    path = "/Books/GetRecommendedBooks",
    tag = "books",
    security(("bearer_auth" = [])),
    params(RecommendedQuery),
    responses(
        (status = 200, description = "Recommended books", body = Vec<Book>),
        (status = 400, description = "Missing user ID"),
        (status = 403, description = "Not allowed to view this user's recommendations")
    )
)]
pub async fn get_recommended_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ApiQuery(query): ApiQuery<RecommendedQuery>,
) -> AppResult<Json<Vec<Book>>> {
    claims.require_self_or_admin(query.user_id)?;

    let books = state.services.catalog.recommended_books(query.user_id).await?;
    Ok(Json(books))
}

/// Raw cover image, served without authentication so it can be used in `<img>` tags
#[utoipa::path(
    get,
    path = "/Books/{id}/cover",
    tag = "books",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Cover image bytes", content_type = "image/*"),
        (status = 404, description = "Book or cover not found")
    )
)]
pub async fn get_cover(
    State(state): State<crate::AppState>,
    ApiPath(id): ApiPath<i32>,
) -> AppResult<impl IntoResponse> {
    let cover = state.services.catalog.get_cover(id).await?;
    Ok(([(header::CONTENT_TYPE, cover.mime_type)], cover.data))
}
