//! Book (catalog) model and related types

use axum::http::HeaderValue;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Internal row structure, the cover is stored as raw bytes
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub genre: String,
    pub publisher: String,
    pub pages: Option<i32>,
    pub language: String,
    pub description: String,
    pub published_date: Option<DateTime<Utc>>,
    pub is_available: bool,
    pub image_data: Option<Vec<u8>>,
    pub image_mime_type: Option<String>,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Book {
            id: row.id,
            title: row.title,
            author: row.author,
            isbn: row.isbn,
            genre: row.genre,
            publisher: row.publisher,
            pages: row.pages,
            language: row.language,
            description: row.description,
            published_date: row.published_date,
            is_available: row.is_available,
            image_base64: row.image_data.map(|data| STANDARD.encode(data)),
            image_mime_type: row.image_mime_type,
        }
    }
}

/// Book as exposed by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub genre: String,
    pub publisher: String,
    pub pages: Option<i32>,
    pub language: String,
    pub description: String,
    pub published_date: Option<DateTime<Utc>>,
    pub is_available: bool,
    /// Cover image, base64 encoded
    pub image_base64: Option<String>,
    pub image_mime_type: Option<String>,
}

/// Add book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[serde(default)]
    pub author: String,
    pub isbn: Option<String>,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub publisher: String,
    #[validate(range(min = 1, message = "Page count must be positive"))]
    pub pages: Option<i32>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub description: String,
    pub published_date: Option<DateTime<Utc>>,
    pub image_base64: Option<String>,
    pub image_mime_type: Option<String>,
}

/// Decoded cover image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

impl CreateBook {
    /// Decode the base64 cover payload, if any
    pub fn cover(&self) -> AppResult<Option<CoverImage>> {
        let Some(ref encoded) = self.image_base64 else {
            return Ok(None);
        };
        if encoded.is_empty() {
            return Ok(None);
        }

        // Accept data URLs as produced by browsers ("data:image/png;base64,...")
        let (mime_from_url, payload) = match encoded.strip_prefix("data:") {
            Some(rest) => match rest.split_once(";base64,") {
                Some((mime, payload)) => (Some(mime.to_string()), payload),
                None => {
                    return Err(AppError::Validation(
                        "Image data URL must be base64 encoded".to_string(),
                    ))
                }
            },
            None => (None, encoded.as_str()),
        };

        let mime_type = self
            .image_mime_type
            .clone()
            .or(mime_from_url)
            .ok_or_else(|| AppError::Validation("Image MIME type is required".to_string()))?;
        let mime_type = image_mime_type(&mime_type)?;

        let data = STANDARD
            .decode(payload.trim())
            .map_err(|e| AppError::Validation(format!("Invalid base64 image: {}", e)))?;

        Ok(Some(CoverImage { data, mime_type }))
    }
}

/// Normalize an `image/<subtype>` MIME type; it is served back as a Content-Type header
fn image_mime_type(raw: &str) -> AppResult<String> {
    let mime_type = raw.trim().to_ascii_lowercase();
    let valid = mime_type
        .strip_prefix("image/")
        .filter(|subtype| !subtype.is_empty())
        .map(|subtype| {
            subtype
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.' | '_'))
        })
        .unwrap_or(false);

    if !valid || HeaderValue::from_str(&mime_type).is_err() {
        return Err(AppError::Validation(format!(
            "Unsupported image MIME type: {}",
            raw.escape_default()
        )));
    }
    Ok(mime_type)
}

/// Query for recommended books
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedQuery {
    pub user_id: Uuid,
}

/// Order books so that the ones matching a previously reserved genre come first,
/// each group sorted by title
pub fn rank_recommended(mut books: Vec<Book>, reserved_genres: &[String]) -> Vec<Book> {
    let genres: Vec<String> = reserved_genres
        .iter()
        .filter(|g| !g.is_empty())
        .map(|g| g.to_lowercase())
        .collect();

    books.sort_by_cached_key(|book| {
        let genre = book.genre.to_lowercase();
        let matches = genres.iter().any(|g| genre.contains(g.as_str()));
        (!matches, book.title.clone())
    });
    books
}
