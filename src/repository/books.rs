//! Books repository for database operations

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookRow, CoverImage, CreateBook},
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get all books ordered by title
    pub async fn list(&self) -> AppResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, BookRow>("SELECT * FROM books ORDER BY title, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Book::from).collect())
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, BookRow>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Book::from)
            .ok_or_else(|| AppError::NotFound(format!("Book with ID {} not found.", id)))
    }

    /// Insert a new book, available by default
    pub async fn create(&self, book: &CreateBook, cover: Option<CoverImage>) -> AppResult<Book> {
        let (image_data, image_mime_type) = match cover {
            Some(cover) => (Some(cover.data), Some(cover.mime_type)),
            None => (None, None),
        };

        let row = sqlx::query_as::<_, BookRow>(
            r#"
            INSERT INTO books (
                title, author, isbn, genre, publisher, pages, language,
                description, published_date, is_available, image_data, image_mime_type
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, TRUE, $10, $11)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.genre)
        .bind(&book.publisher)
        .bind(book.pages)
        .bind(&book.language)
        .bind(&book.description)
        .bind(book.published_date)
        .bind(image_data)
        .bind(image_mime_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    /// Get the raw cover image of a book
    pub async fn get_cover(&self, id: i32) -> AppResult<CoverImage> {
        let row: Option<(Option<Vec<u8>>, Option<String>)> =
            sqlx::query_as("SELECT image_data, image_mime_type FROM books WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            None => Err(AppError::NotFound(format!("Book with ID {} not found.", id))),
            Some((Some(data), Some(mime_type))) => Ok(CoverImage { data, mime_type }),
            Some(_) => Err(AppError::NotFound(format!(
                "Book with ID {} has no cover image",
                id
            ))),
        }
    }

    /// Distinct lowercase genres of the books a user has reserved
    pub async fn reserved_genres(&self, user_id: Uuid) -> AppResult<Vec<String>> {
        let genres = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT LOWER(b.genre)
            FROM reservations r
            JOIN books b ON b.id = r.book_id
            WHERE r.user_id = $1 AND b.genre <> ''
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(genres)
    }
}
