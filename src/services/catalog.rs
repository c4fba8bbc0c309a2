//! Catalog service

use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{rank_recommended, Book, CoverImage, CreateBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list().await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Add a book to the catalog
    pub async fn add_book(&self, book: CreateBook) -> AppResult<Book> {
        book.validate()?;
        let cover = book.cover()?;
        let created = self.repository.books.create(&book, cover).await?;
        tracing::info!(book_id = created.id, title = %created.title, "Book added");
        Ok(created)
    }

    pub async fn get_cover(&self, id: i32) -> AppResult<CoverImage> {
        self.repository.books.get_cover(id).await
    }

    /// All books, the ones in genres the user reserved before first
    pub async fn recommended_books(&self, user_id: Uuid) -> AppResult<Vec<Book>> {
        if user_id.is_nil() {
            return Err(AppError::Validation("User ID is required.".to_string()));
        }
        let books = self.repository.books.list().await?;
        let genres = self.repository.books.reserved_genres(user_id).await?;
        Ok(rank_recommended(books, &genres))
    }
}
