//! Reservations repository for database operations
//!
//! Every state change runs in one transaction: the reservation row is locked
//! with `FOR UPDATE`, the change is written, and the availability flag of the
//! book is recomputed from the reservations that still hold it.

use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, Pool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookRow},
        reservation::{NewReservation, Reservation, ReservationDetails, SweepReport},
        user::UserSummary,
    },
};

const DETAILS_SELECT: &str = r#"
    SELECT r.*,
           u.email AS user_email, u.username AS user_username,
           b.title, b.author, b.isbn, b.genre, b.publisher, b.pages, b.language,
           b.description, b.published_date, b.is_available, b.image_data, b.image_mime_type
    FROM reservations r
    JOIN users u ON u.id = r.user_id
    JOIN books b ON b.id = r.book_id
"#;

/// Which reservations a details listing returns
#[derive(Debug, Clone, Copy)]
pub enum DetailsFilter {
    /// Waiting to be picked up
    PendingClaims,
    /// Picked up, not returned yet
    PendingReturns,
    ForUser(Uuid),
}

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get all reservations
    pub async fn list(&self) -> AppResult<Vec<Reservation>> {
        let reservations =
            sqlx::query_as::<_, Reservation>("SELECT * FROM reservations ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(reservations)
    }

    /// Get reservation by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Reservations joined with their user and book
    pub async fn list_details(&self, filter: DetailsFilter) -> AppResult<Vec<ReservationDetails>> {
        let (condition, user_id) = match filter {
            DetailsFilter::PendingClaims => (
                "NOT r.is_claimed AND NOT r.is_expired AND NOT r.is_returned",
                None,
            ),
            DetailsFilter::PendingReturns => ("r.is_claimed AND NOT r.is_returned", None),
            DetailsFilter::ForUser(id) => ("r.user_id = $1", Some(id)),
        };

        let query = format!(
            "{} WHERE {} ORDER BY r.reservation_date, r.id",
            DETAILS_SELECT, condition
        );

        let mut builder = sqlx::query(&query);
        if let Some(id) = user_id {
            builder = builder.bind(id);
        }
        let rows = builder.fetch_all(&self.pool).await?;

        rows.iter()
            .map(details_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(AppError::from)
    }

    /// Insert a reservation and take the book off the shelf.
    ///
    /// The book row is locked first, so of two concurrent reservations on the
    /// same book only one can see it available.
    pub async fn create(&self, new: &NewReservation) -> AppResult<Reservation> {
        let mut tx = self.pool.begin().await?;

        let available: Option<bool> =
            sqlx::query_scalar("SELECT is_available FROM books WHERE id = $1 FOR UPDATE")
                .bind(new.book_id)
                .fetch_optional(&mut *tx)
                .await?;

        match available {
            None => {
                return Err(AppError::NotFound(format!(
                    "Book with ID {} not found.",
                    new.book_id
                )))
            }
            Some(false) => {
                return Err(AppError::Conflict(format!(
                    "Book with ID {} is not available",
                    new.book_id
                )))
            }
            Some(true) => {}
        }

        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (
                user_id, book_id, reservation_date, expiration_date,
                is_expired, is_claimed, is_returned
            )
            VALUES ($1, $2, $3, $4, FALSE, FALSE, FALSE)
            RETURNING *
            "#,
        )
        .bind(new.user_id)
        .bind(new.book_id)
        .bind(new.reservation_date)
        .bind(new.expiration_date)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE books SET is_available = FALSE WHERE id = $1")
            .bind(new.book_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(reservation)
    }

    /// Lock a reservation, apply `change` to it and persist the result.
    ///
    /// When `change` fails nothing is written.
    pub async fn transition<F>(&self, id: i32, change: F) -> AppResult<Reservation>
    where
        F: FnOnce(&mut Reservation) -> AppResult<()> + Send,
    {
        let mut tx = self.pool.begin().await?;

        let mut reservation = lock(&mut tx, id).await?;
        change(&mut reservation)?;

        sqlx::query(
            r#"
            UPDATE reservations
            SET due_date = $2, returned_date = $3,
                is_expired = $4, is_claimed = $5, is_returned = $6
            WHERE id = $1
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.due_date)
        .bind(reservation.returned_date)
        .bind(reservation.is_expired)
        .bind(reservation.is_claimed)
        .bind(reservation.is_returned)
        .execute(&mut *tx)
        .await?;

        refresh_availability(&mut tx, reservation.book_id).await?;

        tx.commit().await?;
        Ok(reservation)
    }

    /// Delete a reservation regardless of its state
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let reservation = lock(&mut tx, id).await?;

        sqlx::query("DELETE FROM reservations WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        refresh_availability(&mut tx, reservation.book_id).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Expire every unclaimed reservation whose claim deadline passed before
    /// `now`, then delete all expired, unreturned reservations (including the
    /// ones expired by staff earlier) and release their books.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        let mut tx = self.pool.begin().await?;

        let mut expired: Vec<i32> = sqlx::query_scalar(
            r#"
            UPDATE reservations
            SET is_expired = TRUE
            WHERE expiration_date < $1
              AND NOT is_claimed AND NOT is_expired AND NOT is_returned
            RETURNING id
            "#,
        )
        .bind(now)
        .fetch_all(&mut *tx)
        .await?;
        expired.sort_unstable();

        let removed: Vec<(i32, i32)> = sqlx::query_as(
            "DELETE FROM reservations WHERE is_expired AND NOT is_returned RETURNING id, book_id",
        )
        .fetch_all(&mut *tx)
        .await?;

        let mut deleted: Vec<i32> = removed.iter().map(|(id, _)| *id).collect();
        deleted.sort_unstable();
        let mut book_ids: Vec<i32> = removed.iter().map(|(_, book_id)| *book_id).collect();
        book_ids.sort_unstable();
        book_ids.dedup();

        let mut released_books = Vec::with_capacity(book_ids.len());
        for book_id in book_ids {
            if refresh_availability(&mut tx, book_id).await? {
                released_books.push(book_id);
            }
        }

        tx.commit().await?;

        Ok(SweepReport {
            expired,
            deleted,
            released_books,
        })
    }
}

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Reservation with ID {} not found", id))
}

async fn lock(tx: &mut Transaction<'_, Postgres>, id: i32) -> AppResult<Reservation> {
    sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| not_found(id))
}

/// Recompute a book's availability from the reservations still holding it.
/// Returns the new value.
async fn refresh_availability(tx: &mut Transaction<'_, Postgres>, book_id: i32) -> AppResult<bool> {
    let available: Option<bool> = sqlx::query_scalar(
        r#"
        UPDATE books
        SET is_available = NOT EXISTS (
            SELECT 1 FROM reservations
            WHERE book_id = $1 AND NOT is_returned AND NOT is_expired
        )
        WHERE id = $1
        RETURNING is_available
        "#,
    )
    .bind(book_id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(available.unwrap_or(false))
}

fn details_from_row(row: &PgRow) -> Result<ReservationDetails, sqlx::Error> {
    let reservation = Reservation {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        book_id: row.try_get("book_id")?,
        reservation_date: row.try_get("reservation_date")?,
        expiration_date: row.try_get("expiration_date")?,
        due_date: row.try_get("due_date")?,
        returned_date: row.try_get("returned_date")?,
        is_expired: row.try_get("is_expired")?,
        is_claimed: row.try_get("is_claimed")?,
        is_returned: row.try_get("is_returned")?,
    };

    let user = UserSummary {
        id: reservation.user_id,
        email: row.try_get("user_email")?,
        username: row.try_get("user_username")?,
    };

    let book: Book = BookRow {
        id: reservation.book_id,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        isbn: row.try_get("isbn")?,
        genre: row.try_get("genre")?,
        publisher: row.try_get("publisher")?,
        pages: row.try_get("pages")?,
        language: row.try_get("language")?,
        description: row.try_get("description")?,
        published_date: row.try_get("published_date")?,
        is_available: row.try_get("is_available")?,
        image_data: row.try_get("image_data")?,
        image_mime_type: row.try_get("image_mime_type")?,
    }
    .into();

    Ok(ReservationDetails {
        reservation,
        user,
        book,
    })
}
