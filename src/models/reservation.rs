//! Reservation model and lifecycle rules
//!
//! A reservation moves through `Reserved -> Claimed -> Returned`, or
//! `Reserved -> Expired` when it is not picked up in time. The rules here are
//! pure functions of the current row and an explicit `now`; the repository
//! applies them inside a transaction holding a lock on the row.

use chrono::{DateTime, Duration, Utc};
use config::ConfigError;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::book::Book;
use super::user::UserSummary;
use crate::{
    config::ReservationsConfig,
    error::{AppError, AppResult},
};

/// Reservation row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: i32,
    pub user_id: Uuid,
    pub book_id: i32,
    pub reservation_date: DateTime<Utc>,
    /// Deadline to claim the book
    pub expiration_date: DateTime<Utc>,
    /// Set once claimed
    pub due_date: Option<DateTime<Utc>>,
    pub returned_date: Option<DateTime<Utc>>,
    pub is_expired: bool,
    pub is_claimed: bool,
    pub is_returned: bool,
}

/// Lifecycle state derived from the reservation flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum ReservationState {
    Reserved,
    Claimed,
    Returned,
    Expired,
}

impl Reservation {
    pub fn state(&self) -> ReservationState {
        if self.is_returned {
            ReservationState::Returned
        } else if self.is_expired {
            ReservationState::Expired
        } else if self.is_claimed {
            ReservationState::Claimed
        } else {
            ReservationState::Reserved
        }
    }

    /// Whether this reservation keeps its book unavailable
    pub fn holds_book(&self) -> bool {
        matches!(
            self.state(),
            ReservationState::Reserved | ReservationState::Claimed
        )
    }

    /// Unclaimed reservation whose claim deadline has passed and that the
    /// sweeper has not handled yet
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date < now && !self.is_claimed && !self.is_expired && !self.is_returned
    }
}

/// Values of a reservation about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewReservation {
    pub user_id: Uuid,
    pub book_id: i32,
    pub reservation_date: DateTime<Utc>,
    pub expiration_date: DateTime<Utc>,
}

/// Partial update, unspecified fields keep their value
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReservation {
    pub due_date: Option<DateTime<Utc>>,
    pub is_expired: Option<bool>,
}

/// Create reservation request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservation {
    pub book_id: i32,
    pub user_id: Uuid,
}

/// Reservation with its user and book, as shown to staff and on "my reservations"
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDetails {
    pub reservation: Reservation,
    pub user: UserSummary,
    pub book: Book,
}

/// Outcome of one expiry sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Flagged expired in this sweep
    pub expired: Vec<i32>,
    /// Removed in this sweep, including rows expired earlier by staff
    pub deleted: Vec<i32>,
    /// Books available again afterwards
    pub released_books: Vec<i32>,
}

/// Durations governing the reservation lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanPolicy {
    pub claim_window: Duration,
    pub loan_period: Duration,
    pub extension: Duration,
    pub extension_window: Duration,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            claim_window: Duration::days(1),
            loan_period: Duration::days(7),
            extension: Duration::days(7),
            extension_window: Duration::days(2),
        }
    }
}

impl TryFrom<&ReservationsConfig> for LoanPolicy {
    type Error = ConfigError;

    fn try_from(config: &ReservationsConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            claim_window: config.claim_window()?,
            loan_period: config.loan_period()?,
            extension: config.extension()?,
            extension_window: config.extension_window()?,
        })
    }
}

impl LoanPolicy {
    /// A fresh reservation: unclaimed, unexpired, unreturned
    pub fn reserve(&self, user_id: Uuid, book_id: i32, now: DateTime<Utc>) -> NewReservation {
        NewReservation {
            user_id,
            book_id,
            reservation_date: now,
            expiration_date: now + self.claim_window,
        }
    }

    /// Start the loan period.
    ///
    /// A reservation past its expiration date that the sweeper has not flagged
    /// yet can still be claimed.
    pub fn claim(&self, reservation: &mut Reservation, now: DateTime<Utc>) -> AppResult<()> {
        match reservation.state() {
            ReservationState::Reserved => {}
            ReservationState::Claimed => {
                return Err(AppError::Validation(
                    "Reservation has already been claimed".to_string(),
                ))
            }
            ReservationState::Returned => {
                return Err(AppError::Validation(
                    "Reservation has already been returned".to_string(),
                ))
            }
            ReservationState::Expired => {
                return Err(AppError::Validation("Reservation has expired".to_string()))
            }
        }

        reservation.is_claimed = true;
        reservation.due_date = Some(now + self.loan_period);
        Ok(())
    }

    /// Close the loan
    pub fn return_book(&self, reservation: &mut Reservation, now: DateTime<Utc>) -> AppResult<()> {
        if reservation.is_returned {
            return Err(AppError::Validation(
                "Reservation has already been returned".to_string(),
            ));
        }
        if !reservation.is_claimed {
            return Err(AppError::Validation(
                "Reservation has not been claimed".to_string(),
            ));
        }

        reservation.is_claimed = false;
        reservation.is_returned = true;
        reservation.returned_date = Some(now);
        Ok(())
    }

    /// Push the due date back, only accepted within the extension window
    pub fn extend(&self, reservation: &mut Reservation, now: DateTime<Utc>) -> AppResult<()> {
        let due_date = reservation
            .due_date
            .ok_or_else(|| AppError::Validation("No due date set for this reservation".to_string()))?;

        if reservation.is_returned {
            return Err(AppError::Validation(
                "Reservation has already been returned".to_string(),
            ));
        }
        if reservation.is_expired || due_date < now {
            return Err(AppError::Validation(
                "Reservation has already expired".to_string(),
            ));
        }
        if due_date > now + self.extension_window {
            return Err(AppError::Validation(
                "Reservation is not yet close to expiration".to_string(),
            ));
        }

        reservation.due_date = Some(due_date + self.extension);
        Ok(())
    }

    /// Flag the reservation expired. Returns true when this releases the book.
    pub fn expire(&self, reservation: &mut Reservation) -> bool {
        let held = reservation.holds_book();
        reservation.is_expired = true;
        held && !reservation.is_returned
    }

    /// Apply a partial update, last write wins
    pub fn apply_update(&self, reservation: &mut Reservation, update: &UpdateReservation) {
        if let Some(due_date) = update.due_date {
            reservation.due_date = Some(due_date);
        }
        if let Some(is_expired) = update.is_expired {
            reservation.is_expired = is_expired;
        }
    }
}
