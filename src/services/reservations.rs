//! Reservation management service

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::reservation::{
        CreateReservation, LoanPolicy, Reservation, ReservationDetails, SweepReport,
        UpdateReservation,
    },
    repository::{reservations::DetailsFilter, Repository},
};

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
    policy: LoanPolicy,
}

impl ReservationsService {
    pub fn new(repository: Repository, policy: LoanPolicy) -> Self {
        Self { repository, policy }
    }

    pub async fn list(&self) -> AppResult<Vec<Reservation>> {
        self.repository.reservations.list().await
    }

    pub async fn get(&self, id: i32) -> AppResult<Reservation> {
        self.repository.reservations.get_by_id(id).await
    }

    /// Reservations waiting to be picked up
    pub async fn pending_claims(&self) -> AppResult<Vec<ReservationDetails>> {
        self.repository
            .reservations
            .list_details(DetailsFilter::PendingClaims)
            .await
    }

    /// Books out on loan
    pub async fn pending_returns(&self) -> AppResult<Vec<ReservationDetails>> {
        self.repository
            .reservations
            .list_details(DetailsFilter::PendingReturns)
            .await
    }

    pub async fn user_reservations(&self, user_id: Uuid) -> AppResult<Vec<ReservationDetails>> {
        // Verify user exists
        self.repository.users.get_by_id(user_id).await?;
        self.repository
            .reservations
            .list_details(DetailsFilter::ForUser(user_id))
            .await
    }

    /// Reserve an available book
    pub async fn create(&self, request: &CreateReservation) -> AppResult<Reservation> {
        // Verify user exists
        self.repository.users.get_by_id(request.user_id).await?;

        let new = self
            .policy
            .reserve(request.user_id, request.book_id, Utc::now());
        let reservation = self.repository.reservations.create(&new).await?;

        tracing::info!(
            reservation_id = reservation.id,
            book_id = reservation.book_id,
            user_id = %reservation.user_id,
            "Reservation created"
        );
        Ok(reservation)
    }

    /// The user picked the book up
    pub async fn claim(&self, id: i32) -> AppResult<Reservation> {
        let now = Utc::now();
        let policy = self.policy;
        let reservation = self
            .repository
            .reservations
            .transition(id, move |r| policy.claim(r, now))
            .await?;
        tracing::info!(reservation_id = id, due_date = ?reservation.due_date, "Reservation claimed");
        Ok(reservation)
    }

    /// The book came back
    pub async fn return_book(&self, id: i32) -> AppResult<Reservation> {
        let now = Utc::now();
        let policy = self.policy;
        let reservation = self
            .repository
            .reservations
            .transition(id, move |r| policy.return_book(r, now))
            .await?;
        tracing::info!(reservation_id = id, book_id = reservation.book_id, "Reservation returned");
        Ok(reservation)
    }

    pub async fn extend(&self, id: i32) -> AppResult<Reservation> {
        let now = Utc::now();
        let policy = self.policy;
        let reservation = self
            .repository
            .reservations
            .transition(id, move |r| policy.extend(r, now))
            .await?;
        tracing::info!(reservation_id = id, due_date = ?reservation.due_date, "Reservation extended");
        Ok(reservation)
    }

    pub async fn expire(&self, id: i32) -> AppResult<Reservation> {
        let policy = self.policy;
        let reservation = self
            .repository
            .reservations
            .transition(id, move |r| {
                policy.expire(r);
                Ok(())
            })
            .await?;
        tracing::info!(reservation_id = id, "Reservation marked expired");
        Ok(reservation)
    }

    pub async fn update(&self, id: i32, update: UpdateReservation) -> AppResult<Reservation> {
        let policy = self.policy;
        self.repository
            .reservations
            .transition(id, move |r| {
                policy.apply_update(r, &update);
                Ok(())
            })
            .await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.reservations.delete(id).await?;
        tracing::info!(reservation_id = id, "Reservation deleted");
        Ok(())
    }

    /// Expire and remove reservations not claimed in time
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        self.repository.reservations.sweep_expired(now).await
    }
}
