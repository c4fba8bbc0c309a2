//! Background expiry of reservations that were never picked up

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use crate::{
    error::AppResult,
    models::reservation::SweepReport,
    services::reservations::ReservationsService,
};

/// Something that can expire stale reservations as of `now`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExpirySweep: Send + Sync {
    async fn sweep(&self, now: DateTime<Utc>) -> AppResult<SweepReport>;
}

#[async_trait]
impl ExpirySweep for ReservationsService {
    async fn sweep(&self, now: DateTime<Utc>) -> AppResult<SweepReport> {
        self.sweep_expired(now).await
    }
}

/// Runs an [`ExpirySweep`] on a fixed interval until shutdown
pub struct ReservationSweeper<S> {
    target: S,
    interval: Duration,
}

impl<S: ExpirySweep + 'static> ReservationSweeper<S> {
    pub fn new(target: S, interval: Duration) -> Self {
        Self { target, interval }
    }

    /// One sweep. Failures are logged and left for the next tick.
    pub async fn run_once(&self) -> Option<SweepReport> {
        match self.target.sweep(Utc::now()).await {
            Ok(report) => {
                if !report.deleted.is_empty() {
                    tracing::info!(
                        expired = report.expired.len(),
                        deleted = report.deleted.len(),
                        released_books = ?report.released_books,
                        "Expired stale reservations"
                    );
                }
                Some(report)
            }
            Err(e) => {
                tracing::error!("Reservation sweep failed: {}", e);
                None
            }
        }
    }

    /// Start the loop. It stops once `true` is sent on `shutdown` or the sender is dropped.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(interval_secs = self.interval.as_secs(), "Reservation sweeper started");

            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        self.run_once().await;
                    }
                }
            }

            tracing::info!("Reservation sweeper stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    #[tokio::test]
    async fn test_run_once_swallows_errors() {
        let mut target = MockExpirySweep::new();
        target
            .expect_sweep()
            .times(1)
            .returning(|_| Err(AppError::Internal("store unavailable".to_string())));

        let sweeper = ReservationSweeper::new(target, Duration::from_secs(600));
        assert_eq!(sweeper.run_once().await, None);
    }

    #[tokio::test]
    async fn test_run_once_returns_report() {
        let mut target = MockExpirySweep::new();
        target.expect_sweep().times(1).returning(|_| {
            Ok(SweepReport {
                expired: vec![3, 4],
                deleted: vec![2, 3, 4],
                released_books: vec![5],
            })
        });

        let sweeper = ReservationSweeper::new(target, Duration::from_secs(600));
        let report = sweeper.run_once().await.unwrap();
        assert_eq!(report.expired, vec![3, 4]);
        assert_eq!(report.deleted, vec![2, 3, 4]);
        assert_eq!(report.released_books, vec![5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_keeps_ticking_after_failure_and_stops_on_shutdown() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let mut target = MockExpirySweep::new();
        target.expect_sweep().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(AppError::Internal("store unavailable".to_string()))
            } else {
                Ok(SweepReport::default())
            }
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = ReservationSweeper::new(target, Duration::from_secs(600)).spawn(shutdown_rx);

        // Ticks at 0s, 600s and 1200s
        tokio::time::sleep(Duration::from_secs(1250)).await;
        tokio_test::assert_ok!(shutdown_tx.send(true));
        handle.await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
