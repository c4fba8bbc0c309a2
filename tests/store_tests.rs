//! Store tests against a real Postgres database
//!
//! Each test gets a fresh database with the migrations applied.
//! Run with: DATABASE_URL=postgres://... cargo test -- --ignored

use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::PgPool;

use library_server::{
    config::AppConfig,
    error::AppError,
    models::{
        book::CreateBook,
        reservation::{CreateReservation, LoanPolicy, UpdateReservation},
        user::{RegisterUser, User},
    },
    repository::Repository,
    services::{email::LogNotifier, Services},
};

fn services(pool: PgPool) -> Services {
    Services::new(Repository::new(pool), &AppConfig::default(), Arc::new(LogNotifier)).unwrap()
}

fn policy() -> LoanPolicy {
    LoanPolicy::try_from(&AppConfig::default().reservations).unwrap()
}

async fn reader(services: &Services, name: &str) -> User {
    services
        .repository
        .users
        .create(&format!("{}@example.org", name), name, "hash")
        .await
        .unwrap()
}

async fn shelved_book(services: &Services) -> i32 {
    let book = CreateBook {
        title: "Dune".to_string(),
        author: "Frank Herbert".to_string(),
        isbn: None,
        genre: "Science Fiction".to_string(),
        publisher: "Chilton".to_string(),
        pages: Some(412),
        language: "English".to_string(),
        description: String::new(),
        published_date: None,
        image_base64: None,
        image_mime_type: None,
    };
    let book = services.repository.books.create(&book, None).await.unwrap();
    assert!(book.is_available);
    book.id
}

async fn is_available(services: &Services, book_id: i32) -> bool {
    services.catalog.get_book(book_id).await.unwrap().is_available
}

#[sqlx::test]
#[ignore]
async fn test_reserve_claim_return_flips_availability(pool: PgPool) {
    let services = services(pool);
    let user = reader(&services, "reader").await;
    let book_id = shelved_book(&services).await;
    let request = CreateReservation { book_id, user_id: user.id };

    let reservation = services.reservations.create(&request).await.unwrap();
    assert!(!is_available(&services, book_id).await);

    let second = services.reservations.create(&request).await;
    assert!(matches!(second, Err(AppError::Conflict(_))));

    let claimed = services.reservations.claim(reservation.id).await.unwrap();
    assert!(claimed.is_claimed);
    assert!(claimed.due_date.is_some());
    assert!(!is_available(&services, book_id).await);

    let returned = services.reservations.return_book(reservation.id).await.unwrap();
    assert!(returned.is_returned);
    assert!(returned.returned_date.is_some());
    assert!(is_available(&services, book_id).await);

    // Shelved again, so a new reservation goes through
    services.reservations.create(&request).await.unwrap();
    assert!(!is_available(&services, book_id).await);
}

#[sqlx::test]
#[ignore]
async fn test_expire_update_and_delete_recompute_availability(pool: PgPool) {
    let services = services(pool);
    let user = reader(&services, "reader").await;
    let book_id = shelved_book(&services).await;
    let request = CreateReservation { book_id, user_id: user.id };

    let reservation = services.reservations.create(&request).await.unwrap();

    services.reservations.expire(reservation.id).await.unwrap();
    assert!(is_available(&services, book_id).await);

    let update = UpdateReservation { due_date: None, is_expired: Some(false) };
    services.reservations.update(reservation.id, update).await.unwrap();
    assert!(!is_available(&services, book_id).await);

    services.reservations.delete(reservation.id).await.unwrap();
    assert!(is_available(&services, book_id).await);
    assert!(matches!(
        services.reservations.get(reservation.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[sqlx::test]
#[ignore]
async fn test_reserving_unknown_book_is_not_found(pool: PgPool) {
    let services = services(pool);
    let user = reader(&services, "reader").await;

    let result = services
        .reservations
        .create(&CreateReservation { book_id: 4242, user_id: user.id })
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[sqlx::test]
#[ignore]
async fn test_sweep_removes_unclaimed_reservation_after_deadline(pool: PgPool) {
    let services = services(pool);
    let user = reader(&services, "reader").await;
    let book_id = shelved_book(&services).await;

    let reservation = services
        .reservations
        .create(&CreateReservation { book_id, user_id: user.id })
        .await
        .unwrap();
    let t0 = reservation.reservation_date;

    let early = services.reservations.sweep_expired(t0 + Duration::hours(23)).await.unwrap();
    assert!(early.expired.is_empty());
    assert!(early.deleted.is_empty());
    assert!(!is_available(&services, book_id).await);

    let late = services.reservations.sweep_expired(t0 + Duration::hours(25)).await.unwrap();
    assert_eq!(late.expired, vec![reservation.id]);
    assert_eq!(late.deleted, vec![reservation.id]);
    assert_eq!(late.released_books, vec![book_id]);

    assert!(is_available(&services, book_id).await);
    assert!(matches!(
        services.reservations.get(reservation.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[sqlx::test]
#[ignore]
async fn test_sweep_removes_reservations_expired_by_staff(pool: PgPool) {
    let services = services(pool);
    let user = reader(&services, "reader").await;
    let expired_book = shelved_book(&services).await;
    let flagged_book = shelved_book(&services).await;

    let expired = services
        .reservations
        .create(&CreateReservation { book_id: expired_book, user_id: user.id })
        .await
        .unwrap();
    services.reservations.expire(expired.id).await.unwrap();

    let flagged = services
        .reservations
        .create(&CreateReservation { book_id: flagged_book, user_id: user.id })
        .await
        .unwrap();
    let update = UpdateReservation { due_date: None, is_expired: Some(true) };
    services.reservations.update(flagged.id, update).await.unwrap();

    let report = services.reservations.sweep_expired(Utc::now()).await.unwrap();

    assert!(report.expired.is_empty());
    let mut deleted = vec![expired.id, flagged.id];
    deleted.sort_unstable();
    assert_eq!(report.deleted, deleted);
    let mut released = vec![expired_book, flagged_book];
    released.sort_unstable();
    assert_eq!(report.released_books, released);
    assert!(is_available(&services, expired_book).await);
    assert!(is_available(&services, flagged_book).await);
    assert!(services.reservations.list().await.unwrap().is_empty());
}

#[sqlx::test]
#[ignore]
async fn test_sweep_keeps_claimed_and_returned_reservations(pool: PgPool) {
    let services = services(pool);
    let user = reader(&services, "reader").await;
    let claimed_book = shelved_book(&services).await;
    let returned_book = shelved_book(&services).await;

    let claimed = services
        .reservations
        .create(&CreateReservation { book_id: claimed_book, user_id: user.id })
        .await
        .unwrap();
    services.reservations.claim(claimed.id).await.unwrap();

    let returned = services
        .reservations
        .create(&CreateReservation { book_id: returned_book, user_id: user.id })
        .await
        .unwrap();
    services.reservations.claim(returned.id).await.unwrap();
    services.reservations.return_book(returned.id).await.unwrap();

    let report = services
        .reservations
        .sweep_expired(Utc::now() + Duration::days(2))
        .await
        .unwrap();

    assert!(report.expired.is_empty());
    assert!(report.deleted.is_empty());
    assert_eq!(services.reservations.list().await.unwrap().len(), 2);
    assert!(!is_available(&services, claimed_book).await);
}

#[sqlx::test]
#[ignore]
async fn test_concurrent_reservations_book_only_once(pool: PgPool) {
    let services = services(pool);
    let book_id = shelved_book(&services).await;
    let now = Utc::now();

    let mut handles = Vec::new();
    for i in 0..8 {
        let user = reader(&services, &format!("reader{}", i)).await;
        let new = policy().reserve(user.id, book_id, now);
        let repository = services.repository.clone();
        handles.push(tokio::spawn(async move {
            repository.reservations.create(&new).await
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(AppError::Conflict(_)) => conflicts += 1,
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(services.reservations.list().await.unwrap().len(), 1);
    assert!(!is_available(&services, book_id).await);
}

#[sqlx::test]
#[ignore]
async fn test_duplicate_registration_ignores_case(pool: PgPool) {
    let services = services(pool.clone());

    services
        .auth
        .register(RegisterUser {
            email: "Reader@Example.org".to_string(),
            username: "Reader".to_string(),
            password: "secret-pass".to_string(),
        })
        .await
        .unwrap();

    let same_email = services
        .auth
        .register(RegisterUser {
            email: "reader@example.org".to_string(),
            username: "someone".to_string(),
            password: "secret-pass".to_string(),
        })
        .await;
    assert!(matches!(same_email, Err(AppError::Conflict(_))));

    let same_username = services
        .auth
        .register(RegisterUser {
            email: "someone@example.org".to_string(),
            username: "READER".to_string(),
            password: "secret-pass".to_string(),
        })
        .await;
    assert!(matches!(same_username, Err(AppError::Conflict(_))));

    // The unique indexes hold even when the existence check is skipped
    let raced = services
        .repository
        .users
        .create("READER@example.org", "other", "hash")
        .await;
    assert!(matches!(raced, Err(AppError::Conflict(_))));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}
