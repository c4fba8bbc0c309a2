//! Users repository for database operations

use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::user::{Role, User, UserAccount},
};

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by username or email, case-insensitively
    pub async fn get_by_login(&self, email_or_username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE LOWER(username) = LOWER($1) OR LOWER(email) = LOWER($1)
            LIMIT 1
            "#,
        )
        .bind(email_or_username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Check if the username or the email is already taken, ignoring case
    pub async fn username_or_email_exists(&self, username: &str, email: &str) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users
                WHERE LOWER(username) = LOWER($1) OR LOWER(email) = LOWER($2)
            )
            "#,
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Create a new user with the default role
    pub async fn create(&self, email: &str, username: &str, password_hash: &str) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, username, password_hash, is_email_confirmed, role)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(username)
        .bind(password_hash)
        .bind(Role::User)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::on_unique_violation(e, "Account already exists with Username or Email")
        })
    }

    /// Mark the email as confirmed. Returns false when it already was.
    pub async fn confirm_email(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET is_email_confirmed = TRUE WHERE id = $1 AND NOT is_email_confirmed",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Confirmed users whose email contains `fragment`, ignoring case
    pub async fn search_confirmed_by_email(&self, fragment: &str) -> AppResult<Vec<UserAccount>> {
        let users = sqlx::query_as::<_, UserAccount>(
            r#"
            SELECT id, email, username, is_email_confirmed
            FROM users
            WHERE is_email_confirmed AND POSITION(LOWER($1) IN LOWER(email)) > 0
            ORDER BY email
            "#,
        )
        .bind(fragment)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Get a confirmed user
    pub async fn get_confirmed(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = $1 AND is_email_confirmed",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Replace the role of a user
    pub async fn update_role(&self, id: Uuid, role: Role) -> AppResult<()> {
        let result = sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
            .bind(id)
            .bind(role)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }
}
