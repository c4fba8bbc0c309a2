//! User administration service

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::user::{Role, UserAccount, UserWithRoles},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
}

impl UsersService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Confirmed users whose email contains the search string
    pub async fn search_by_email(&self, email: Option<&str>) -> AppResult<Vec<UserAccount>> {
        let fragment = email
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::Validation("Email query parameter is required.".to_string()))?;

        self.repository.users.search_confirmed_by_email(fragment).await
    }

    /// A confirmed user with their roles
    pub async fn get_user(&self, user_id: Uuid) -> AppResult<UserWithRoles> {
        let user = self
            .repository
            .users
            .get_confirmed(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(UserWithRoles {
            roles: vec![user.role],
            user: UserAccount {
                id: user.id,
                email: user.email,
                username: user.username,
                is_email_confirmed: user.is_email_confirmed,
            },
        })
    }

    /// Replace the role of a confirmed user
    pub async fn update_role(&self, user_id: Uuid, role: &str) -> AppResult<Role> {
        let role: Role = role.parse().map_err(AppError::Validation)?;

        let user = self
            .repository
            .users
            .get_confirmed(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found.".to_string()))?;

        self.repository.users.update_role(user.id, role).await?;
        tracing::info!(user_id = %user.id, from = %user.role, to = %role, "User role updated");
        Ok(role)
    }
}
