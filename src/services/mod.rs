//! Business logic services

pub mod auth;
pub mod catalog;
pub mod email;
pub mod reservations;
pub mod sweeper;
pub mod users;

use std::sync::Arc;

use crate::{
    config::AppConfig, error::AppResult, models::reservation::LoanPolicy, repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub users: users::UsersService,
    pub reservations: reservations::ReservationsService,
    pub repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        config: &AppConfig,
        notifier: Arc<dyn email::Notifier>,
    ) -> AppResult<Self> {
        Ok(Self {
            auth: auth::AuthService::new(
                repository.clone(),
                config.auth.clone(),
                &config.email,
                notifier,
            )?,
            catalog: catalog::CatalogService::new(repository.clone()),
            users: users::UsersService::new(repository.clone()),
            reservations: reservations::ReservationsService::new(
                repository.clone(),
                LoanPolicy::try_from(&config.reservations)?,
            ),
            repository,
        })
    }

    /// Notifier selected by the email configuration
    pub fn notifier(config: &AppConfig) -> Arc<dyn email::Notifier> {
        if config.email.enabled {
            Arc::new(email::EmailService::new(config.email.clone()))
        } else {
            Arc::new(email::LogNotifier)
        }
    }
}
