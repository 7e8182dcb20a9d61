//! Users API built on the action framework: registration, CRUD and JWT login.

pub mod auth;
pub mod config;
pub mod controllers;
pub mod models;
pub mod password;
pub mod repository;
pub mod tokens;

use crate::error::{BindError, ConfigError};
use crate::server::Server;
use auth::{Authorization, BearerAuth};
use config::AppConfig;
use controllers::{auth_controller, users_controller};
use password::PasswordHasher;
use repository::{InMemoryUserRepository, UserRepository};
use std::sync::Arc;
use tokens::TokenService;

/// Shared collaborators the controllers close over.
#[derive(Clone)]
pub struct Services {
    pub users: Arc<dyn UserRepository>,
    pub authorization: Arc<Authorization>,
}

impl Services {
    pub fn new(config: &AppConfig, users: Arc<dyn UserRepository>) -> Result<Self, ConfigError> {
        let tokens = TokenService::from_config(config)?;
        Ok(Self::with_parts(users, PasswordHasher::new(config.password_rounds), tokens))
    }

    /// In-memory storage and default token lifetimes.
    pub fn in_memory(jwt_secret: &str, password_rounds: u32) -> Self {
        Self::with_parts(
            Arc::new(InMemoryUserRepository::default()),
            PasswordHasher::new(password_rounds),
            TokenService::new(jwt_secret, 900, 3600),
        )
    }

    fn with_parts(users: Arc<dyn UserRepository>, passwords: PasswordHasher, tokens: TokenService) -> Self {
        let authorization = Arc::new(Authorization::new(Arc::clone(&users), passwords, tokens));
        Services { users, authorization }
    }
}

/// Server with the `/auth` and `/users` controllers, bearer authentication and documentation.
pub fn server(config: &AppConfig, services: &Services) -> Result<Server, BindError> {
    Server::builder(config.server.clone())
        .controller("auth", auth_controller(services))
        .controller("users", users_controller(services))
        .auth_validator(BearerAuth::new(Arc::clone(&services.authorization)))
        .documentation("Users API", "1.0.0")
        .build()
}
