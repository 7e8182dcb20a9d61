//! User storage.

mod memory;
mod postgres;

pub use memory::InMemoryUserRepository;
pub use postgres::{ensure_users_table, PgUserRepository};

use crate::app::models::{Credentials, NewUser, User, UserPatch};
use crate::error::ActionError;
use async_trait::async_trait;
use axum::http::StatusCode;
use uuid::Uuid;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Every user, oldest first.
    async fn all(&self) -> Result<Vec<User>, ActionError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, ActionError>;

    async fn get_credentials_by_email(&self, email: &str) -> Result<Option<Credentials>, ActionError>;

    /// Stores a user whose password is already hashed; returns the new id.
    async fn create(&self, user: NewUser) -> Result<Uuid, ActionError>;

    /// No-op when the id does not exist.
    async fn update_by_id(&self, id: Uuid, patch: UserPatch) -> Result<(), ActionError>;

    async fn delete_by_id(&self, id: Uuid) -> Result<(), ActionError>;
}

pub(crate) fn email_taken() -> ActionError {
    ActionError::request(StatusCode::CONFLICT, "Email already in use")
}
