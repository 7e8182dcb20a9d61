//! Process-local user store, used when no database is configured and in tests.

use super::{email_taken, UserRepository};
use crate::app::models::{Credentials, NewUser, User, UserPatch};
use crate::error::ActionError;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

struct StoredUser {
    user: User,
    password: String,
}

/// Emails are unique case-insensitively, matching the Postgres index.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<Vec<StoredUser>>,
}

fn same_email(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn all(&self) -> Result<Vec<User>, ActionError> {
        Ok(self.users.read().await.iter().map(|s| s.user.clone()).collect())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, ActionError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|s| s.user.id == id)
            .map(|s| s.user.clone()))
    }

    async fn get_credentials_by_email(&self, email: &str) -> Result<Option<Credentials>, ActionError> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|s| same_email(&s.user.email, email))
            .map(|s| Credentials {
                id: s.user.id,
                password: s.password.clone(),
            }))
    }

    async fn create(&self, user: NewUser) -> Result<Uuid, ActionError> {
        let mut users = self.users.write().await;
        if users.iter().any(|s| same_email(&s.user.email, &user.email)) {
            return Err(email_taken());
        }
        let now = Utc::now();
        let id = Uuid::new_v4();
        users.push(StoredUser {
            user: User {
                id,
                name: user.name,
                email: user.email,
                created_at: now,
                updated_at: now,
            },
            password: user.password,
        });
        Ok(id)
    }

    async fn update_by_id(&self, id: Uuid, patch: UserPatch) -> Result<(), ActionError> {
        let mut users = self.users.write().await;
        if let Some(email) = &patch.email {
            if users.iter().any(|s| s.user.id != id && same_email(&s.user.email, email)) {
                return Err(email_taken());
            }
        }
        if let Some(stored) = users.iter_mut().find(|s| s.user.id == id) {
            if let Some(name) = patch.name {
                stored.user.name = name;
            }
            if let Some(email) = patch.email {
                stored.user.email = email;
            }
            stored.user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), ActionError> {
        self.users.write().await.retain(|s| s.user.id != id);
        Ok(())
    }
}
