//! Login and credential verification.

use crate::app::password::PasswordHasher;
use crate::app::repository::UserRepository;
use crate::app::tokens::{TokenPair, TokenService};
use crate::dispatch::{bearer_token, AuthValidator};
use crate::error::ActionError;
use async_trait::async_trait;
use std::sync::Arc;

pub struct Authorization {
    users: Arc<dyn UserRepository>,
    passwords: PasswordHasher,
    tokens: TokenService,
}

impl Authorization {
    pub fn new(users: Arc<dyn UserRepository>, passwords: PasswordHasher, tokens: TokenService) -> Self {
        Authorization {
            users,
            passwords,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub fn passwords(&self) -> &PasswordHasher {
        &self.passwords
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, ActionError> {
        let credentials = self
            .users
            .get_credentials_by_email(email)
            .await?
            .ok_or_else(|| ActionError::not_found("User not found"))?;
        if !self.passwords.verify(password, &credentials.password).await? {
            return Err(ActionError::Unauthorized("Invalid email or password".into()));
        }
        self.tokens.create_tokens(credentials.id, 0)
    }

    /// User id carried by a valid access token.
    pub fn verify(&self, token: &str) -> Option<String> {
        self.tokens.verify_access(token).ok().map(|claims| claims.id.to_string())
    }
}

/// Accepts `Authorization: Bearer <access token>`.
pub struct BearerAuth {
    authorization: Arc<Authorization>,
}

impl BearerAuth {
    pub fn new(authorization: Arc<Authorization>) -> Self {
        BearerAuth { authorization }
    }
}

#[async_trait]
impl AuthValidator for BearerAuth {
    async fn validate(&self, credential: Option<&str>) -> Result<Option<String>, ActionError> {
        Ok(bearer_token(credential).and_then(|token| self.authorization.verify(token)))
    }
}
