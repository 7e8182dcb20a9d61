//! bcrypt password hashes. Work runs on the blocking pool.

use crate::error::ActionError;

/// bcrypt's accepted cost range.
pub const MIN_ROUNDS: u32 = 4;
pub const MAX_ROUNDS: u32 = 31;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PasswordHasher {
    rounds: u32,
}

impl PasswordHasher {
    pub fn new(rounds: u32) -> Self {
        PasswordHasher {
            rounds: rounds.clamp(MIN_ROUNDS, MAX_ROUNDS),
        }
    }

    pub async fn hash(&self, password: &str) -> Result<String, ActionError> {
        let rounds = self.rounds;
        let password = password.to_string();
        tokio::task::spawn_blocking(move || bcrypt::hash(password, rounds))
            .await
            .map_err(ActionError::unexpected)?
            .map_err(ActionError::unexpected)
    }

    /// `false` for a wrong password or a value that is not a bcrypt hash.
    pub async fn verify(&self, password: &str, stored: &str) -> Result<bool, ActionError> {
        let password = password.to_string();
        let stored = stored.to_string();
        let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &stored))
            .await
            .map_err(ActionError::unexpected)?;
        Ok(verified.unwrap_or(false))
    }
}
