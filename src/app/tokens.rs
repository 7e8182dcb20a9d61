//! Access/refresh token pairs: HS512 JWTs with a shared secret, or RS512 with a key pair.

use super::config::AppConfig;
use crate::error::{ActionError, ConfigError};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub id: Uuid,
    pub token_type: TokenType,
    /// How many times the pair has been refreshed.
    pub refresh_count: u32,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: String,
}

pub struct TokenService {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: i64,
    refresh_ttl: i64,
}

impl TokenService {
    /// TTLs in seconds.
    pub fn new(secret: &str, access_ttl: i64, refresh_ttl: i64) -> Self {
        TokenService {
            algorithm: Algorithm::HS512,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Signs with the PEM private key; only the public key is needed to verify.
    pub fn rs512(
        private_pem: &[u8],
        public_pem: &[u8],
        access_ttl: i64,
        refresh_ttl: i64,
    ) -> Result<Self, jsonwebtoken::errors::Error> {
        Ok(TokenService {
            algorithm: Algorithm::RS512,
            encoding: EncodingKey::from_rsa_pem(private_pem)?,
            decoding: DecodingKey::from_rsa_pem(public_pem)?,
            access_ttl,
            refresh_ttl,
        })
    }

    /// RS512 when a key pair is configured, HS512 with `JWT_SECRET` otherwise.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let (access, refresh) = (config.access_token_ttl, config.refresh_token_ttl);
        match (&config.jwt_private_key_file, &config.jwt_public_key_file) {
            (Some(private), Some(public)) => Ok(Self::rs512(&read_key(private)?, &read_key(public)?, access, refresh)?),
            _ => Ok(Self::new(&config.jwt_secret, access, refresh)),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn create_tokens(&self, id: Uuid, refresh_count: u32) -> Result<TokenPair, ActionError> {
        Ok(TokenPair {
            token: self.sign(id, TokenType::Access, refresh_count, self.access_ttl)?,
            refresh_token: self.sign(id, TokenType::Refresh, refresh_count, self.refresh_ttl)?,
        })
    }

    fn sign(&self, id: Uuid, token_type: TokenType, refresh_count: u32, ttl: i64) -> Result<String, ActionError> {
        let iat = Utc::now().timestamp();
        let claims = TokenClaims {
            id,
            token_type,
            refresh_count,
            iat,
            exp: iat + ttl,
        };
        encode(&Header::new(self.algorithm), &claims, &self.encoding).map_err(ActionError::unexpected)
    }

    fn verify(&self, token: &str, expected: TokenType) -> Result<TokenClaims, ActionError> {
        let data = decode::<TokenClaims>(token, &self.decoding, &Validation::new(self.algorithm))
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                ActionError::invalid_token("Invalid token")
            })?;
        if data.claims.token_type != expected {
            return Err(ActionError::invalid_token("Invalid token type"));
        }
        Ok(data.claims)
    }

    pub fn verify_access(&self, token: &str) -> Result<TokenClaims, ActionError> {
        self.verify(token, TokenType::Access)
    }

    /// New pair from a valid refresh token, with the refresh count incremented.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ActionError> {
        let claims = self.verify(refresh_token, TokenType::Refresh)?;
        self.create_tokens(claims.id, claims.refresh_count.saturating_add(1))
    }
}

fn read_key(path: &str) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|source| ConfigError::KeyFile {
        path: path.to_string(),
        source,
    })
}
