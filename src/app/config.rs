//! Users API configuration: server settings plus secrets and token lifetimes.

use super::password::{MAX_ROUNDS, MIN_ROUNDS};
use crate::config::{env_vars, load, ServerConfig};
use crate::error::{ConfigError, Issue};
use crate::schema::{ObjectSchema, ValueSchema};
use serde::Deserialize;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    #[serde(flatten)]
    pub server: ServerConfig,
    #[serde(rename = "JWT_SECRET")]
    pub jwt_secret: String,
    /// PEM key pair; when both are set tokens are signed with RS512 instead of `JWT_SECRET`.
    #[serde(rename = "JWT_PRIVATE_KEY_FILE", default)]
    pub jwt_private_key_file: Option<String>,
    #[serde(rename = "JWT_PUBLIC_KEY_FILE", default)]
    pub jwt_public_key_file: Option<String>,
    /// bcrypt cost.
    #[serde(rename = "PASSWORD_ROUNDS")]
    pub password_rounds: u32,
    #[serde(rename = "DATABASE_URL", default)]
    pub database_url: Option<String>,
    /// Seconds.
    #[serde(rename = "ACCESS_TOKEN_TTL")]
    pub access_token_ttl: i64,
    #[serde(rename = "REFRESH_TOKEN_TTL")]
    pub refresh_token_ttl: i64,
}

impl AppConfig {
    pub fn schema() -> ObjectSchema {
        ObjectSchema::new(
            ServerConfig::shape()
                .field("JWT_SECRET", ValueSchema::string().non_empty())
                .field("JWT_PRIVATE_KEY_FILE", ValueSchema::string().non_empty().optional())
                .field("JWT_PUBLIC_KEY_FILE", ValueSchema::string().non_empty().optional())
                .field(
                    "PASSWORD_ROUNDS",
                    ValueSchema::integer()
                        .coerce()
                        .minimum(MIN_ROUNDS as f64)
                        .maximum(MAX_ROUNDS as f64)
                        .default_value(10),
                )
                .field("DATABASE_URL", ValueSchema::string().non_empty().optional())
                .field("ACCESS_TOKEN_TTL", ValueSchema::integer().coerce().positive().default_value(900))
                .field("REFRESH_TOKEN_TTL", ValueSchema::integer().coerce().positive().default_value(3600)),
        )
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(env_vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let config: Self = load(&Self::schema(), vars)?;
        match (&config.jwt_private_key_file, &config.jwt_public_key_file) {
            (Some(_), None) => Err(ConfigError::Invalid(vec![Issue::new(
                "JWT_PUBLIC_KEY_FILE",
                "Required when JWT_PRIVATE_KEY_FILE is set",
            )])),
            (None, Some(_)) => Err(ConfigError::Invalid(vec![Issue::new(
                "JWT_PRIVATE_KEY_FILE",
                "Required when JWT_PUBLIC_KEY_FILE is set",
            )])),
            _ => Ok(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_server_section() {
        let config = AppConfig::from_vars([("HTTP_PORT", "3000"), ("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.server, ServerConfig::with_port(3000));
        assert_eq!(config.password_rounds, 10);
        assert_eq!(config.database_url, None);
        assert_eq!((config.jwt_private_key_file, config.jwt_public_key_file), (None, None));
        assert_eq!((config.access_token_ttl, config.refresh_token_ttl), (900, 3600));
    }

    #[test]
    fn reports_app_and_server_issues_together() {
        let err = AppConfig::from_vars([("HTTP_PORT", "x"), ("PASSWORD_ROUNDS", "40")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            [
                " .env: HTTP_PORT: Expected number, received string",
                " .env: JWT_SECRET: Required",
                " .env: PASSWORD_ROUNDS: Number must be less than or equal to 31",
            ]
            .join("\n")
        );
    }

    #[test]
    fn password_rounds_follow_bcrypt_cost_range() {
        let err = AppConfig::from_vars([("HTTP_PORT", "3000"), ("JWT_SECRET", "s"), ("PASSWORD_ROUNDS", "3")]).unwrap_err();
        assert!(err.to_string().contains("PASSWORD_ROUNDS: Number must be greater than or equal to 4"), "{err}");
        let config = AppConfig::from_vars([("HTTP_PORT", "3000"), ("JWT_SECRET", "s"), ("PASSWORD_ROUNDS", "31")]).unwrap();
        assert_eq!(config.password_rounds, 31);
    }

    #[test]
    fn key_files_come_in_pairs() {
        let err = AppConfig::from_vars([("HTTP_PORT", "3000"), ("JWT_SECRET", "s"), ("JWT_PRIVATE_KEY_FILE", "k.pem")])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            " .env: JWT_PUBLIC_KEY_FILE: Required when JWT_PRIVATE_KEY_FILE is set"
        );
    }
}
