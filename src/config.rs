//! Server configuration from the environment (after `.env`), validated with the schema adapter.

use crate::error::ConfigError;
use crate::schema::{ObjectSchema, Shape, ValueSchema};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{Map, Value};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;
pub const DEFAULT_DOCUMENTATION_ROUTE: &str = "/documentation";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    #[serde(rename = "HTTP_PORT")]
    pub port: u16,
    #[serde(rename = "HTTP_HOST")]
    pub host: String,
    /// Request logging (info level for this crate).
    #[serde(rename = "HTTP_LOG")]
    pub log: bool,
    /// Maximum accepted request body in bytes.
    #[serde(rename = "HTTP_BODY_LIMIT")]
    pub body_limit: usize,
    #[serde(rename = "DOCUMENTATION_ROUTE")]
    pub documentation_route: String,
}

impl ServerConfig {
    /// Defaults for everything but the port.
    pub fn with_port(port: u16) -> Self {
        ServerConfig {
            port,
            host: DEFAULT_HOST.to_string(),
            log: false,
            body_limit: DEFAULT_BODY_LIMIT,
            documentation_route: DEFAULT_DOCUMENTATION_ROUTE.to_string(),
        }
    }

    pub fn shape() -> Shape {
        Shape::new()
            .field("HTTP_PORT", ValueSchema::integer().coerce().positive().maximum(65535.0))
            .field("HTTP_HOST", ValueSchema::string().non_empty().default_value(DEFAULT_HOST))
            .field("HTTP_LOG", ValueSchema::boolean().coerce().default_value(false))
            .field(
                "HTTP_BODY_LIMIT",
                ValueSchema::integer().coerce().positive().default_value(DEFAULT_BODY_LIMIT),
            )
            .field(
                "DOCUMENTATION_ROUTE",
                ValueSchema::string()
                    .pattern("^/")
                    .default_value(DEFAULT_DOCUMENTATION_ROUTE),
            )
    }

    /// Loads `.env` (if any) and reads the process environment.
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
        load(&ObjectSchema::new(Self::shape()), vars)
    }
}

/// Unicode environment variables; others can never satisfy a schema and are skipped.
pub(crate) fn env_vars() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os().filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

/// Validates string variables against `schema`, then deserializes the parsed object.
pub(crate) fn load<T, I, K, V>(schema: &ObjectSchema, vars: I) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let raw: Map<String, Value> = vars
        .into_iter()
        .map(|(key, value)| (key.into(), Value::String(value.into())))
        .collect();
    let parsed = schema.parse(Some(&Value::Object(raw))).map_err(ConfigError::Invalid)?;
    Ok(serde_json::from_value(Value::Object(parsed))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_is_coerced_and_defaults_apply() {
        let config = ServerConfig::from_vars([("HTTP_PORT", "3000"), ("PATH", "/usr/bin")]).unwrap();
        assert_eq!(config, ServerConfig::with_port(3000));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = ServerConfig::from_vars([
            ("HTTP_PORT", "8080"),
            ("HTTP_HOST", "0.0.0.0"),
            ("HTTP_LOG", "true"),
            ("HTTP_BODY_LIMIT", "2048"),
            ("DOCUMENTATION_ROUTE", "/docs"),
        ])
        .unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert!(config.log);
        assert_eq!(config.body_limit, 2048);
        assert_eq!(config.documentation_route, "/docs");
    }

    #[test]
    fn invalid_port_lists_offending_variable() {
        let err = ServerConfig::from_vars([("HTTP_PORT", "abc")]).unwrap_err();
        assert_eq!(err.to_string(), " .env: HTTP_PORT: Expected number, received string");

        let err = ServerConfig::from_vars(Vec::<(String, String)>::new()).unwrap_err();
        assert_eq!(err.to_string(), " .env: HTTP_PORT: Required");
    }

    #[test]
    fn every_issue_is_reported() {
        let err = ServerConfig::from_vars([("HTTP_PORT", "0"), ("HTTP_HOST", ""), ("DOCUMENTATION_ROUTE", "docs")])
            .unwrap_err();
        let ConfigError::Invalid(issues) = err else {
            panic!("expected validation issues");
        };
        let paths: Vec<_> = issues.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["HTTP_PORT", "HTTP_HOST", "DOCUMENTATION_ROUTE"]);
    }
}
