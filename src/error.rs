//! Typed errors and HTTP mapping.

use crate::action::Method;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// One failed check, located by its dotted field path (empty for the root value).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub path: String,
    pub message: String,
}

impl Issue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Issue {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Re-roots the issue under `prefix` (e.g. `email` under `body` becomes `body.email`).
    pub fn prefixed(self, prefix: &str) -> Self {
        let path = if self.path.is_empty() {
            prefix.to_string()
        } else {
            format!("{}.{}", prefix, self.path)
        };
        Issue { path, ..self }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

fn join_issues(issues: &[Issue]) -> String {
    issues.iter().map(Issue::to_string).collect::<Vec<_>>().join("; ")
}

/// Everything an action, the dispatcher or an auth validator can fail with.
#[derive(Error, Debug)]
pub enum ActionError {
    #[error("validation failed: {}", join_issues(.0))]
    Validation(Vec<Issue>),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidToken(String),
    /// Handler-raised error carrying its own status code.
    #[error("{message}")]
    Request { status: StatusCode, message: String },
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl ActionError {
    pub fn unauthorized() -> Self {
        ActionError::Unauthorized("Unauthorized".into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ActionError::NotFound(message.into())
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        ActionError::InvalidToken(message.into())
    }

    pub fn request(status: StatusCode, message: impl Into<String>) -> Self {
        ActionError::Request {
            status,
            message: message.into(),
        }
    }

    pub fn unexpected<E>(err: E) -> Self
    where
        E: Into<anyhow::Error>,
    {
        ActionError::Unexpected(err.into())
    }
}

/// JSON body of every error response.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub error: String,
    pub message: ErrorMessage,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorMessage {
    Text(String),
    Issues(Vec<Issue>),
}

impl ErrorBody {
    pub fn new(status: StatusCode, message: ErrorMessage) -> Self {
        ErrorBody {
            status_code: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
        }
    }
}

/// Maps an error to the status and body sent to the client. Injected once into the dispatcher.
pub type ErrorTranslator = fn(&ActionError) -> (StatusCode, ErrorBody);

/// Default translation. Unexpected errors never expose their details.
pub fn translate_error(err: &ActionError) -> (StatusCode, ErrorBody) {
    let (status, message) = match err {
        ActionError::Validation(issues) => (StatusCode::BAD_REQUEST, ErrorMessage::Issues(issues.clone())),
        ActionError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, ErrorMessage::Text(message.clone())),
        ActionError::NotFound(message) => (StatusCode::NOT_FOUND, ErrorMessage::Text(message.clone())),
        ActionError::InvalidToken(message) => (StatusCode::BAD_REQUEST, ErrorMessage::Text(message.clone())),
        ActionError::Request { status, message } => (*status, ErrorMessage::Text(message.clone())),
        ActionError::Unexpected(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorMessage::Text("Internal Server Error".into()),
        ),
    };
    (status, ErrorBody::new(status, message))
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        let (status, body) = translate_error(&self);
        (status, Json(body)).into_response()
    }
}

/// Binding controllers to the transport failed; raised before the server accepts connections.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BindError {
    #[error("route '{route}' of {controller}.{action} must start with '/'")]
    InvalidRoute {
        controller: String,
        action: String,
        route: String,
    },
    #[error("duplicate route {method} {route} ({controller}.{action})")]
    DuplicateRoute {
        method: Method,
        route: String,
        controller: String,
        action: String,
    },
    /// Rejected by the router's matcher, e.g. different parameter names at the same position.
    #[error("route {route} of {controller}.{action} conflicts with {existing}")]
    ConflictingRoute {
        route: String,
        existing: String,
        controller: String,
        action: String,
    },
    #[error("documentation: {0}")]
    Documentation(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{}", format_env_issues(.0))]
    Invalid(Vec<Issue>),
    #[error("config decode: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("reading key file {path}: {source}")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("signing key: {0}")]
    Key(#[from] jsonwebtoken::errors::Error),
}

fn format_env_issues(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(|issue| format!(" .env: {}", issue))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("server task: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_reference_statuses() {
        let cases = [
            (ActionError::Validation(vec![Issue::new("body.email", "Invalid email")]), 400),
            (ActionError::unauthorized(), 401),
            (ActionError::not_found("User not found"), 404),
            (ActionError::invalid_token("Invalid token"), 400),
            (ActionError::request(StatusCode::CONFLICT, "taken"), 409),
            (ActionError::unexpected(anyhow::anyhow!("db down")), 500),
        ];
        for (err, expected) in cases {
            let (status, body) = translate_error(&err);
            assert_eq!(status.as_u16(), expected, "{err}");
            assert_eq!(body.status_code, expected);
        }
    }

    #[test]
    fn unexpected_errors_do_not_leak_details() {
        let (_, body) = translate_error(&ActionError::unexpected(anyhow::anyhow!("password=hunter2")));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["message"], "Internal Server Error");
        assert!(!json.to_string().contains("hunter2"));
    }

    #[test]
    fn body_carries_label_message_and_status() {
        let (_, body) = translate_error(&ActionError::not_found("User not found"));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"statusCode": 404, "error": "Not Found", "message": "User not found"})
        );
    }

    #[test]
    fn validation_message_is_issue_list() {
        let (_, body) = translate_error(&ActionError::Validation(vec![Issue::new("query.port", "Expected number, received string")]));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["message"][0]["path"], "query.port");
    }

    #[test]
    fn prefixing_root_issue_uses_prefix_as_path() {
        assert_eq!(Issue::new("", "Required").prefixed("body").path, "body");
        assert_eq!(Issue::new("email", "Required").prefixed("body").path, "body.email");
    }
}
