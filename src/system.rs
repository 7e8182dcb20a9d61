//! Built-in system endpoints: health and version.

use crate::action::{Action, ActionSettings, NoInput};
use crate::controller::Controller;
use crate::error::ActionError;
use crate::schema::{Shape, ValueSchema};
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Serialize)]
struct VersionBody {
    name: &'static str,
    version: &'static str,
}

async fn health(_caller: Option<String>, _input: NoInput) -> Result<HealthBody, ActionError> {
    Ok(HealthBody { status: "ok" })
}

async fn version(_caller: Option<String>, _input: NoInput) -> Result<VersionBody, ActionError> {
    Ok(VersionBody {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Public GET /health and GET /version, mounted at the root.
pub fn system_controller() -> Controller {
    Controller::new(
        "",
        [
            (
                "health",
                Action::public_get(
                    ActionSettings::new()
                        .route("/health")
                        .summary("Health check")
                        .output(ValueSchema::object(Shape::new().field("status", ValueSchema::literal("ok")))),
                    health,
                ),
            ),
            (
                "version",
                Action::public_get(
                    ActionSettings::new()
                        .route("/version")
                        .summary("Package name and version")
                        .output(ValueSchema::object(
                            Shape::new()
                                .field("name", ValueSchema::string())
                                .field("version", ValueSchema::string()),
                        )),
                    version,
                ),
            ),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn health_and_version() {
        let system = system_controller();
        assert_eq!(system["health"].route(), "/health");
        assert_eq!(system["health"].invoke(None, Value::Null).await.unwrap(), json!({"status": "ok"}));
        let version = system["version"].invoke(None, Value::Null).await.unwrap();
        assert_eq!(version["version"], env!("CARGO_PKG_VERSION"));
    }
}
