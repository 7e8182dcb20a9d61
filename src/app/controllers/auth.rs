//! `/auth`: login and token refresh.

use crate::action::{Action, ActionSettings};
use crate::app::models::{email_schema, password_schema};
use crate::app::Services;
use crate::controller::Controller;
use crate::schema::{Shape, ValueSchema};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
struct Login {
    email: String,
    password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Refresh {
    refresh_token: String,
}

fn jwt_schema() -> ValueSchema {
    ValueSchema::string().describe("JWT")
}

fn token_pair_schema() -> ValueSchema {
    ValueSchema::object(
        Shape::new()
            .field("token", jwt_schema())
            .field("refreshToken", jwt_schema()),
    )
    .describe("Authentication tokens")
}

pub fn auth_controller(services: &Services) -> Controller {
    let index = {
        let authorization = Arc::clone(&services.authorization);
        Action::public_post(
            ActionSettings::new()
                .summary("Authenticate")
                .body(
                    Shape::new()
                        .field("email", email_schema())
                        .field("password", password_schema()),
                )
                .output(token_pair_schema()),
            move |_, Login { email, password }| {
                let authorization = Arc::clone(&authorization);
                async move { authorization.login(&email, &password).await }
            },
        )
    };

    let refresh = {
        let authorization = Arc::clone(&services.authorization);
        Action::public_post(
            ActionSettings::new()
                .summary("Refresh authentication token")
                .route("/refresh")
                .body(Shape::new().field("refreshToken", jwt_schema()))
                .output(token_pair_schema()),
            move |_, Refresh { refresh_token }| {
                let authorization = Arc::clone(&authorization);
                async move { authorization.tokens().refresh(&refresh_token) }
            },
        )
    };

    Controller::new("/auth", [("index", index), ("refresh", refresh)])
}
