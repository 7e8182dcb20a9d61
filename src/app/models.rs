//! User model: schemas used by the API and the records behind them.

use crate::schema::{Shape, ValueSchema};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub fn user_id_schema() -> ValueSchema {
    ValueSchema::string().non_empty().uuid().describe("User ID")
}

pub fn password_schema() -> ValueSchema {
    ValueSchema::string().min_length(8).max_length(64).describe("User Password")
}

pub fn email_schema() -> ValueSchema {
    ValueSchema::string().non_empty().email().max_length(64).describe("Email address")
}

/// Public, writable user fields.
pub fn user_shape() -> Shape {
    Shape::new()
        .field("name", ValueSchema::string().non_empty().describe("Full name"))
        .field("email", email_schema())
}

pub fn user_with_password_shape() -> Shape {
    user_shape().field("password", password_schema())
}

/// What the API returns for a user. The password never appears here.
pub fn user_schema() -> ValueSchema {
    ValueSchema::object(
        Shape::new()
            .field("id", user_id_schema())
            .merge(user_shape())
            .field("createdAt", ValueSchema::string().date_time())
            .field("updatedAt", ValueSchema::string().date_time()),
    )
    .describe("User")
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration payload; the `create` handler replaces the plain `password` with its hash before storing.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Fields to change; `None` leaves the stored value untouched.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Login lookup result.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct Credentials {
    pub id: Uuid,
    pub password: String,
}
