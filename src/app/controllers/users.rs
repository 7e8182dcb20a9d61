//! `/users`: list, fetch, update, patch, register, delete.

use crate::action::{Action, ActionSettings, NoInput};
use crate::app::models::{user_id_schema, user_schema, user_shape, user_with_password_shape, NewUser, UserPatch};
use crate::app::Services;
use crate::controller::Controller;
use crate::error::ActionError;
use crate::schema::{Shape, ValueSchema};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Deserialize)]
struct ById {
    id: Uuid,
}

#[derive(Deserialize)]
struct ReplaceUser {
    id: Uuid,
    name: String,
    email: String,
}

#[derive(Deserialize)]
struct PatchUser {
    id: Uuid,
    #[serde(flatten)]
    patch: UserPatch,
}

fn by_id() -> Shape {
    Shape::new().field("id", user_id_schema())
}

fn user_not_found() -> ActionError {
    ActionError::not_found("User not found")
}

pub fn users_controller(services: &Services) -> Controller {
    let users = &services.users;
    let passwords = *services.authorization.passwords();

    let index = {
        let users = Arc::clone(users);
        Action::get(
            ActionSettings::new()
                .summary("Get all users")
                .output(ValueSchema::array(user_schema()).describe("List of all users")),
            move |_, _: NoInput| {
                let users = Arc::clone(&users);
                async move { users.all().await }
            },
        )
    };

    let get_by_id = {
        let users = Arc::clone(users);
        Action::get(
            ActionSettings::new()
                .summary("Get users by id")
                .route("/:id")
                .params(by_id())
                .output(user_schema()),
            move |_, ById { id }| {
                let users = Arc::clone(&users);
                async move { users.get_by_id(id).await?.ok_or_else(user_not_found) }
            },
        )
    };

    let update = {
        let users = Arc::clone(users);
        Action::put(
            ActionSettings::new()
                .summary("Update user")
                .description("All fields are required.")
                .route("/:id")
                .params(by_id())
                .body(user_shape())
                .output(user_schema()),
            move |_, input: ReplaceUser| {
                let users = Arc::clone(&users);
                async move {
                    let patch = UserPatch {
                        name: Some(input.name),
                        email: Some(input.email),
                    };
                    users.update_by_id(input.id, patch).await?;
                    users.get_by_id(input.id).await?.ok_or_else(user_not_found)
                }
            },
        )
    };

    let patch = {
        let users = Arc::clone(users);
        Action::patch(
            ActionSettings::new()
                .summary("Partially update user")
                .description("Only fields that need to be updated can be sent.")
                .route("/:id")
                .params(by_id())
                .body(user_shape().partial())
                .output(user_schema()),
            move |_, input: PatchUser| {
                let users = Arc::clone(&users);
                async move {
                    users.update_by_id(input.id, input.patch).await?;
                    users.get_by_id(input.id).await?.ok_or_else(user_not_found)
                }
            },
        )
    };

    let create = {
        let users = Arc::clone(users);
        Action::public_post(
            ActionSettings::new()
                .summary("Create user")
                .body(user_with_password_shape())
                .output(user_schema()),
            move |_, mut input: NewUser| {
                let users = Arc::clone(&users);
                async move {
                    input.password = passwords.hash(&input.password).await?;
                    let id = users.create(input).await?;
                    users.get_by_id(id).await?.ok_or_else(user_not_found)
                }
            },
        )
    };

    let delete = {
        let users = Arc::clone(users);
        Action::delete(
            ActionSettings::new().summary("Delete user").route("/:id").params(by_id()),
            move |_, ById { id }| {
                let users = Arc::clone(&users);
                async move { users.delete_by_id(id).await }
            },
        )
    };

    Controller::new(
        "/users",
        [
            ("index", index),
            ("getById", get_by_id),
            ("update", update),
            ("patch", patch),
            ("create", create),
            ("delete", delete),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Method;
    use crate::app::models::User;

    #[test]
    fn routes_and_visibility() {
        let services = Services::in_memory("secret", 4);
        let users = users_controller(&services);
        let expected = [
            ("index", Method::Get, "/users/", false),
            ("getById", Method::Get, "/users/:id", false),
            ("update", Method::Put, "/users/:id", false),
            ("patch", Method::Patch, "/users/:id", false),
            ("create", Method::Post, "/users/", true),
            ("delete", Method::Delete, "/users/:id", false),
        ];
        for (name, method, route, public) in expected {
            let action = &users[name];
            assert_eq!((action.method(), action.route(), action.is_public()), (method, route, public), "{name}");
        }
        assert!(users["delete"].meta().output.is_default());
    }

    #[tokio::test]
    async fn get_by_id_raises_not_found() {
        let services = Services::in_memory("secret", 4);
        let users = users_controller(&services);
        let err = users["getById"]
            .invoke(None, serde_json::json!({"id": Uuid::new_v4()}))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::NotFound(message) if message == "User not found"));
    }

    #[tokio::test]
    async fn create_hashes_password() {
        let services = Services::in_memory("secret", 4);
        let users = users_controller(&services);
        let created = users["create"]
            .invoke(
                None,
                serde_json::json!({"name": "Test user 1", "email": "test1@user.com", "password": "test1-password"}),
            )
            .await
            .unwrap();
        let user: User = serde_json::from_value(created).unwrap();
        let credentials = services
            .users
            .get_credentials_by_email("test1@user.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(credentials.id, user.id);
        assert_ne!(credentials.password, "test1-password");
    }
}
