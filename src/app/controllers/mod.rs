mod auth;
mod users;

pub use auth::auth_controller;
pub use users::users_controller;
