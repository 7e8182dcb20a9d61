//! Action API: schema-driven typed actions and controllers on top of axum.

pub mod action;
pub mod app;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod docs;
pub mod error;
pub mod response;
pub mod schema;
pub mod server;
pub mod system;
pub mod telemetry;

pub use action::{Action, ActionMeta, ActionOptions, ActionSettings, Handler, Method, NoInput};
pub use config::ServerConfig;
pub use controller::Controller;
pub use dispatch::{auth_fn, bearer_token, bind, AuthValidator, DenyAll, Dispatcher, RegisteredRoute, RouteTable};
pub use docs::{documentation_controller, openapi, DocsInfo};
pub use error::{translate_error, ActionError, BindError, ConfigError, ErrorBody, ErrorMessage, ErrorTranslator, Issue, ServerError};
pub use response::{ResponsePlan, DEFAULT_RESPONSE};
pub use schema::{InputSchema, ObjectSchema, OutputSchema, Shape, ValueSchema};
pub use server::{RunningServer, Server, ServerBuilder};
