//! Default response convention and output rendering.

use crate::schema::{OutputSchema, ValueSchema};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

/// Body sent by every action that declares no output.
pub const DEFAULT_RESPONSE: &str = "OK";

/// Literal schema standing in for a default-response action's output.
pub fn default_response_schema() -> ValueSchema {
    ValueSchema::literal(DEFAULT_RESPONSE).describe("Default response")
}

/// How a bound action turns its handler result into a response. Decided once per route.
#[derive(Clone, Debug, PartialEq)]
pub enum ResponsePlan {
    /// Handler output is discarded.
    Constant(&'static str),
    Serialize(ValueSchema),
}

impl ResponsePlan {
    pub fn for_output(output: &OutputSchema) -> Self {
        match output {
            OutputSchema::DefaultResponse => ResponsePlan::Constant(DEFAULT_RESPONSE),
            OutputSchema::Custom(schema) => ResponsePlan::Serialize(schema.clone()),
        }
    }

    /// Schema registered for the route's 200 response.
    pub fn schema(&self) -> ValueSchema {
        match self {
            ResponsePlan::Constant(_) => default_response_schema(),
            ResponsePlan::Serialize(schema) => schema.clone(),
        }
    }

    pub fn render(&self, output: Value) -> Response {
        match self {
            ResponsePlan::Constant(text) => (StatusCode::OK, *text).into_response(),
            ResponsePlan::Serialize(schema) => (StatusCode::OK, Json(schema.serialize(output))).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Shape;
    use axum::body::to_bytes;
    use serde_json::json;

    async fn body_of(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    #[tokio::test]
    async fn default_output_ignores_handler_value() {
        let plan = ResponsePlan::for_output(&OutputSchema::DefaultResponse);
        let response = plan.render(json!({"ignored": true}));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, b"OK");
    }

    #[tokio::test]
    async fn custom_output_is_projected() {
        let schema = ValueSchema::object(Shape::new().field("id", ValueSchema::string()));
        let plan = ResponsePlan::for_output(&OutputSchema::Custom(schema));
        let body = body_of(plan.render(json!({"id": "a", "password": "x"}))).await;
        assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!({"id": "a"}));
    }

    #[test]
    fn constant_plan_registers_literal_schema() {
        let plan = ResponsePlan::for_output(&OutputSchema::DefaultResponse);
        assert!(plan.schema().parse(Some(&json!("OK"))).is_ok());
        assert!(plan.schema().parse(Some(&json!("NOT OK"))).is_err());
    }
}
