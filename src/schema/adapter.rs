//! Normalized input/output schemas carried by every action.

use crate::error::Issue;
use crate::schema::value::type_name;
use crate::schema::{ObjectSchema, Shape, ValueSchema};
use serde_json::{Map, Value};

/// Schema of one input source (params, query, body or headers).
#[derive(Clone, Debug, Default, PartialEq)]
pub enum InputSchema {
    /// Nothing declared: only "no value" is accepted.
    #[default]
    Absent,
    Present(ObjectSchema),
}

impl InputSchema {
    pub fn from_shape(shape: Option<Shape>) -> Self {
        match shape {
            Some(shape) => InputSchema::Present(ObjectSchema::new(shape)),
            None => InputSchema::Absent,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, InputSchema::Present(_))
    }

    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match self {
            InputSchema::Present(schema) => Some(schema),
            InputSchema::Absent => None,
        }
    }

    pub fn parse(&self, value: Option<&Value>) -> Result<Option<Map<String, Value>>, Vec<Issue>> {
        match (self, value) {
            (InputSchema::Absent, None) => Ok(None),
            (InputSchema::Absent, Some(other)) => Err(vec![Issue::new(
                "",
                format!("Expected undefined, received {}", type_name(other)),
            )]),
            (InputSchema::Present(schema), value) => schema.parse(value).map(Some),
        }
    }
}

/// Declared output of an action.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum OutputSchema {
    /// No output declared: the action always answers with the constant `"OK"`.
    #[default]
    DefaultResponse,
    Custom(ValueSchema),
}

impl OutputSchema {
    pub fn from_schema(schema: Option<ValueSchema>) -> Self {
        match schema {
            Some(schema) => OutputSchema::Custom(schema),
            None => OutputSchema::DefaultResponse,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, OutputSchema::DefaultResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_accepts_only_no_value() {
        assert_eq!(InputSchema::Absent.parse(None), Ok(None));
        assert_eq!(
            InputSchema::Absent.parse(Some(&json!({}))).unwrap_err()[0].message,
            "Expected undefined, received object"
        );
    }

    #[test]
    fn present_parses_shape() {
        let schema = InputSchema::from_shape(Some(Shape::new().field("text", ValueSchema::string())));
        assert!(schema.is_present());
        let parsed = schema.parse(Some(&json!({"text": "John"}))).unwrap().unwrap();
        assert_eq!(parsed["text"], "John");
    }

    #[test]
    fn missing_output_is_default_response() {
        assert!(OutputSchema::from_schema(None).is_default());
        assert!(!OutputSchema::from_schema(Some(ValueSchema::string())).is_default());
    }
}
