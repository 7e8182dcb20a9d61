//! Shapes (field name to schema) and the object schema composed from them.

use crate::error::Issue;
use crate::schema::value::type_issue;
use crate::schema::{child_path, ValueSchema};
use serde_json::{Map, Value};

/// Ordered mapping of field name to value schema. Re-declaring a field replaces it in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Shape {
    fields: Vec<(String, ValueSchema)>,
}

impl Shape {
    pub fn new() -> Self {
        Shape::default()
    }

    pub fn field(mut self, name: impl Into<String>, schema: ValueSchema) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = schema,
            None => self.fields.push((name, schema)),
        }
        self
    }

    /// Fields of `other` are added after ours; same-named fields take `other`'s schema.
    pub fn merge(self, other: Shape) -> Self {
        other
            .fields
            .into_iter()
            .fold(self, |shape, (name, schema)| shape.field(name, schema))
    }

    /// Every field becomes optional (PATCH bodies).
    pub fn partial(self) -> Self {
        Shape {
            fields: self
                .fields
                .into_iter()
                .map(|(name, schema)| (name, schema.optional()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ValueSchema> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, schema)| schema)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ValueSchema)> {
        self.fields.iter().map(|(name, schema)| (name.as_str(), schema))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, ValueSchema)> for Shape {
    fn from_iter<T: IntoIterator<Item = (K, ValueSchema)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Shape::new(), |shape, (name, schema)| shape.field(name, schema))
    }
}

/// Composite schema: parses to an object with exactly the shape's fields.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectSchema {
    shape: Shape,
}

impl ObjectSchema {
    pub fn new(shape: Shape) -> Self {
        ObjectSchema { shape }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Undeclared keys are dropped; nothing is returned unless every field passes.
    pub fn parse(&self, value: Option<&Value>) -> Result<Map<String, Value>, Vec<Issue>> {
        let mut issues = Vec::new();
        match self.check(value, "", &mut issues) {
            Some(map) if issues.is_empty() => Ok(map),
            _ => Err(issues),
        }
    }

    pub(crate) fn check(&self, value: Option<&Value>, path: &str, issues: &mut Vec<Issue>) -> Option<Map<String, Value>> {
        let map = match value {
            Some(Value::Object(map)) => map,
            None | Some(Value::Null) => {
                issues.push(Issue::new(path, "Required"));
                return None;
            }
            Some(other) => {
                issues.push(type_issue(path, "object", other));
                return None;
            }
        };
        let mut out = Map::new();
        for (name, schema) in self.shape.iter() {
            if let Some(parsed) = schema.check(map.get(name), &child_path(path, name), issues) {
                out.insert(name.to_string(), parsed);
            }
        }
        Some(out)
    }

    pub fn project(&self, mut map: Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        for (name, schema) in self.shape.iter() {
            if let Some(value) = map.remove(name) {
                out.insert(name.to_string(), schema.serialize(value));
            }
        }
        out
    }
}
