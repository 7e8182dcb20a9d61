//! Schema adapter: field schemas, shapes, and the composite input/output schemas
//! every action is described with.

pub mod adapter;
pub mod shape;
pub mod value;

pub use adapter::{InputSchema, OutputSchema};
pub use shape::{ObjectSchema, Shape};
pub use value::{NumberRules, Pattern, SchemaKind, StringFormat, StringRules, ValueSchema};

pub(crate) fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}
