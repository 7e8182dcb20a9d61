//! Field-level value schemas: type checks, string coercion and rules.

use crate::error::Issue;
use crate::schema::{child_path, ObjectSchema, Shape};
use chrono::DateTime;
use regex::Regex;
use serde_json::Value;

/// Regex rule compiled once. An invalid source is reported as an issue on every parse.
#[derive(Clone, Debug)]
pub struct Pattern {
    source: String,
    regex: Option<Regex>,
}

impl Pattern {
    pub fn new(source: &str) -> Self {
        Pattern {
            source: source.to_string(),
            regex: Regex::new(source).ok(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StringFormat {
    Email,
    Uuid,
    DateTime,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StringRules {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<Pattern>,
    pub format: Option<StringFormat>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NumberRules {
    pub integer: bool,
    /// Accept the decimal string form (path segments, query strings, env vars).
    pub coerce: bool,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SchemaKind {
    String(StringRules),
    Number(NumberRules),
    Boolean { coerce: bool },
    Literal(Value),
    Array(Box<ValueSchema>),
    Object(ObjectSchema),
    Any,
}

/// Schema of a single value. Built fluently: `ValueSchema::string().non_empty().email()`.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueSchema {
    kind: SchemaKind,
    optional: bool,
    default: Option<Value>,
    description: Option<String>,
}

impl ValueSchema {
    fn of(kind: SchemaKind) -> Self {
        ValueSchema {
            kind,
            optional: false,
            default: None,
            description: None,
        }
    }

    pub fn string() -> Self {
        Self::of(SchemaKind::String(StringRules::default()))
    }

    pub fn number() -> Self {
        Self::of(SchemaKind::Number(NumberRules::default()))
    }

    pub fn integer() -> Self {
        Self::of(SchemaKind::Number(NumberRules {
            integer: true,
            ..NumberRules::default()
        }))
    }

    pub fn boolean() -> Self {
        Self::of(SchemaKind::Boolean { coerce: false })
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::of(SchemaKind::Literal(value.into()))
    }

    pub fn array(item: ValueSchema) -> Self {
        Self::of(SchemaKind::Array(Box::new(item)))
    }

    pub fn object(shape: Shape) -> Self {
        Self::of(SchemaKind::Object(ObjectSchema::new(shape)))
    }

    pub fn any() -> Self {
        Self::of(SchemaKind::Any)
    }

    /// Numbers and booleans also accept their string form.
    pub fn coerce(mut self) -> Self {
        match &mut self.kind {
            SchemaKind::Number(rules) => rules.coerce = true,
            SchemaKind::Boolean { coerce } => *coerce = true,
            _ => {}
        }
        self
    }

    pub fn min_length(self, min: usize) -> Self {
        self.with_string_rules(|rules| rules.min_length = Some(min))
    }

    pub fn max_length(self, max: usize) -> Self {
        self.with_string_rules(|rules| rules.max_length = Some(max))
    }

    pub fn non_empty(self) -> Self {
        self.min_length(1)
    }

    pub fn pattern(self, source: &str) -> Self {
        self.with_string_rules(|rules| rules.pattern = Some(Pattern::new(source)))
    }

    pub fn email(self) -> Self {
        self.with_string_rules(|rules| rules.format = Some(StringFormat::Email))
    }

    pub fn uuid(self) -> Self {
        self.with_string_rules(|rules| rules.format = Some(StringFormat::Uuid))
    }

    /// RFC 3339 timestamp.
    pub fn date_time(self) -> Self {
        self.with_string_rules(|rules| rules.format = Some(StringFormat::DateTime))
    }

    pub fn minimum(self, min: f64) -> Self {
        self.with_number_rules(|rules| rules.minimum = Some(min))
    }

    pub fn maximum(self, max: f64) -> Self {
        self.with_number_rules(|rules| rules.maximum = Some(max))
    }

    pub fn positive(self) -> Self {
        self.with_number_rules(|rules| rules.exclusive_minimum = Some(0.0))
    }

    /// Missing or null values are accepted and omitted from the parsed object.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Value used when the field is missing or null.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    fn with_string_rules(mut self, apply: impl FnOnce(&mut StringRules)) -> Self {
        if let SchemaKind::String(rules) = &mut self.kind {
            apply(rules);
        }
        self
    }

    fn with_number_rules(mut self, apply: impl FnOnce(&mut NumberRules)) -> Self {
        if let SchemaKind::Number(rules) = &mut self.kind {
            apply(rules);
        }
        self
    }

    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    pub fn is_optional(&self) -> bool {
        self.optional || self.default.is_some()
    }

    pub fn default_ref(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Validate and coerce. All-or-nothing: either the whole parsed value or every issue found.
    pub fn parse(&self, value: Option<&Value>) -> Result<Value, Vec<Issue>> {
        let mut issues = Vec::new();
        let parsed = self.check(value, "", &mut issues);
        if issues.is_empty() {
            Ok(parsed.unwrap_or(Value::Null))
        } else {
            Err(issues)
        }
    }

    /// Returns `None` when the value is absent and allowed to be.
    pub(crate) fn check(&self, value: Option<&Value>, path: &str, issues: &mut Vec<Issue>) -> Option<Value> {
        let value = match value {
            None | Some(Value::Null) => {
                if let Some(default) = &self.default {
                    return Some(default.clone());
                }
                if !self.optional {
                    issues.push(Issue::new(path, "Required"));
                }
                return None;
            }
            Some(value) => value,
        };

        match &self.kind {
            SchemaKind::String(rules) => {
                let Some(s) = value.as_str() else {
                    issues.push(type_issue(path, "string", value));
                    return None;
                };
                check_string(s, rules, path, issues);
                Some(value.clone())
            }
            SchemaKind::Number(rules) => check_number(value, rules, path, issues),
            SchemaKind::Boolean { coerce } => match value {
                Value::Bool(_) => Some(value.clone()),
                Value::String(s) if *coerce && s.eq_ignore_ascii_case("true") => Some(Value::Bool(true)),
                Value::String(s) if *coerce && s.eq_ignore_ascii_case("false") => Some(Value::Bool(false)),
                _ => {
                    issues.push(type_issue(path, "boolean", value));
                    None
                }
            },
            SchemaKind::Literal(expected) => {
                if value == expected {
                    Some(value.clone())
                } else {
                    issues.push(Issue::new(path, format!("Invalid literal value, expected {}", expected)));
                    None
                }
            }
            SchemaKind::Array(item) => {
                let Some(items) = value.as_array() else {
                    issues.push(type_issue(path, "array", value));
                    return None;
                };
                let parsed = items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| {
                        item.check(Some(v), &child_path(path, &i.to_string()), issues)
                            .unwrap_or(Value::Null)
                    })
                    .collect();
                Some(Value::Array(parsed))
            }
            SchemaKind::Object(object) => object.check(Some(value), path, issues).map(Value::Object),
            SchemaKind::Any => Some(value.clone()),
        }
    }

    /// Shape an outgoing value: objects keep only declared fields, recursively.
    pub fn serialize(&self, value: Value) -> Value {
        match (&self.kind, value) {
            (SchemaKind::Object(object), Value::Object(map)) => Value::Object(object.project(map)),
            (SchemaKind::Array(item), Value::Array(items)) => {
                Value::Array(items.into_iter().map(|v| item.serialize(v)).collect())
            }
            (_, value) => value,
        }
    }
}

fn check_string(s: &str, rules: &StringRules, path: &str, issues: &mut Vec<Issue>) {
    let len = s.chars().count();
    if let Some(min) = rules.min_length {
        if len < min {
            issues.push(Issue::new(path, format!("String must contain at least {} character(s)", min)));
        }
    }
    if let Some(max) = rules.max_length {
        if len > max {
            issues.push(Issue::new(path, format!("String must contain at most {} character(s)", max)));
        }
    }
    if let Some(pattern) = &rules.pattern {
        match &pattern.regex {
            Some(re) if !re.is_match(s) => issues.push(Issue::new(path, "Invalid string: does not match pattern")),
            None => issues.push(Issue::new(path, format!("invalid pattern {}", pattern.source))),
            _ => {}
        }
    }
    match rules.format {
        Some(StringFormat::Email) if !is_email(s) => issues.push(Issue::new(path, "Invalid email")),
        Some(StringFormat::Uuid) if uuid::Uuid::parse_str(s).is_err() => issues.push(Issue::new(path, "Invalid uuid")),
        Some(StringFormat::DateTime) if DateTime::parse_from_rfc3339(s).is_err() => {
            issues.push(Issue::new(path, "Invalid datetime"))
        }
        _ => {}
    }
}

fn is_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !s.chars().any(char::is_whitespace)
                && !domain.contains('@')
        }
        None => false,
    }
}

fn check_number(value: &Value, rules: &NumberRules, path: &str, issues: &mut Vec<Issue>) -> Option<Value> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if rules.coerce => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    };
    let Some(n) = n else {
        issues.push(type_issue(path, "number", value));
        return None;
    };

    let before = issues.len();
    if rules.integer && n.fract() != 0.0 {
        issues.push(Issue::new(path, "Expected integer, received float"));
    }
    if let Some(min) = rules.minimum {
        if n < min {
            issues.push(Issue::new(path, format!("Number must be greater than or equal to {}", min)));
        }
    }
    if let Some(min) = rules.exclusive_minimum {
        if n <= min {
            issues.push(Issue::new(path, format!("Number must be greater than {}", min)));
        }
    }
    if let Some(max) = rules.maximum {
        if n > max {
            issues.push(Issue::new(path, format!("Number must be less than or equal to {}", max)));
        }
    }
    if issues.len() > before {
        return None;
    }

    match value {
        Value::Number(_) => Some(value.clone()),
        // Whole numbers from strings stay integral so they deserialize into integer types.
        _ if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Some(Value::from(n as i64)),
        _ => Some(Value::from(n)),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn type_issue(path: &str, expected: &str, value: &Value) -> Issue {
    Issue::new(path, format!("Expected {}, received {}", expected, type_name(value)))
}
