//! Generic record access for the table engine.
//!
//! Records expose their fields as a `serde_json::Value` tree. Columns and
//! filters name fields with dotted paths (`"users.0.fullName"`); a path is
//! parsed once into a [`FieldPath`] when the column or filter is registered,
//! so resolving it per row is a walk over pre-split segments.

use std::fmt;

use serde_json::Value;
use tracing::warn;

/// A pre-parsed dotted field path.
///
/// Malformed paths (empty, or with empty segments such as `"a..b"`) are
/// accepted but resolve to no value on every record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let segments: Vec<String> = trimmed.split('.').map(str::to_string).collect();
        if trimmed.is_empty() || segments.iter().any(|s| s.is_empty()) {
            warn!(path = raw, "Malformed field path, it will resolve to no value");
            return Self {
                raw: raw.to_string(),
                segments: Vec::new(),
            };
        }
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_valid(&self) -> bool {
        !self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for FieldPath {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

/// A row the table engine can operate on.
///
/// Implementors only map a top-level field name to a value; nested path
/// segments are walked by [`Record::get`].
pub trait Record {
    /// Identifier unique within the record's collection.
    fn id(&self) -> &str;

    /// Value of a top-level field, `None` when the record has no such field.
    fn field(&self, name: &str) -> Option<Value>;

    /// Resolve a dotted path. Invalid paths and missing fields yield `None`.
    fn get(&self, path: &FieldPath) -> Option<Value> {
        let (head, rest) = path.segments().split_first()?;
        let value = self.field(head)?;
        walk(value, rest)
    }
}

/// Descend into objects by key and into arrays by numeric index.
fn walk(value: Value, rest: &[String]) -> Option<Value> {
    let mut current = value;
    for segment in rest {
        current = match current {
            Value::Object(mut map) => map.remove(segment)?,
            Value::Array(mut items) => {
                let index: usize = segment.parse().ok()?;
                if index >= items.len() {
                    return None;
                }
                items.swap_remove(index)
            }
            _ => return None,
        };
    }
    Some(current)
}

impl Record for Value {
    fn id(&self) -> &str {
        self.get("id").and_then(Value::as_str).unwrap_or("")
    }

    fn field(&self, name: &str) -> Option<Value> {
        self.as_object().and_then(|map| map.get(name)).cloned()
    }
}

/// String form of a value used for filter matching.
///
/// Missing values and `null` have no string form, so they never equal any
/// selected filter value.
pub fn value_to_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(number_to_string(n)),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|v| value_to_string(Some(v)).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some("[object Object]".to_string()),
    }
}

/// Integral floats print without a fractional part, so `5.0` matches `"5"`.
fn number_to_string(n: &serde_json::Number) -> String {
    if n.is_i64() || n.is_u64() {
        return n.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}
