//! Key values, table references and tracking tokens.

use bureau_sql::SqlValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A primary-key value, looked up generically.
///
/// Single-column keys are one of the scalar variants; composite keys are an
/// ordered tuple of scalars paired positionally with the entity's declared
/// key columns.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyValue {
    /// 64-bit integer key.
    Int(i64),
    /// UUID key.
    Uuid(Uuid),
    /// Text key.
    Text(String),
    /// Composite key; one scalar per key column, in declaration order.
    Composite(Vec<KeyValue>),
}

impl KeyValue {
    /// Returns this key as a JSON value, as it appears in a row payload.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Int(v) => serde_json::Value::from(*v),
            Self::Uuid(v) => serde_json::Value::from(v.to_string()),
            Self::Text(v) => serde_json::Value::from(v.clone()),
            Self::Composite(parts) => {
                serde_json::Value::from(parts.iter().map(KeyValue::to_json).collect::<Vec<_>>())
            }
        }
    }

    /// Flattens this key into statement parameters, one per key column.
    #[must_use]
    pub fn sql_params(&self) -> Vec<SqlValue> {
        match self {
            Self::Int(v) => vec![SqlValue::Int(*v)],
            Self::Uuid(v) => vec![SqlValue::Uuid(*v)],
            Self::Text(v) => vec![SqlValue::Text(v.clone())],
            Self::Composite(parts) => parts.iter().flat_map(KeyValue::sql_params).collect(),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Uuid(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Composite(parts) => {
                write!(f, "(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{part}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<i64> for KeyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<Uuid> for KeyValue {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<&str> for KeyValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for KeyValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// A static table mapping: name plus optional schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRef {
    /// Table name.
    pub name: &'static str,
    /// Schema, if the entity pins one; otherwise the context's default
    /// schema (if any) applies.
    pub schema: Option<&'static str>,
}

impl TableRef {
    /// Creates an unqualified table reference.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self { name, schema: None }
    }

    /// Creates a schema-qualified table reference.
    #[must_use]
    pub const fn with_schema(schema: &'static str, name: &'static str) -> Self {
        Self {
            name,
            schema: Some(schema),
        }
    }

    /// Resolves the qualified name, preferring the entity's own schema and
    /// falling back to the supplied default.
    #[must_use]
    pub fn qualified(&self, default_schema: Option<&str>) -> String {
        match self.schema.or(default_schema) {
            Some(schema) => format!("{schema}.{}", self.name),
            None => self.name.to_string(),
        }
    }
}

/// How unset keys are generated at flush time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Per-table monotonically increasing `i64`.
    Sequence,
    /// Random v4 UUID.
    Uuid,
}

/// Handle to a staged change-tracker entry.
///
/// Tokens are valid until the entry is dropped or the tracker is cleared by
/// a successful flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryToken(u64);

impl EntryToken {
    /// Creates a token from its raw value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw token value.
    #[must_use]
    pub const fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_name_resolution() {
        let plain = TableRef::new("customers");
        assert_eq!(plain.qualified(None), "customers");
        assert_eq!(plain.qualified(Some("app")), "app.customers");

        let pinned = TableRef::with_schema("archive", "notes");
        assert_eq!(pinned.qualified(None), "archive.notes");
        // The entity's own schema wins over the context default.
        assert_eq!(pinned.qualified(Some("app")), "archive.notes");
    }

    #[test]
    fn key_display_and_params() {
        let key = KeyValue::Composite(vec![KeyValue::Int(3), KeyValue::Text("a".into())]);
        assert_eq!(key.to_string(), "(3, a)");
        assert_eq!(key.sql_params().len(), 2);
        assert_eq!(KeyValue::Int(9).to_string(), "9");
    }

    #[test]
    fn key_json_forms() {
        let id = Uuid::new_v4();
        assert_eq!(KeyValue::Int(5).to_json(), serde_json::json!(5));
        assert_eq!(
            KeyValue::Uuid(id).to_json(),
            serde_json::json!(id.to_string())
        );
    }
}
