//! Statement parameter values.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A value bound to a statement parameter, or produced by a scalar query.
///
/// Covers the primitive shapes that appear in key columns and simple
/// filters. Rows in the reference store are JSON objects, so comparison
/// against row fields goes through [`SqlValue::matches_json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    /// SQL NULL.
    Null,
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 text.
    Text(String),
    /// UUID, compared in its hyphenated string form.
    Uuid(Uuid),
}

impl SqlValue {
    /// Returns the contained integer, if this is an `Int`.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the contained text, if this is a `Text`.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Compares this value against a JSON row field.
    ///
    /// Absent row fields are treated as JSON null. UUIDs match their
    /// serialized string form, which is how entities store them.
    #[must_use]
    pub fn matches_json(&self, field: &serde_json::Value) -> bool {
        match self {
            Self::Null => field.is_null(),
            Self::Int(v) => field.as_i64() == Some(*v),
            Self::Float(v) => field.as_f64() == Some(*v),
            Self::Bool(v) => field.as_bool() == Some(*v),
            Self::Text(v) => field.as_str() == Some(v.as_str()),
            Self::Uuid(v) => field
                .as_str()
                .and_then(|s| Uuid::parse_str(s).ok())
                .map(|parsed| parsed == *v)
                .unwrap_or(false),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{}", if *v { "TRUE" } else { "FALSE" }),
            Self::Text(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Self::Uuid(v) => write!(f, "'{v}'"),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}
