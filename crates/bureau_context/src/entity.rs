//! The entity trait.

use crate::error::{ContextError, ContextResult};
use crate::types::{KeySource, KeyValue, TableRef};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Trait for record types mapped one-to-one to a table row.
///
/// Implementors declare their table, their key column(s) and how unset keys
/// are generated, and expose the key value for generic lookup. Field
/// serialization goes through serde; the key column must be a serialized
/// field so a stored row round-trips its own key.
///
/// # Example
///
/// ```rust,ignore
/// use bureau_context::{Entity, KeySource, KeyValue, TableRef};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Default, Serialize, Deserialize)]
/// struct Customer {
///     id: Option<i64>,
///     name: String,
/// }
///
/// impl Entity for Customer {
///     fn table() -> TableRef {
///         TableRef::new("customers")
///     }
///
///     fn key(&self) -> Option<KeyValue> {
///         self.id.map(KeyValue::Int)
///     }
///
///     fn set_key(&mut self, key: KeyValue) {
///         if let KeyValue::Int(id) = key {
///             self.id = Some(id);
///         }
///     }
/// }
/// ```
pub trait Entity: Clone + Send + Serialize + DeserializeOwned + 'static {
    /// Returns the table this entity type maps to.
    fn table() -> TableRef;

    /// Returns the column names backing the key, in key order.
    fn key_columns() -> &'static [&'static str] {
        &["id"]
    }

    /// Returns how unset keys are generated at flush time.
    fn key_source() -> KeySource {
        KeySource::Sequence
    }

    /// Returns the entity's key value, or `None` if not yet assigned.
    fn key(&self) -> Option<KeyValue>;

    /// Writes a key value into the entity (used for generated keys).
    fn set_key(&mut self, key: KeyValue);
}

/// Serializes an entity to its JSON row payload.
pub fn to_row<E: Entity>(entity: &E) -> ContextResult<serde_json::Value> {
    serde_json::to_value(entity).map_err(ContextError::codec)
}

/// Deserializes an entity from its JSON row payload.
pub fn from_row<E: Entity>(row: serde_json::Value) -> ContextResult<E> {
    serde_json::from_value(row).map_err(ContextError::codec)
}
