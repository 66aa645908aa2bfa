//! Error types for context operations.

use crate::types::KeyValue;
use thiserror::Error;

/// Result type for context operations.
pub type ContextResult<T> = Result<T, ContextError>;

/// Errors that can occur in unit-of-work operations.
#[derive(Debug, Clone, Error)]
pub enum ContextError {
    /// An entity could not be serialized to or from its row form.
    #[error("row codec error: {message}")]
    Codec {
        /// Description of the codec failure.
        message: String,
    },

    /// An insert targeted a key that already has a row.
    #[error("duplicate key {key} in table {table}")]
    DuplicateKey {
        /// Qualified table name.
        table: String,
        /// The conflicting key.
        key: KeyValue,
    },

    /// An update targeted a key with no backing row.
    #[error("no row for key {key} in table {table}")]
    RowMissing {
        /// Qualified table name.
        table: String,
        /// The missing key.
        key: KeyValue,
    },

    /// An operation required a key the entity does not have yet.
    #[error("entity has no key value")]
    MissingKey,

    /// A staged-entry token no longer refers to a live entry.
    #[error("stale entry token")]
    StaleToken,

    /// A transaction was begun while another is active.
    #[error("a transaction is already active")]
    TransactionActive,

    /// Commit or rollback was called with no active transaction.
    #[error("no active transaction")]
    NoTransaction,
}

impl ContextError {
    /// Creates a codec error from any serializer failure.
    pub fn codec(err: impl std::fmt::Display) -> Self {
        Self::Codec {
            message: err.to_string(),
        }
    }
}
