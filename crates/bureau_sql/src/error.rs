//! Error types for statement execution.

use thiserror::Error;

/// Result type for statement operations.
pub type SqlResult<T> = Result<T, SqlError>;

/// Errors that can occur while parsing or executing a statement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqlError {
    /// The statement text is outside the supported grammar.
    #[error("statement parse error: {message}")]
    Parse {
        /// Description of what was rejected.
        message: String,
    },

    /// A positional placeholder referenced a parameter that was not supplied.
    #[error("placeholder ?{index} has no bound parameter ({supplied} supplied)")]
    MissingParameter {
        /// Zero-based placeholder index.
        index: usize,
        /// Number of parameters that were supplied.
        supplied: usize,
    },

    /// The statement referenced a table the executor does not know.
    #[error("unknown table: {table}")]
    UnknownTable {
        /// The table name as written in the statement.
        table: String,
    },

    /// The executor failed while applying the statement.
    #[error("statement execution failed: {message}")]
    Execution {
        /// Description of the failure.
        message: String,
    },
}

impl SqlError {
    /// Creates a parse error with the given message.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Creates an execution error with the given message.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }
}
