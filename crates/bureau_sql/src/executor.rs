//! The statement executor trait.

use crate::error::SqlResult;
use crate::value::SqlValue;

/// Executes literal statements against a backing store.
///
/// This is the seam business layers use for direct statements that bypass
/// the tracked-entity path. Implementations own their error reporting: a
/// failed non-query returns `-1` and the cause is readable from
/// [`last_error`](Self::last_error) until the next call. Implementations
/// over a real database translate the statement as-is; the reference
/// in-memory implementation only accepts the grammar in
/// [`statement`](crate::statement).
pub trait StatementExecutor: Send + Sync {
    /// Runs a non-query statement and returns the affected row count.
    ///
    /// Returns `-1` on failure, with the cause recorded in the executor's
    /// own last-error state. Zero affected rows is a success.
    fn execute(&self, sql: &str, params: &[SqlValue]) -> i64;

    /// Runs a scalar query and returns its single value, if any.
    fn query_scalar(&self, sql: &str, params: &[SqlValue]) -> SqlResult<Option<SqlValue>>;

    /// Returns the most recent execution error, if the last call failed.
    fn last_error(&self) -> Option<String>;
}
