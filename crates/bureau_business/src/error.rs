//! Error types for business operations.

use crate::validation::ValidationErrors;
use bureau_context::{ContextError, KeyValue};
use thiserror::Error;

/// Result type for business operations.
///
/// The `Err` arm is only used for faults, and only when the operation's
/// category is enabled in
/// [`PropagationPolicy`](crate::options::PropagationPolicy). Expected
/// outcomes come back through the `Ok` value plus the wrapper's error slot.
pub type BusinessResult<T> = Result<T, BusinessError>;

/// A captured operation failure.
///
/// One value of this type lives in the wrapper's last-error slot at a time;
/// each failing operation overwrites it and each succeeding one clears it.
#[derive(Debug, Clone, Error)]
pub enum BusinessError {
    /// Key lookup found nothing. An expected outcome, not a fault.
    #[error("no row found for key {key}")]
    NotFound {
        /// The key that was looked up.
        key: KeyValue,
    },

    /// Predicate lookup found nothing. An expected outcome, not a fault.
    #[error("no row matched the predicate")]
    NoMatch,

    /// The validation pipeline rejected the entity.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// A lifecycle hook vetoed the operation.
    #[error("the {hook} hook rejected the operation")]
    HookRejected {
        /// Name of the vetoing hook.
        hook: &'static str,
    },

    /// The context failed while finding, staging or flushing.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// A direct statement failed, surfaced from the executor's own error
    /// state.
    #[error("direct statement failed: {message}")]
    Statement {
        /// The executor's reported cause.
        message: String,
    },
}

impl BusinessError {
    /// Whether this error is a fault (store/context/statement failure)
    /// rather than an expected outcome.
    #[must_use]
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Context(_) | Self::Statement { .. })
    }
}
