//! Lifecycle hooks.

use crate::validation::ValidationErrors;
use bureau_context::Entity;

/// Lifecycle hooks for a business wrapper.
///
/// Every method is a no-op (or unconditionally approves) by default;
/// implement only what the entity's business policy needs. Hooks are
/// sequential checkpoints visited in a fixed order by each operation:
/// before-hook, then validation when enabled, then the persistence state
/// fixup and flush, then the after-hook.
///
/// A rules value is owned by its wrapper and may carry state (counters,
/// collaborators, configuration).
///
/// Note the non-rollback policy: a false return from
/// [`after_save`](Self::after_save) or [`after_delete`](Self::after_delete)
/// is reported as failure even though the data change already happened.
pub trait BusinessRules<E: Entity> {
    /// Runs after a new entity is registered with the context.
    fn after_created(&mut self, entity: &mut E) {
        let _ = entity;
    }

    /// Runs after an entity is loaded and before it becomes current.
    fn after_loaded(&mut self, entity: &mut E) {
        let _ = entity;
    }

    /// Runs before a save; returning `false` aborts it.
    fn before_save(&mut self, entity: &mut E) -> bool {
        let _ = entity;
        true
    }

    /// Runs after a successful flush; returning `false` reports failure.
    fn after_save(&mut self, entity: &mut E) -> bool {
        let _ = entity;
        true
    }

    /// Runs before a delete; returning `false` aborts it.
    fn before_delete(&mut self, entity: &E) -> bool {
        let _ = entity;
        true
    }

    /// Runs after a delete is staged (and flushed, when requested);
    /// returning `false` reports failure.
    fn after_delete(&mut self, entity: &E) -> bool {
        let _ = entity;
        true
    }

    /// Appends validation failures for the entity; returning `false` marks
    /// it invalid even without appended entries. Consulted only through the
    /// wrapper's validate calls.
    fn validate(&mut self, entity: &E, errors: &mut ValidationErrors) -> bool {
        let _ = (entity, errors);
        true
    }
}

/// The default rules: every hook approves, validation always passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRules;

impl<E: Entity> BusinessRules<E> for NoRules {}
