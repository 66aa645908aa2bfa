//! Tracking states and flush reports.

use crate::types::{EntryToken, KeyValue};

/// The tracking state of an entity relative to a context.
///
/// State transitions are owned by the context; consumers only nudge state
/// when staging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Not known to the context.
    Detached,
    /// Tracked with no pending change.
    Unchanged,
    /// Staged for insert; the key may be unassigned until flush.
    Added,
    /// Staged for update.
    Modified,
    /// Staged for removal.
    Deleted,
}

impl EntryState {
    /// Whether this state carries a pending write.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Added | Self::Modified | Self::Deleted)
    }
}

/// The result of flushing pending changes.
#[derive(Debug, Clone, Default)]
pub struct SaveReport {
    /// Number of rows inserted, updated or deleted.
    pub affected: usize,
    /// Keys generated during the flush, per staged entry.
    pub generated: Vec<(EntryToken, KeyValue)>,
}

impl SaveReport {
    /// Returns the key generated for the given entry, if any.
    #[must_use]
    pub fn generated_key(&self, token: EntryToken) -> Option<&KeyValue> {
        self.generated
            .iter()
            .find(|(t, _)| *t == token)
            .map(|(_, key)| key)
    }
}
