//! The unit-of-work context trait.

use crate::entity::Entity;
use crate::error::ContextResult;
use crate::tracking::{EntryState, SaveReport};
use crate::types::{EntryToken, KeyValue};
use async_trait::async_trait;
use bureau_sql::StatementExecutor;
use std::sync::Arc;

/// A tracked unit of work over a backing store.
///
/// A context owns an identity-aware change tracker for one logical session:
/// lookups attach rows, staging records pending inserts/updates/deletes, and
/// [`save_changes`](Self::save_changes) applies everything at once. One
/// context is exclusively owned by one consumer; sharing a context across
/// consumers grows the identity map and cross-contaminates pending changes.
///
/// The asynchronous methods are cooperative suspension points around the
/// store round-trip only; they introduce no parallelism within one context.
/// The reference [`MemoryContext`](crate::MemoryContext) implements them by
/// delegating to the synchronous paths.
#[async_trait]
pub trait Context: Send {
    /// Finds an entity by key.
    ///
    /// Pending tracker entries shadow committed rows: a staged delete hides
    /// the row, staged payloads are returned as-is. A committed row found
    /// this way is attached as [`EntryState::Unchanged`].
    fn find<E: Entity>(&mut self, key: &KeyValue) -> ContextResult<Option<E>>;

    /// Asynchronous variant of [`find`](Self::find).
    async fn find_async<E: Entity>(&mut self, key: &KeyValue) -> ContextResult<Option<E>> {
        self.find(key)
    }

    /// Finds the first committed entity matching a predicate, in key order.
    fn find_first<E, F>(&mut self, predicate: F) -> ContextResult<Option<E>>
    where
        E: Entity,
        F: FnMut(&E) -> bool;

    /// Whether a committed row exists for the key. Ignores pending entries.
    fn contains_key<E: Entity>(&self, key: &KeyValue) -> ContextResult<bool>;

    /// Stages an entity with the desired state, replacing any entry already
    /// tracked under the same key.
    ///
    /// An entry staged `Added` keeps that state when restaged `Modified`;
    /// its insert has not happened yet.
    fn stage<E: Entity>(&mut self, entity: &E, state: EntryState) -> ContextResult<EntryToken>;

    /// Refreshes a staged entry's payload (and key) from the entity.
    ///
    /// Promotes `Unchanged` to `Modified`. Fails with
    /// [`StaleToken`](crate::ContextError::StaleToken) if the entry is gone.
    fn restage<E: Entity>(&mut self, token: EntryToken, entity: &E) -> ContextResult<EntryToken>;

    /// Removes an entity from tracking: a pending insert is dropped,
    /// anything else is staged `Deleted`.
    fn remove<E: Entity>(&mut self, entity: &E) -> ContextResult<()>;

    /// Returns the tracking state for a key, `Detached` if untracked.
    fn entry_state<E: Entity>(&self, key: &KeyValue) -> EntryState;

    /// Returns the state behind a token, or `None` once the entry is gone.
    fn token_state(&self, token: EntryToken) -> Option<EntryState>;

    /// Returns the token tracking a key, if any.
    fn entry_token<E: Entity>(&self, key: &KeyValue) -> Option<EntryToken>;

    /// Applies all pending entries to the store.
    ///
    /// On success the tracker is cleared and the report carries the affected
    /// row count plus any keys generated for pending inserts. On failure
    /// nothing is applied and the tracker is left intact.
    fn save_changes(&mut self) -> ContextResult<SaveReport>;

    /// Asynchronous variant of [`save_changes`](Self::save_changes).
    async fn save_changes_async(&mut self) -> ContextResult<SaveReport> {
        self.save_changes()
    }

    /// Begins a transaction. No nesting: fails if one is active.
    fn begin_transaction(&mut self) -> ContextResult<()>;

    /// Commits the active transaction.
    fn commit_transaction(&mut self) -> ContextResult<()>;

    /// Rolls the active transaction back, restoring the store to its state
    /// at [`begin_transaction`](Self::begin_transaction).
    fn rollback_transaction(&mut self) -> ContextResult<()>;

    /// Resolves the qualified table name for an entity type, applying the
    /// context's default schema when the entity declares none.
    fn qualified_table<E: Entity>(&self) -> String;

    /// Returns the connection string of the active connection.
    fn connection_string(&self) -> &str;

    /// Returns the raw statement executor bound to the same store.
    fn executor(&self) -> Arc<dyn StatementExecutor>;
}
