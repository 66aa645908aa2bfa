//! In-memory reference context and statement executor.
//!
//! `MemoryContext` is a complete unit of work over process-local tables:
//! identity-aware finds, staged inserts/updates/deletes, generated keys,
//! and snapshot-based single-level transactions. `MemoryExecutor` applies
//! the minimal statement grammar to the same backing store, so direct
//! statements and tracked changes observe each other.
//!
//! Real deployments implement [`Context`] and
//! [`StatementExecutor`](bureau_sql::StatementExecutor) over their own
//! store; this pair exists as the reference semantics and the test
//! substrate.

use crate::context::Context;
use crate::entity::{from_row, to_row, Entity};
use crate::error::{ContextError, ContextResult};
use crate::tracking::{EntryState, SaveReport};
use crate::types::{EntryToken, KeySource, KeyValue};
use bureau_sql::SqlValue;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

type Tables = HashMap<String, BTreeMap<KeyValue, serde_json::Value>>;

#[derive(Debug, Clone, Default)]
struct StoreInner {
    tables: Tables,
    sequences: HashMap<String, i64>,
}

#[derive(Debug)]
struct Entry {
    token: EntryToken,
    table: String,
    state: EntryState,
    key: Option<KeyValue>,
    payload: serde_json::Value,
    key_source: KeySource,
    /// Column to patch when a key is generated; `None` for composite keys,
    /// which are never generated.
    key_column: Option<&'static str>,
}

/// The reference in-memory unit of work.
///
/// One `MemoryContext` owns one change tracker; the backing tables are
/// shared only with the [`MemoryExecutor`] it vends. Construction is
/// builder-style:
///
/// ```rust,ignore
/// let ctx = MemoryContext::new()
///     .with_connection_string("memory://orders")
///     .with_default_schema("app");
/// ```
pub struct MemoryContext {
    inner: Arc<RwLock<StoreInner>>,
    executor: Arc<MemoryExecutor>,
    entries: Vec<Entry>,
    next_token: u64,
    connection: String,
    default_schema: Option<String>,
    snapshot: Option<StoreInner>,
}

impl MemoryContext {
    /// Creates an empty context with the default connection string.
    #[must_use]
    pub fn new() -> Self {
        let inner = Arc::new(RwLock::new(StoreInner::default()));
        let executor = Arc::new(MemoryExecutor::new(Arc::clone(&inner)));
        Self {
            inner,
            executor,
            entries: Vec::new(),
            next_token: 0,
            connection: "memory://bureau".to_string(),
            default_schema: None,
            snapshot: None,
        }
    }

    /// Sets the connection string reported by this context.
    #[must_use]
    pub fn with_connection_string(mut self, connection: impl Into<String>) -> Self {
        self.connection = connection.into();
        self
    }

    /// Sets the default schema applied to entities that declare none.
    #[must_use]
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = Some(schema.into());
        self
    }

    /// Number of entries currently tracked (any state).
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.entries.len()
    }

    fn alloc_token(&mut self) -> EntryToken {
        self.next_token += 1;
        EntryToken::from_raw(self.next_token)
    }

    fn table_for<E: Entity>(&self) -> String {
        E::table().qualified(self.default_schema.as_deref())
    }

    fn entry_index(&self, table: &str, key: &KeyValue) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.table == table && e.key.as_ref() == Some(key))
    }

    fn entry_index_by_token(&self, token: EntryToken) -> Option<usize> {
        self.entries.iter().position(|e| e.token == token)
    }

    fn single_key_column<E: Entity>() -> Option<&'static str> {
        match E::key_columns() {
            [column] => Some(column),
            _ => None,
        }
    }
}

impl Default for MemoryContext {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_key(inner: &mut StoreInner, table: &str, source: KeySource) -> KeyValue {
    match source {
        KeySource::Uuid => KeyValue::Uuid(Uuid::new_v4()),
        KeySource::Sequence => {
            let mut seq = inner.sequences.get(table).copied().unwrap_or(0);
            loop {
                seq += 1;
                let candidate = KeyValue::Int(seq);
                let taken = inner
                    .tables
                    .get(table)
                    .map(|rows| rows.contains_key(&candidate))
                    .unwrap_or(false);
                if !taken {
                    break;
                }
            }
            inner.sequences.insert(table.to_string(), seq);
            KeyValue::Int(seq)
        }
    }
}

#[async_trait::async_trait]
impl Context for MemoryContext {
    fn find<E: Entity>(&mut self, key: &KeyValue) -> ContextResult<Option<E>> {
        let table = self.table_for::<E>();

        if let Some(idx) = self.entry_index(&table, key) {
            let entry = &self.entries[idx];
            return match entry.state {
                EntryState::Deleted => Ok(None),
                _ => from_row(entry.payload.clone()).map(Some),
            };
        }

        let row = {
            let inner = self.inner.read();
            inner
                .tables
                .get(&table)
                .and_then(|rows| rows.get(key))
                .cloned()
        };
        match row {
            None => Ok(None),
            Some(payload) => {
                let entity: E = from_row(payload.clone())?;
                let token = self.alloc_token();
                self.entries.push(Entry {
                    token,
                    table,
                    state: EntryState::Unchanged,
                    key: Some(key.clone()),
                    payload,
                    key_source: E::key_source(),
                    key_column: Self::single_key_column::<E>(),
                });
                Ok(Some(entity))
            }
        }
    }

    fn find_first<E, F>(&mut self, mut predicate: F) -> ContextResult<Option<E>>
    where
        E: Entity,
        F: FnMut(&E) -> bool,
    {
        let table = self.table_for::<E>();
        let inner = self.inner.read();
        let Some(rows) = inner.tables.get(&table) else {
            return Ok(None);
        };
        for payload in rows.values() {
            let entity: E = from_row(payload.clone())?;
            if predicate(&entity) {
                return Ok(Some(entity));
            }
        }
        Ok(None)
    }

    fn contains_key<E: Entity>(&self, key: &KeyValue) -> ContextResult<bool> {
        let table = self.table_for::<E>();
        let inner = self.inner.read();
        Ok(inner
            .tables
            .get(&table)
            .map(|rows| rows.contains_key(key))
            .unwrap_or(false))
    }

    fn stage<E: Entity>(&mut self, entity: &E, state: EntryState) -> ContextResult<EntryToken> {
        let table = self.table_for::<E>();
        let payload = to_row(entity)?;
        let key = entity.key();

        if let Some(key) = &key {
            if let Some(idx) = self.entry_index(&table, key) {
                let entry = &mut self.entries[idx];
                entry.payload = payload;
                // A pending insert stays an insert no matter how it is
                // restaged; the row does not exist yet.
                entry.state = match (entry.state, state) {
                    (EntryState::Added, EntryState::Modified) => EntryState::Added,
                    _ => state,
                };
                return Ok(entry.token);
            }
        }

        let token = self.alloc_token();
        self.entries.push(Entry {
            token,
            table,
            state,
            key,
            payload,
            key_source: E::key_source(),
            key_column: Self::single_key_column::<E>(),
        });
        Ok(token)
    }

    fn restage<E: Entity>(&mut self, token: EntryToken, entity: &E) -> ContextResult<EntryToken> {
        let idx = self
            .entry_index_by_token(token)
            .ok_or(ContextError::StaleToken)?;
        let payload = to_row(entity)?;
        let entry = &mut self.entries[idx];
        entry.payload = payload;
        entry.key = entity.key();
        if entry.state == EntryState::Unchanged {
            entry.state = EntryState::Modified;
        }
        Ok(token)
    }

    fn remove<E: Entity>(&mut self, entity: &E) -> ContextResult<()> {
        let table = self.table_for::<E>();
        let key = entity.key().ok_or(ContextError::MissingKey)?;

        if let Some(idx) = self.entry_index(&table, &key) {
            if self.entries[idx].state == EntryState::Added {
                self.entries.remove(idx);
                return Ok(());
            }
            self.entries[idx].state = EntryState::Deleted;
            self.entries[idx].payload = to_row(entity)?;
            return Ok(());
        }

        let token = self.alloc_token();
        self.entries.push(Entry {
            token,
            table,
            state: EntryState::Deleted,
            key: Some(key),
            payload: to_row(entity)?,
            key_source: E::key_source(),
            key_column: Self::single_key_column::<E>(),
        });
        Ok(())
    }

    fn entry_state<E: Entity>(&self, key: &KeyValue) -> EntryState {
        let table = self.table_for::<E>();
        self.entry_index(&table, key)
            .map(|idx| self.entries[idx].state)
            .unwrap_or(EntryState::Detached)
    }

    fn token_state(&self, token: EntryToken) -> Option<EntryState> {
        self.entry_index_by_token(token)
            .map(|idx| self.entries[idx].state)
    }

    fn entry_token<E: Entity>(&self, key: &KeyValue) -> Option<EntryToken> {
        let table = self.table_for::<E>();
        self.entry_index(&table, key)
            .map(|idx| self.entries[idx].token)
    }

    fn save_changes(&mut self) -> ContextResult<SaveReport> {
        if !self.entries.iter().any(|e| e.state.is_pending()) {
            self.entries.clear();
            return Ok(SaveReport::default());
        }

        let mut inner = self.inner.write();
        let backup_tables = inner.tables.clone();
        let backup_sequences = inner.sequences.clone();
        let mut report = SaveReport::default();

        let mut apply = || -> ContextResult<()> {
            for entry in &mut self.entries {
                match entry.state {
                    EntryState::Detached | EntryState::Unchanged => {}
                    EntryState::Added => {
                        let key = match entry.key.clone() {
                            Some(key) => key,
                            None => {
                                let column =
                                    entry.key_column.ok_or(ContextError::MissingKey)?;
                                let key = generate_key(&mut inner, &entry.table, entry.key_source);
                                if let Some(row) = entry.payload.as_object_mut() {
                                    row.insert(column.to_string(), key.to_json());
                                }
                                entry.key = Some(key.clone());
                                report.generated.push((entry.token, key.clone()));
                                key
                            }
                        };
                        let rows = inner.tables.entry(entry.table.clone()).or_default();
                        if rows.contains_key(&key) {
                            return Err(ContextError::DuplicateKey {
                                table: entry.table.clone(),
                                key,
                            });
                        }
                        rows.insert(key, entry.payload.clone());
                        report.affected += 1;
                    }
                    EntryState::Modified => {
                        let key = entry.key.clone().ok_or(ContextError::MissingKey)?;
                        let rows = inner.tables.entry(entry.table.clone()).or_default();
                        match rows.get_mut(&key) {
                            Some(slot) => {
                                *slot = entry.payload.clone();
                                report.affected += 1;
                            }
                            None => {
                                return Err(ContextError::RowMissing {
                                    table: entry.table.clone(),
                                    key,
                                })
                            }
                        }
                    }
                    EntryState::Deleted => {
                        let key = entry.key.clone().ok_or(ContextError::MissingKey)?;
                        if let Some(rows) = inner.tables.get_mut(&entry.table) {
                            if rows.remove(&key).is_some() {
                                report.affected += 1;
                            }
                        }
                    }
                }
            }
            Ok(())
        };

        match apply() {
            Ok(()) => {
                drop(inner);
                self.entries.clear();
                debug!(affected = report.affected, "flushed pending changes");
                Ok(report)
            }
            Err(err) => {
                inner.tables = backup_tables;
                inner.sequences = backup_sequences;
                warn!(%err, "flush failed, store restored");
                Err(err)
            }
        }
    }

    fn begin_transaction(&mut self) -> ContextResult<()> {
        if self.snapshot.is_some() {
            return Err(ContextError::TransactionActive);
        }
        let inner = self.inner.read();
        self.snapshot = Some(inner.clone());
        Ok(())
    }

    fn commit_transaction(&mut self) -> ContextResult<()> {
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or(ContextError::NoTransaction)
    }

    fn rollback_transaction(&mut self) -> ContextResult<()> {
        let snapshot = self.snapshot.take().ok_or(ContextError::NoTransaction)?;
        *self.inner.write() = snapshot;
        Ok(())
    }

    fn qualified_table<E: Entity>(&self) -> String {
        self.table_for::<E>()
    }

    fn connection_string(&self) -> &str {
        &self.connection
    }

    fn executor(&self) -> Arc<dyn bureau_sql::StatementExecutor> {
        Arc::clone(&self.executor) as Arc<dyn bureau_sql::StatementExecutor>
    }
}

/// Reference statement executor over the same store as a [`MemoryContext`].
///
/// Accepts only the grammar in [`bureau_sql::statement`]. Its last-error
/// state covers the most recent call: a failed call records the cause, a
/// successful one clears it.
pub struct MemoryExecutor {
    inner: Arc<RwLock<StoreInner>>,
    last_error: Mutex<Option<String>>,
}

impl MemoryExecutor {
    fn new(inner: Arc<RwLock<StoreInner>>) -> Self {
        Self {
            inner,
            last_error: Mutex::new(None),
        }
    }

    fn try_non_query(&self, sql: &str, params: &[SqlValue]) -> bureau_sql::SqlResult<i64> {
        match bureau_sql::statement::parse_statement(sql)? {
            bureau_sql::Statement::Delete { table, filter } => {
                let mut inner = self.inner.write();
                let Some(rows) = inner.tables.get_mut(&table) else {
                    return Ok(0);
                };
                match filter {
                    None => {
                        let n = rows.len() as i64;
                        rows.clear();
                        Ok(n)
                    }
                    Some(filter) => {
                        let mut doomed = Vec::new();
                        for (key, row) in rows.iter() {
                            if filter.matches(row, params)? {
                                doomed.push(key.clone());
                            }
                        }
                        for key in &doomed {
                            rows.remove(key);
                        }
                        Ok(doomed.len() as i64)
                    }
                }
            }
            bureau_sql::Statement::CountRows { .. } => Err(bureau_sql::SqlError::execution(
                "COUNT is not a non-query statement",
            )),
        }
    }

    fn try_scalar(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> bureau_sql::SqlResult<Option<SqlValue>> {
        match bureau_sql::statement::parse_statement(sql)? {
            bureau_sql::Statement::CountRows { table, filter } => {
                let inner = self.inner.read();
                let Some(rows) = inner.tables.get(&table) else {
                    return Ok(Some(SqlValue::Int(0)));
                };
                let mut count = 0i64;
                for row in rows.values() {
                    let matched = match &filter {
                        None => true,
                        Some(filter) => filter.matches(row, params)?,
                    };
                    if matched {
                        count += 1;
                    }
                }
                Ok(Some(SqlValue::Int(count)))
            }
            bureau_sql::Statement::Delete { .. } => Err(bureau_sql::SqlError::execution(
                "DELETE does not produce a scalar",
            )),
        }
    }
}

impl bureau_sql::StatementExecutor for MemoryExecutor {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> i64 {
        match self.try_non_query(sql, params) {
            Ok(affected) => {
                *self.last_error.lock() = None;
                affected
            }
            Err(err) => {
                warn!(%err, sql, "statement execution failed");
                *self.last_error.lock() = Some(err.to_string());
                -1
            }
        }
    }

    fn query_scalar(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> bureau_sql::SqlResult<Option<SqlValue>> {
        match self.try_scalar(sql, params) {
            Ok(value) => {
                *self.last_error.lock() = None;
                Ok(value)
            }
            Err(err) => {
                *self.last_error.lock() = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}
