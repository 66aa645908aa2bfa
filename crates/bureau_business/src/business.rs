//! The business wrapper.

use crate::error::{BusinessError, BusinessResult};
use crate::options::BusinessOptions;
use crate::rules::{BusinessRules, NoRules};
use crate::settings::ConnectionSettings;
use crate::validation::ValidationErrors;
use bureau_context::{
    Context, ContextResult, Entity, EntryState, EntryToken, KeyValue, MemoryContext, SaveReport,
};
use bureau_sql::{delete_by_key_statement, delete_where_statement, StatementExecutor};
use std::sync::Arc;
use tracing::{debug, warn};

/// Whether the current entity would be inserted, updated, or is unknown to
/// the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityNovelty {
    /// Staged for insert; no committed row yet.
    New,
    /// Tracked against an existing row.
    Existing,
    /// Not tracked; the context cannot tell.
    Untracked,
}

/// A business wrapper over one unit-of-work context and one entity type.
///
/// The wrapper exclusively owns its context; dropping the wrapper drops the
/// context. It holds at most one "current" entity, set by the create and
/// load operations and used as the implicit target of [`save`](Self::save).
/// Operations taking an explicit entity never touch the current one.
///
/// Failures land in a single last-error slot: each failing operation
/// overwrites it and each succeeding one clears it, so callers inspect it
/// immediately after the call. Faults additionally propagate as `Err` for
/// the operation categories enabled in the options' propagation policy.
///
/// Business policy plugs in through a [`BusinessRules`] value; the default
/// [`NoRules`] approves everything.
pub struct BusinessObject<E, C = MemoryContext, R = NoRules>
where
    E: Entity,
    C: Context,
    R: BusinessRules<E>,
{
    context: C,
    rules: R,
    options: BusinessOptions,
    current: Option<E>,
    current_token: Option<EntryToken>,
    validation_errors: ValidationErrors,
    last_error: Option<BusinessError>,
    settings: ConnectionSettings,
}

impl<E, C> BusinessObject<E, C, NoRules>
where
    E: Entity,
    C: Context,
{
    /// Creates a wrapper with default rules around an owned context.
    pub fn new(context: C) -> Self {
        Self::with_rules(context, NoRules)
    }
}

impl<E, C, R> BusinessObject<E, C, R>
where
    E: Entity,
    C: Context,
    R: BusinessRules<E>,
{
    /// Creates a wrapper with the given rules around an owned context.
    pub fn with_rules(context: C, rules: R) -> Self {
        Self {
            context,
            rules,
            options: BusinessOptions::default(),
            current: None,
            current_token: None,
            validation_errors: ValidationErrors::new(),
            last_error: None,
            settings: ConnectionSettings::new(),
        }
    }

    /// Replaces the wrapper's options.
    #[must_use]
    pub fn with_options(mut self, options: BusinessOptions) -> Self {
        self.options = options;
        self
    }

    // ----- accessors -------------------------------------------------

    /// The current entity, if any.
    pub fn current(&self) -> Option<&E> {
        self.current.as_ref()
    }

    /// Mutable access to the current entity, if any.
    pub fn current_mut(&mut self) -> Option<&mut E> {
        self.current.as_mut()
    }

    /// Takes the current entity out of the wrapper.
    pub fn take_current(&mut self) -> Option<E> {
        self.current_token = None;
        self.current.take()
    }

    /// The most recent failure, if the last operation failed.
    pub fn last_error(&self) -> Option<&BusinessError> {
        self.last_error.as_ref()
    }

    /// Human-readable form of the last error; empty when clear.
    pub fn error_message(&self) -> String {
        self.last_error
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    /// The accumulated validation failures.
    pub fn validation_errors(&self) -> &ValidationErrors {
        &self.validation_errors
    }

    /// Mutable access to the validation failures (for composing
    /// multi-entity validation).
    pub fn validation_errors_mut(&mut self) -> &mut ValidationErrors {
        &mut self.validation_errors
    }

    /// The wrapper's options.
    pub fn options(&self) -> &BusinessOptions {
        &self.options
    }

    /// Mutable access to the wrapper's options.
    pub fn options_mut(&mut self) -> &mut BusinessOptions {
        &mut self.options
    }

    /// The owned context.
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Mutable access to the owned context.
    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    /// The rules value.
    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// Mutable access to the rules value.
    pub fn rules_mut(&mut self) -> &mut R {
        &mut self.rules
    }

    /// The raw statement executor bound to the context's store.
    pub fn db(&self) -> Arc<dyn StatementExecutor> {
        self.context.executor()
    }

    /// The connection string, memoized per wrapper instance.
    pub fn connection_string(&self) -> &str {
        self.settings
            .connection_string(|| self.context.connection_string().to_string())
    }

    /// The qualified table name of `E`, memoized per wrapper instance.
    pub fn table_name(&self) -> &str {
        self.settings
            .table_name(|| self.context.qualified_table::<E>())
    }

    /// Whether the current entity would insert, update, or is untracked.
    ///
    /// A wrapper whose pending changes were just flushed reports
    /// `Untracked` until the entity is re-staged or re-loaded.
    pub fn is_new(&self) -> EntityNovelty {
        let Some(current) = &self.current else {
            return EntityNovelty::Untracked;
        };
        let state = self
            .current_token
            .and_then(|token| self.context.token_state(token))
            .or_else(|| current.key().map(|key| self.context.entry_state::<E>(&key)))
            .unwrap_or(EntryState::Detached);
        match state {
            EntryState::Added => EntityNovelty::New,
            EntryState::Detached => EntityNovelty::Untracked,
            _ => EntityNovelty::Existing,
        }
    }

    // ----- error plumbing --------------------------------------------

    fn record(&mut self, error: BusinessError) {
        if error.is_fault() {
            warn!(%error, "fault captured");
        } else {
            debug!(%error, "operation reported failure");
        }
        self.last_error = Some(error);
    }

    fn fail_expected<T>(&mut self, error: BusinessError, value: T) -> BusinessResult<T> {
        self.record(error);
        Ok(value)
    }

    fn fail_fault<T>(
        &mut self,
        error: BusinessError,
        propagate: bool,
        value: T,
    ) -> BusinessResult<T> {
        self.record(error.clone());
        if propagate {
            Err(error)
        } else {
            Ok(value)
        }
    }

    // ----- create / attach -------------------------------------------

    /// Creates a default entity, registers it as newly added, runs the
    /// after-created hook and makes it current.
    pub fn create(&mut self) -> BusinessResult<&mut E>
    where
        E: Default,
    {
        self.create_from(E::default())
    }

    /// Registers the given entity as newly added, runs the after-created
    /// hook and makes it current.
    pub fn create_from(&mut self, mut entity: E) -> BusinessResult<&mut E> {
        let token = match self.context.stage(&entity, EntryState::Added) {
            Ok(token) => token,
            Err(err) => {
                let error = BusinessError::from(err);
                self.record(error.clone());
                return Err(error);
            }
        };
        self.rules.after_created(&mut entity);
        self.current_token = Some(token);
        self.last_error = None;
        Ok(self.current.insert(entity))
    }

    /// Attaches an untracked entity, staging it as an update when a row
    /// with its key exists and as an insert otherwise, and makes it
    /// current. Nothing is flushed.
    pub fn attach(&mut self, entity: E) -> BusinessResult<&mut E> {
        match self.stage_for_save(&entity, None) {
            Ok(token) => {
                self.current_token = Some(token);
                self.last_error = None;
                Ok(self.current.insert(entity))
            }
            Err(err) => {
                let error = BusinessError::from(err);
                self.record(error.clone());
                Err(error)
            }
        }
    }

    // ----- load ------------------------------------------------------

    /// Loads the entity with the given key and makes it current.
    ///
    /// An absent key is a normal outcome: the current entity is cleared, a
    /// not-found error is recorded, and `Ok(None)` is returned. Store
    /// faults are captured and propagate only when the load category is
    /// enabled in the propagation policy.
    pub fn load(&mut self, key: impl Into<KeyValue>) -> BusinessResult<Option<&mut E>> {
        let key = key.into();
        let found = self.context.find::<E>(&key);
        self.finish_load(key, found)
    }

    /// Asynchronous variant of [`load`](Self::load).
    pub async fn load_async(&mut self, key: impl Into<KeyValue>) -> BusinessResult<Option<&mut E>> {
        let key = key.into();
        let found = self.context.find_async::<E>(&key).await;
        self.finish_load(key, found)
    }

    fn finish_load(
        &mut self,
        key: KeyValue,
        found: ContextResult<Option<E>>,
    ) -> BusinessResult<Option<&mut E>> {
        match found {
            Err(err) => {
                self.current = None;
                self.current_token = None;
                self.fail_fault(err.into(), self.options.propagation.load, None)
            }
            Ok(None) => {
                self.current = None;
                self.current_token = None;
                self.fail_expected(BusinessError::NotFound { key }, None)
            }
            Ok(Some(mut entity)) => {
                self.rules.after_loaded(&mut entity);
                self.current_token = self.context.entry_token::<E>(&key);
                self.last_error = None;
                Ok(Some(self.current.insert(entity)))
            }
        }
    }

    /// Loads the first entity matching the predicate and makes it current.
    /// Records a no-match error and returns `Ok(None)` when nothing
    /// matches.
    pub fn load_first<F>(&mut self, predicate: F) -> BusinessResult<Option<&mut E>>
    where
        F: FnMut(&E) -> bool,
    {
        match self.context.find_first::<E, F>(predicate) {
            Err(err) => {
                self.current = None;
                self.current_token = None;
                self.fail_fault(err.into(), self.options.propagation.load, None)
            }
            Ok(None) => {
                self.current = None;
                self.current_token = None;
                self.fail_expected(BusinessError::NoMatch, None)
            }
            Ok(Some(mut entity)) => {
                self.rules.after_loaded(&mut entity);
                self.current_token = entity
                    .key()
                    .and_then(|key| self.context.entry_token::<E>(&key));
                self.last_error = None;
                Ok(Some(self.current.insert(entity)))
            }
        }
    }

    /// Ad-hoc lookup of any entity type through the same context.
    ///
    /// Does not touch the current entity and runs no hooks; error-slot
    /// semantics match [`load`](Self::load).
    pub fn find<T: Entity>(&mut self, key: impl Into<KeyValue>) -> BusinessResult<Option<T>> {
        let key = key.into();
        match self.context.find::<T>(&key) {
            Err(err) => self.fail_fault(err.into(), self.options.propagation.load, None),
            Ok(None) => self.fail_expected(BusinessError::NotFound { key }, None),
            Ok(Some(entity)) => {
                self.last_error = None;
                Ok(Some(entity))
            }
        }
    }

    // ----- save ------------------------------------------------------

    /// Saves the current entity, or just flushes pending context changes
    /// when there is none.
    ///
    /// The full pipeline: before-save hook, optional auto-validation,
    /// tracking-state fixup (an untracked entity whose key has a committed
    /// row becomes an update, otherwise an insert), flush, generated-key
    /// write-back, after-save hook. Returns whether the save succeeded;
    /// the entity stays readable through [`current`](Self::current).
    pub fn save(&mut self) -> BusinessResult<bool> {
        match self.current.take() {
            None => match self.context.save_changes() {
                Ok(_) => {
                    self.last_error = None;
                    Ok(true)
                }
                Err(err) => self.fail_fault(err.into(), self.options.propagation.save, false),
            },
            Some(mut entity) => {
                let token = self.current_token;
                let result = self.save_inner(&mut entity, token);
                self.current = Some(entity);
                if matches!(result, Ok(true)) {
                    self.current_token = None;
                }
                result
            }
        }
    }

    /// Asynchronous variant of [`save`](Self::save).
    pub async fn save_async(&mut self) -> BusinessResult<bool> {
        match self.current.take() {
            None => match self.context.save_changes_async().await {
                Ok(_) => {
                    self.last_error = None;
                    Ok(true)
                }
                Err(err) => self.fail_fault(err.into(), self.options.propagation.save, false),
            },
            Some(mut entity) => {
                let token = self.current_token;
                let result = self.save_inner_async(&mut entity, token).await;
                self.current = Some(entity);
                if matches!(result, Ok(true)) {
                    self.current_token = None;
                }
                result
            }
        }
    }

    /// Saves an explicit entity without touching the current one.
    pub fn save_entity(&mut self, entity: &mut E) -> BusinessResult<bool> {
        self.save_inner(entity, None)
    }

    /// Asynchronous variant of [`save_entity`](Self::save_entity).
    pub async fn save_entity_async(&mut self, entity: &mut E) -> BusinessResult<bool> {
        self.save_inner_async(entity, None).await
    }

    /// Runs one save cycle for the entity inside a transaction: committed
    /// on success, rolled back otherwise. No nesting, no savepoints.
    pub fn save_entity_transacted(&mut self, entity: &mut E) -> BusinessResult<bool> {
        if let Err(err) = self.context.begin_transaction() {
            return self.fail_fault(err.into(), self.options.propagation.save, false);
        }
        let result = self.save_inner(entity, None);
        let end = if matches!(result, Ok(true)) {
            self.context.commit_transaction()
        } else {
            self.context.rollback_transaction()
        };
        if let Err(err) = end {
            return self.fail_fault(err.into(), self.options.propagation.save, false);
        }
        result
    }

    fn save_inner(&mut self, entity: &mut E, token: Option<EntryToken>) -> BusinessResult<bool> {
        let Some(token) = self.prepare_save(entity, token)? else {
            return Ok(false);
        };
        let flushed = self.context.save_changes();
        self.finish_save(entity, token, flushed)
    }

    async fn save_inner_async(
        &mut self,
        entity: &mut E,
        token: Option<EntryToken>,
    ) -> BusinessResult<bool> {
        let Some(token) = self.prepare_save(entity, token)? else {
            return Ok(false);
        };
        let flushed = self.context.save_changes_async().await;
        self.finish_save(entity, token, flushed)
    }

    /// Runs the pre-flush half of a save. `Ok(None)` means a recoverable
    /// abort was recorded; `Err` is a propagated staging fault.
    fn prepare_save(
        &mut self,
        entity: &mut E,
        token: Option<EntryToken>,
    ) -> BusinessResult<Option<EntryToken>> {
        if !self.rules.before_save(entity) {
            self.record(BusinessError::HookRejected {
                hook: "before_save",
            });
            return Ok(None);
        }
        if self.options.auto_validate && !self.validate_entity(entity, false) {
            // validate_entity recorded the failure
            return Ok(None);
        }
        match self.stage_for_save(entity, token) {
            Ok(token) => Ok(Some(token)),
            Err(err) => {
                let error = BusinessError::from(err);
                self.record(error.clone());
                if self.options.propagation.save {
                    Err(error)
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn finish_save(
        &mut self,
        entity: &mut E,
        token: EntryToken,
        flushed: ContextResult<SaveReport>,
    ) -> BusinessResult<bool> {
        match flushed {
            Err(err) => self.fail_fault(err.into(), self.options.propagation.save, false),
            Ok(report) => {
                if let Some(key) = report.generated_key(token) {
                    entity.set_key(key.clone());
                }
                if !self.rules.after_save(entity) {
                    // The flush already happened; failure is reported, the
                    // data stays persisted.
                    return self.fail_expected(
                        BusinessError::HookRejected { hook: "after_save" },
                        false,
                    );
                }
                debug!(affected = report.affected, table = self.table_name(), "saved");
                self.last_error = None;
                Ok(true)
            }
        }
    }

    /// Reconciles an entity's tracking state ahead of a flush.
    fn stage_for_save(
        &mut self,
        entity: &E,
        token: Option<EntryToken>,
    ) -> ContextResult<EntryToken> {
        if let Some(token) = token {
            if self.context.token_state(token).is_some() {
                return self.context.restage(token, entity);
            }
        }
        match entity.key() {
            None => self.context.stage(entity, EntryState::Added),
            Some(key) => match self.context.entry_state::<E>(&key) {
                EntryState::Detached => {
                    let exists = self.context.contains_key::<E>(&key)?;
                    let state = if exists {
                        EntryState::Modified
                    } else {
                        EntryState::Added
                    };
                    self.context.stage(entity, state)
                }
                _ => self.context.stage(entity, EntryState::Modified),
            },
        }
    }

    /// Flushes all pending context changes with no hooks and no
    /// validation. Returns the affected row count, or `-1` with the fault
    /// captured.
    pub fn save_changes(&mut self) -> BusinessResult<i64> {
        match self.context.save_changes() {
            Ok(report) => {
                self.last_error = None;
                Ok(report.affected as i64)
            }
            Err(err) => self.fail_fault(err.into(), self.options.propagation.save, -1),
        }
    }

    /// Asynchronous variant of [`save_changes`](Self::save_changes).
    pub async fn save_changes_async(&mut self) -> BusinessResult<i64> {
        match self.context.save_changes_async().await {
            Ok(report) => {
                self.last_error = None;
                Ok(report.affected as i64)
            }
            Err(err) => self.fail_fault(err.into(), self.options.propagation.save, -1),
        }
    }

    // ----- delete ----------------------------------------------------

    /// Resolves a key to an entity and delegates to
    /// [`delete_entity`](Self::delete_entity). A missing entity counts as
    /// already deleted and returns `Ok(true)`.
    ///
    /// Call sites that batch removals typically pass `persist = false` and
    /// flush once at the end; the entity-based form is usually called with
    /// `persist = true`.
    pub fn delete_by_key(&mut self, key: impl Into<KeyValue>, persist: bool) -> BusinessResult<bool> {
        let key = key.into();
        match self.context.find::<E>(&key) {
            Err(err) => self.fail_fault(err.into(), self.options.propagation.delete, false),
            Ok(None) => {
                self.last_error = None;
                Ok(true)
            }
            Ok(Some(mut entity)) => {
                self.rules.after_loaded(&mut entity);
                self.current_token = self.context.entry_token::<E>(&key);
                let snapshot = entity.clone();
                self.current = Some(entity);
                self.delete_entity(&snapshot, persist)
            }
        }
    }

    /// Removes the entity from tracking, optionally flushing immediately.
    ///
    /// Runs the before/after delete hooks around the removal; a false
    /// after-delete return is reported as failure although the staged (or
    /// flushed) removal stands.
    pub fn delete_entity(&mut self, entity: &E, persist: bool) -> BusinessResult<bool> {
        if !self.rules.before_delete(entity) {
            return self.fail_expected(
                BusinessError::HookRejected {
                    hook: "before_delete",
                },
                false,
            );
        }
        if let Err(err) = self.context.remove(entity) {
            return self.fail_fault(err.into(), self.options.propagation.delete, false);
        }
        if persist {
            if let Err(err) = self.context.save_changes() {
                return self.fail_fault(err.into(), self.options.propagation.delete, false);
            }
        }
        if !self.rules.after_delete(entity) {
            return self.fail_expected(
                BusinessError::HookRejected {
                    hook: "after_delete",
                },
                false,
            );
        }
        self.last_error = None;
        Ok(true)
    }

    /// Deletes by key with a literal statement, bypassing tracking.
    ///
    /// Any non-negative affected count (zero included) is success; a
    /// negative count is an execution failure surfaced from the executor's
    /// own error state.
    pub fn delete_direct(&mut self, key: impl Into<KeyValue>) -> BusinessResult<i64> {
        let table = self.table_name().to_string();
        let sql = delete_by_key_statement(&table, E::key_columns());
        let params = key.into().sql_params();
        self.run_direct(&sql, &params)
    }

    /// Deletes all rows matching a caller-supplied filter with a literal
    /// statement, bypassing tracking.
    pub fn delete_where_direct(&mut self, filter: &str) -> BusinessResult<i64> {
        let table = self.table_name().to_string();
        let sql = delete_where_statement(&table, filter);
        self.run_direct(&sql, &[])
    }

    fn run_direct(&mut self, sql: &str, params: &[bureau_sql::SqlValue]) -> BusinessResult<i64> {
        let executor = self.context.executor();
        let affected = executor.execute(sql, params);
        if affected < 0 {
            let message = executor
                .last_error()
                .unwrap_or_else(|| "unknown statement failure".to_string());
            return self.fail_fault(
                BusinessError::Statement { message },
                self.options.propagation.direct,
                -1,
            );
        }
        debug!(affected, sql, "direct statement executed");
        self.last_error = None;
        Ok(affected)
    }

    // ----- validation ------------------------------------------------

    /// Validates the current entity. A wrapper with no current entity is
    /// vacuously valid.
    pub fn validate(&mut self, keep_existing_errors: bool) -> bool {
        match self.current.take() {
            None => {
                if !keep_existing_errors {
                    self.validation_errors.clear();
                }
                true
            }
            Some(entity) => {
                let valid = self.validate_entity(&entity, keep_existing_errors);
                self.current = Some(entity);
                valid
            }
        }
    }

    /// Validates an explicit entity through the rules' validate hook.
    ///
    /// Clears the collection first unless told to keep accumulated
    /// entries. Invalid outcomes render all entries into the last-error
    /// slot.
    pub fn validate_entity(&mut self, entity: &E, keep_existing_errors: bool) -> bool {
        if !keep_existing_errors {
            self.validation_errors.clear();
        }
        let approved = self.rules.validate(entity, &mut self.validation_errors);
        let valid = approved && self.validation_errors.is_empty();
        if !valid {
            if self.validation_errors.is_empty() {
                self.validation_errors
                    .add("the validate hook rejected the entity");
            }
            self.record(BusinessError::Validation(self.validation_errors.clone()));
        }
        valid
    }
}
