//! End-to-end behavior of the business wrapper over the reference context.

use bureau_business::prelude::*;
use bureau_context::TableRef;
use bureau_testkit::prelude::*;
use serde::{Deserialize, Serialize};

fn wrapper() -> BusinessObject<Customer> {
    BusinessObject::new(test_context())
}

fn seeded_wrapper(count: usize) -> BusinessObject<Customer> {
    BusinessObject::new(seeded_context(count))
}

#[test]
fn load_present_key_returns_entity_and_clears_error() {
    let mut customers = seeded_wrapper(3);

    // Leave a stale failure in the slot first.
    assert!(customers.load(999i64).unwrap().is_none());
    assert!(customers.last_error().is_some());

    let loaded = customers.load(2i64).unwrap().map(|c| c.clone());
    let loaded = loaded.expect("seeded key must load");
    assert_eq!(loaded.id, Some(2));
    assert_eq!(loaded.name, "customer-2");
    assert!(customers.last_error().is_none());
    assert_eq!(customers.current().map(|c| c.id), Some(Some(2)));
}

#[test]
fn load_absent_key_is_a_normal_outcome() {
    let mut customers = seeded_wrapper(1);
    let loaded = customers.load(41i64).unwrap();
    assert!(loaded.is_none());
    assert!(customers.current().is_none());
    assert!(matches!(
        customers.last_error(),
        Some(BusinessError::NotFound { .. })
    ));
    assert!(customers.error_message().contains("no row found"));
}

#[test]
fn load_first_matches_by_predicate() {
    let mut customers = seeded_wrapper(3);
    let found = customers
        .load_first(|c| c.name.ends_with("-3"))
        .unwrap()
        .map(|c| c.clone());
    assert_eq!(found.unwrap().id, Some(3));
    assert!(customers.last_error().is_none());

    assert!(customers
        .load_first(|c| c.name == "nobody")
        .unwrap()
        .is_none());
    assert!(matches!(
        customers.last_error(),
        Some(BusinessError::NoMatch)
    ));
}

#[test]
fn create_then_save_assigns_a_generated_key() {
    let mut customers = wrapper();
    {
        let fresh = customers.create().unwrap();
        fresh.name = "Ada".into();
        fresh.email = "ada@example.test".into();
        fresh.active = true;
    }
    assert!(customers.save().unwrap());
    assert!(customers.last_error().is_none());

    let id = customers.current().unwrap().id.expect("key was generated");
    let written = customers.current().unwrap().clone();

    let reread = customers.load(id).unwrap().map(|c| c.clone()).unwrap();
    assert_eq!(reread, written);
}

#[test]
fn save_twice_without_mutation_succeeds_both_times() {
    let mut customers = wrapper();
    customers.create().unwrap().name = "Grace".into();
    assert!(customers.save().unwrap());
    let id = customers.current().unwrap().id.unwrap();

    assert!(customers.save().unwrap());
    assert!(customers.last_error().is_none());

    let reread = customers.load(id).unwrap().map(|c| c.clone()).unwrap();
    assert_eq!(&reread, customers.current().unwrap());
}

#[test]
fn save_with_no_current_entity_just_flushes() {
    let mut customers = wrapper();
    assert!(customers.save().unwrap());
    assert!(customers.last_error().is_none());
}

#[test]
fn explicit_entity_save_does_not_touch_current() {
    let mut customers = seeded_wrapper(1);
    customers.load(1i64).unwrap();

    let mut other = customer("Edsger");
    assert!(customers.save_entity(&mut other).unwrap());
    assert!(other.id.is_some());
    assert_eq!(customers.current().unwrap().id, Some(1));
}

struct RequireName;

impl BusinessRules<Customer> for RequireName {
    fn validate(&mut self, entity: &Customer, errors: &mut ValidationErrors) -> bool {
        if entity.name.trim().is_empty() {
            errors.add("name is required");
        }
        errors.is_empty()
    }
}

#[test]
fn auto_validate_failure_persists_nothing() {
    let mut customers: BusinessObject<Customer, _, RequireName> =
        BusinessObject::with_rules(test_context(), RequireName)
            .with_options(BusinessOptions::new().auto_validate(true));

    customers.create().unwrap();
    assert!(!customers.save().unwrap());
    assert!(matches!(
        customers.last_error(),
        Some(BusinessError::Validation(_))
    ));
    assert!(customers.error_message().contains("name is required"));

    // Nothing reached the store.
    assert!(customers.load_first(|_| true).unwrap().is_none());
}

#[test]
fn auto_validate_success_saves_normally() {
    let mut customers: BusinessObject<Customer, _, RequireName> =
        BusinessObject::with_rules(test_context(), RequireName)
            .with_options(BusinessOptions::new().auto_validate(true));

    customers.create().unwrap().name = "Barbara".into();
    assert!(customers.save().unwrap());
    assert!(customers.last_error().is_none());
}

#[test]
fn validation_composes_across_entities() {
    let mut customers: BusinessObject<Customer, _, RequireName> =
        BusinessObject::with_rules(test_context(), RequireName);

    let nameless_a = customer("");
    let nameless_b = customer("");
    assert!(!customers.validate_entity(&nameless_a, false));
    assert!(!customers.validate_entity(&nameless_b, true));
    assert_eq!(customers.validation_errors().len(), 2);

    // A fresh validate clears the accumulated entries.
    assert!(customers.validate_entity(&customer("Ada"), false));
    assert!(customers.validation_errors().is_empty());
}

struct VetoSave;

impl BusinessRules<Customer> for VetoSave {
    fn before_save(&mut self, _entity: &mut Customer) -> bool {
        false
    }
}

#[test]
fn before_save_veto_prevents_persistence() {
    let mut customers: BusinessObject<Customer, _, VetoSave> =
        BusinessObject::with_rules(seeded_context(1), VetoSave);

    {
        let loaded = customers.load(1i64).unwrap().unwrap();
        loaded.name = "Renamed".into();
    }
    assert!(!customers.save().unwrap());
    assert!(matches!(
        customers.last_error(),
        Some(BusinessError::HookRejected {
            hook: "before_save"
        })
    ));

    // The store still holds the original values.
    let reread = customers.load(1i64).unwrap().map(|c| c.clone()).unwrap();
    assert_eq!(reread.name, "customer-1");
}

struct VetoAfterSave;

impl BusinessRules<Customer> for VetoAfterSave {
    fn after_save(&mut self, _entity: &mut Customer) -> bool {
        false
    }
}

#[test]
fn after_save_veto_reports_failure_but_data_is_persisted() {
    let mut customers: BusinessObject<Customer, _, VetoAfterSave> =
        BusinessObject::with_rules(test_context(), VetoAfterSave);

    customers.create().unwrap().name = "Ada".into();
    assert!(!customers.save().unwrap());
    assert!(matches!(
        customers.last_error(),
        Some(BusinessError::HookRejected { hook: "after_save" })
    ));

    // Non-rollback policy: the row exists despite the reported failure.
    let id = customers.current().unwrap().id.unwrap();
    assert!(customers.load(id).unwrap().is_some());
}

#[derive(Default)]
struct Journal {
    calls: Vec<&'static str>,
}

impl BusinessRules<Customer> for Journal {
    fn after_created(&mut self, _entity: &mut Customer) {
        self.calls.push("after_created");
    }
    fn after_loaded(&mut self, _entity: &mut Customer) {
        self.calls.push("after_loaded");
    }
    fn before_save(&mut self, _entity: &mut Customer) -> bool {
        self.calls.push("before_save");
        true
    }
    fn after_save(&mut self, _entity: &mut Customer) -> bool {
        self.calls.push("after_save");
        true
    }
    fn before_delete(&mut self, _entity: &Customer) -> bool {
        self.calls.push("before_delete");
        true
    }
    fn after_delete(&mut self, _entity: &Customer) -> bool {
        self.calls.push("after_delete");
        true
    }
    fn validate(&mut self, _entity: &Customer, _errors: &mut ValidationErrors) -> bool {
        self.calls.push("validate");
        true
    }
}

#[test]
fn hooks_run_in_a_fixed_order() {
    let mut customers: BusinessObject<Customer, _, Journal> =
        BusinessObject::with_rules(test_context(), Journal::default())
            .with_options(BusinessOptions::new().auto_validate(true));

    customers.create().unwrap().name = "Ada".into();
    assert!(customers.save().unwrap());
    let id = customers.current().unwrap().id.unwrap();
    assert!(customers.delete_by_key(id, true).unwrap());

    assert_eq!(
        customers.rules().calls,
        vec![
            "after_created",
            "before_save",
            "validate",
            "after_save",
            "after_loaded",
            "before_delete",
            "after_delete",
        ]
    );
}

#[test]
fn delete_by_key_of_absent_row_is_success() {
    let mut customers = seeded_wrapper(1);
    assert!(customers.delete_by_key(777i64, true).unwrap());
    assert!(customers.last_error().is_none());

    // The one seeded row is untouched.
    assert!(customers.load(1i64).unwrap().is_some());
}

#[test]
fn delete_by_key_without_persist_stages_only() {
    let mut customers = seeded_wrapper(1);
    assert!(customers.delete_by_key(1i64, false).unwrap());

    // Still committed until the pending changes flush.
    assert!(customers.context().contains_key::<Customer>(&KeyValue::Int(1)).unwrap());
    assert_eq!(customers.save_changes().unwrap(), 1);
    assert!(!customers.context().contains_key::<Customer>(&KeyValue::Int(1)).unwrap());
}

struct VetoDelete;

impl BusinessRules<Customer> for VetoDelete {
    fn before_delete(&mut self, _entity: &Customer) -> bool {
        false
    }
}

#[test]
fn before_delete_veto_keeps_the_row() {
    let mut customers: BusinessObject<Customer, _, VetoDelete> =
        BusinessObject::with_rules(seeded_context(1), VetoDelete);

    assert!(!customers.delete_by_key(1i64, true).unwrap());
    assert!(matches!(
        customers.last_error(),
        Some(BusinessError::HookRejected {
            hook: "before_delete"
        })
    ));
    assert!(customers.load(1i64).unwrap().is_some());
}

#[test]
fn duplicate_key_save_is_a_captured_fault_by_default() {
    let mut customers = seeded_wrapper(2);
    let mut clash = customer("Clash");
    clash.id = Some(1);
    customers.create_from(clash).unwrap();

    assert!(!customers.save().unwrap());
    let error = customers.last_error().expect("fault must be captured");
    assert!(error.is_fault());
    assert!(customers.error_message().contains("duplicate key"));
}

#[test]
fn duplicate_key_save_propagates_when_enabled() {
    let mut customers = seeded_wrapper(2).with_options(
        BusinessOptions::new().propagation(PropagationPolicy {
            save: true,
            ..PropagationPolicy::none()
        }),
    );
    let mut clash = customer("Clash");
    clash.id = Some(1);
    customers.create_from(clash).unwrap();

    let err = customers.save().unwrap_err();
    assert!(err.is_fault());
    // The fault is recorded before it propagates.
    assert!(customers.last_error().is_some());
}

/// Writes a row into the customers table whose shape does not decode as a
/// `Customer`, to provoke load-path faults.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Imposter {
    id: Option<i64>,
    name: bool,
}

impl Entity for Imposter {
    fn table() -> TableRef {
        TableRef::new("customers")
    }

    fn key(&self) -> Option<KeyValue> {
        self.id.map(KeyValue::Int)
    }

    fn set_key(&mut self, key: KeyValue) {
        if let KeyValue::Int(id) = key {
            self.id = Some(id);
        }
    }
}

fn context_with_undecodable_row(key: i64) -> MemoryContext {
    let mut ctx = test_context();
    let imposter = Imposter {
        id: Some(key),
        name: true,
    };
    ctx.stage(&imposter, EntryState::Added).unwrap();
    ctx.save_changes().unwrap();
    ctx
}

#[test]
fn load_fault_is_captured_by_default() {
    let mut customers: BusinessObject<Customer> =
        BusinessObject::new(context_with_undecodable_row(9));
    assert!(customers.load(9i64).unwrap().is_none());
    assert!(customers.last_error().map(BusinessError::is_fault).unwrap_or(false));
    assert!(customers.current().is_none());
}

#[test]
fn load_fault_propagates_when_enabled() {
    let mut customers: BusinessObject<Customer> =
        BusinessObject::new(context_with_undecodable_row(9)).with_options(
            BusinessOptions::new().propagation(PropagationPolicy {
                load: true,
                ..PropagationPolicy::none()
            }),
        );
    let err = customers.load(9i64).unwrap_err();
    assert!(err.is_fault());
    assert!(customers.last_error().is_some());
}

#[test]
fn transacted_save_commits_on_success() {
    let mut customers = wrapper();
    let mut entity = customer("Ada");
    assert!(customers.save_entity_transacted(&mut entity).unwrap());
    let id = entity.id.unwrap();
    assert!(customers.load(id).unwrap().is_some());
}

#[test]
fn transacted_save_rolls_back_on_validation_failure() {
    let mut customers: BusinessObject<Customer, _, RequireName> =
        BusinessObject::with_rules(seeded_context(1), RequireName)
            .with_options(BusinessOptions::new().auto_validate(true));

    let mut nameless = customer("");
    assert!(!customers.save_entity_transacted(&mut nameless).unwrap());
    assert!(matches!(
        customers.last_error(),
        Some(BusinessError::Validation(_))
    ));

    // The seeded row is still the only row.
    assert!(customers.load(1i64).unwrap().is_some());
    assert!(customers.load(2i64).unwrap().is_none());
}

#[test]
fn transacted_save_rolls_back_on_flush_fault() {
    let mut customers = seeded_wrapper(1);

    // Poison the pending changes with an update of a missing row, so the
    // transacted save's flush fails.
    let mut ghost = customer("Ghost");
    ghost.id = Some(50);
    customers
        .context_mut()
        .stage(&ghost, EntryState::Modified)
        .unwrap();

    let mut fresh = customer("Fresh");
    assert!(!customers.save_entity_transacted(&mut fresh).unwrap());
    assert!(customers.last_error().map(BusinessError::is_fault).unwrap_or(false));

    let reread = customers.load(1i64).unwrap().map(|c| c.clone()).unwrap();
    assert_eq!(reread.name, "customer-1");
    // Only the seeded row is committed; neither staged entity landed.
    assert!(!customers
        .context()
        .contains_key::<Customer>(&KeyValue::Int(50))
        .unwrap());
    assert!(customers.load_first(|c| c.name == "Fresh").unwrap().is_none());
}

#[test]
fn delete_direct_bypasses_tracking() {
    let mut customers = seeded_wrapper(3);
    assert_eq!(customers.delete_direct(2i64).unwrap(), 1);
    assert!(customers.last_error().is_none());

    // Zero affected rows is still success.
    assert_eq!(customers.delete_direct(2i64).unwrap(), 0);
    assert!(customers.last_error().is_none());

    assert!(customers.load(2i64).unwrap().is_none());
}

#[test]
fn delete_where_direct_applies_caller_filter() {
    let mut customers = seeded_wrapper(3);
    {
        let loaded = customers.load(3i64).unwrap().unwrap();
        loaded.active = false;
    }
    assert!(customers.save().unwrap());

    assert_eq!(customers.delete_where_direct("active = TRUE").unwrap(), 2);
    assert!(customers.load(3i64).unwrap().is_some());
}

#[test]
fn delete_where_direct_surfaces_executor_errors() {
    let mut customers = seeded_wrapper(1);
    assert_eq!(customers.delete_where_direct("name LIKE 'A%'").unwrap(), -1);
    assert!(matches!(
        customers.last_error(),
        Some(BusinessError::Statement { .. })
    ));

    let mut strict = seeded_wrapper(1).with_options(
        BusinessOptions::new().propagation(PropagationPolicy {
            direct: true,
            ..PropagationPolicy::none()
        }),
    );
    assert!(strict.delete_where_direct("name LIKE 'A%'").is_err());
}

#[test]
fn novelty_transitions_across_operations() {
    let mut customers = seeded_wrapper(1);
    assert_eq!(customers.is_new(), EntityNovelty::Untracked);

    customers.load(1i64).unwrap();
    assert_eq!(customers.is_new(), EntityNovelty::Existing);

    customers.create().unwrap().name = "Fresh".into();
    assert_eq!(customers.is_new(), EntityNovelty::New);

    assert!(customers.save().unwrap());
    // The flush cleared the tracker; the entity is untracked until
    // re-staged or re-loaded.
    assert_eq!(customers.is_new(), EntityNovelty::Untracked);
}

#[test]
fn attach_stages_update_for_existing_row() {
    let mut customers = seeded_wrapper(1);
    let mut replacement = customer("Replacement");
    replacement.id = Some(1);

    customers.attach(replacement).unwrap();
    assert_eq!(customers.is_new(), EntityNovelty::Existing);
    assert!(customers.save().unwrap());

    let reread = customers.load(1i64).unwrap().map(|c| c.clone()).unwrap();
    assert_eq!(reread.name, "Replacement");
}

#[test]
fn attach_stages_insert_for_unseen_key() {
    let mut customers = seeded_wrapper(1);
    let mut newcomer = customer("Newcomer");
    newcomer.id = Some(40);

    customers.attach(newcomer).unwrap();
    assert_eq!(customers.is_new(), EntityNovelty::New);
    assert!(customers.save().unwrap());
    assert!(customers.load(40i64).unwrap().is_some());
}

#[test]
fn ad_hoc_find_leaves_current_alone() {
    let mut customers = seeded_wrapper(1);
    customers.load(1i64).unwrap();

    let note = Note {
        id: None,
        body: "side channel".into(),
        pinned: false,
    };
    customers.context_mut().stage(&note, EntryState::Added).unwrap();
    let report = customers.context_mut().save_changes().unwrap();
    let note_key = report.generated[0].1.clone();

    let found: Option<Note> = customers.find(note_key).unwrap();
    assert_eq!(found.unwrap().body, "side channel");
    assert_eq!(customers.current().unwrap().id, Some(1));
}

#[test]
fn settings_resolve_per_wrapper_instance() {
    let customers = seeded_wrapper(1);
    assert_eq!(customers.connection_string(), "memory://testkit");
    assert_eq!(customers.table_name(), "customers");

    let notes: BusinessObject<Note> = BusinessObject::new(
        MemoryContext::new().with_connection_string("memory://elsewhere"),
    );
    assert_eq!(notes.connection_string(), "memory://elsewhere");
    assert_eq!(notes.table_name(), "archive.notes");
}

#[test]
fn uuid_keyed_entities_roundtrip() {
    let mut notes: BusinessObject<Note> = BusinessObject::new(test_context());
    notes.create().unwrap().body = "remember".into();
    assert!(notes.save().unwrap());

    let id = notes.current().unwrap().id.expect("uuid was generated");
    let reread = notes.load(id).unwrap().map(|n| n.clone()).unwrap();
    assert_eq!(reread.body, "remember");
}

#[tokio::test]
async fn async_variants_mirror_sync_behavior() {
    let mut customers = seeded_wrapper(1);

    let loaded = customers.load_async(1i64).await.unwrap().map(|c| c.clone());
    assert_eq!(loaded.unwrap().id, Some(1));

    customers.create().unwrap().name = "Async".into();
    assert!(customers.save_async().await.unwrap());
    let id = customers.current().unwrap().id.unwrap();

    assert!(customers.load_async(id).await.unwrap().is_some());
    assert_eq!(customers.save_changes_async().await.unwrap(), 0);

    let mut other = customer("AsyncExplicit");
    assert!(customers.save_entity_async(&mut other).await.unwrap());
    assert!(other.id.is_some());
}
