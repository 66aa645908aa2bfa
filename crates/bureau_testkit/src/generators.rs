//! Property-based test generators.

use crate::fixtures::{Customer, Note};
use bureau_context::KeyValue;
use proptest::prelude::*;
use uuid::Uuid;

/// Strategy for customer names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9 ]{0,23}"
}

/// Strategy for unsaved customers (no key assigned yet).
pub fn customer_strategy() -> impl Strategy<Value = Customer> {
    (name_strategy(), "[a-z0-9]{1,12}", any::<bool>()).prop_map(|(name, local, active)| Customer {
        id: None,
        name,
        email: format!("{local}@example.test"),
        active,
    })
}

/// Strategy for unsaved notes (no key assigned yet).
pub fn note_strategy() -> impl Strategy<Value = Note> {
    (".{0,64}", any::<bool>()).prop_map(|(body, pinned)| Note {
        id: None,
        body,
        pinned,
    })
}

/// Strategy for scalar key values across the supported variants.
pub fn key_strategy() -> impl Strategy<Value = KeyValue> {
    prop_oneof![
        (1i64..1_000_000).prop_map(KeyValue::Int),
        any::<u128>().prop_map(|bits| KeyValue::Uuid(Uuid::from_u128(bits))),
        "[a-z]{1,16}".prop_map(KeyValue::Text),
    ]
}

/// Strategy for integer keys outside the seeded fixture range.
pub fn absent_key_strategy() -> impl Strategy<Value = KeyValue> {
    (1_000_000i64..2_000_000).prop_map(KeyValue::Int)
}
