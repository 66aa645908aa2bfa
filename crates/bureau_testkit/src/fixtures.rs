//! Fixture entities and context helpers.

use bureau_context::{Context, Entity, EntryState, KeySource, KeyValue, MemoryContext, TableRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A customer record with a generated integer key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// Primary key; `None` until persisted.
    pub id: Option<i64>,
    /// Customer name.
    pub name: String,
    /// Contact address.
    pub email: String,
    /// Whether the customer is active.
    pub active: bool,
}

impl Entity for Customer {
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

/// A note record with a generated UUID key, pinned to the `archive` schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Primary key; `None` until persisted.
    pub id: Option<Uuid>,
    /// Note body.
    pub body: String,
    /// Whether the note is pinned.
    pub pinned: bool,
}

impl Entity for Note {
    fn table() -> TableRef {
        TableRef::with_schema("archive", "notes")
    }

    fn key_source() -> KeySource {
        KeySource::Uuid
    }

    fn key(&self) -> Option<KeyValue> {
        self.id.map(KeyValue::Uuid)
    }

    fn set_key(&mut self, key: KeyValue) {
        if let KeyValue::Uuid(id) = key {
            self.id = Some(id);
        }
    }
}

/// Builds an active customer with the given name and a derived email.
#[must_use]
pub fn customer(name: &str) -> Customer {
    Customer {
        id: None,
        name: name.to_string(),
        email: format!("{}@example.test", name.to_lowercase()),
        active: true,
    }
}

/// An empty in-memory context with the testkit connection string.
#[must_use]
pub fn test_context() -> MemoryContext {
    MemoryContext::new().with_connection_string("memory://testkit")
}

/// A context pre-seeded with `count` committed customers.
///
/// Seeded customers get sequence keys starting at 1 and names
/// `customer-1` through `customer-{count}`.
#[must_use]
pub fn seeded_context(count: usize) -> MemoryContext {
    let mut ctx = test_context();
    for i in 1..=count {
        let seeded = customer(&format!("customer-{i}"));
        ctx.stage(&seeded, EntryState::Added)
            .expect("staging a fixture customer cannot fail");
    }
    ctx.save_changes()
        .expect("seeding an empty store cannot fail");
    ctx
}
