//! # Bureau Business
//!
//! The business-entity layer: one wrapper owning one unit-of-work context
//! and one current entity, with uniform CRUD, a validation pipeline,
//! lifecycle hooks, a single last-error slot and a raw-statement escape
//! hatch.
//!
//! ```rust,ignore
//! use bureau_business::prelude::*;
//!
//! let mut orders: BusinessObject<Order> = BusinessObject::new(MemoryContext::new());
//! let order = orders.create()?;
//! order.customer = "Ada".into();
//! assert!(orders.save()?);
//! ```
//!
//! Operations report expected outcomes (not-found, validation failure, hook
//! rejection) through their return values plus the error slot; faults are
//! captured the same way and only propagate as `Err` for operation
//! categories enabled in [`PropagationPolicy`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod business;
pub mod error;
pub mod options;
pub mod rules;
pub mod settings;
pub mod validation;

pub use business::{BusinessObject, EntityNovelty};
pub use error::{BusinessError, BusinessResult};
pub use options::{BusinessOptions, PropagationPolicy};
pub use rules::{BusinessRules, NoRules};
pub use settings::ConnectionSettings;
pub use validation::{ValidationError, ValidationErrors};

/// Re-exports of the most commonly used types.
pub mod prelude {
    pub use crate::{
        BusinessError, BusinessObject, BusinessOptions, BusinessResult, BusinessRules,
        EntityNovelty, NoRules, PropagationPolicy, ValidationErrors,
    };
    pub use bureau_context::{
        Context, Entity, EntryState, KeySource, KeyValue, MemoryContext, TableRef,
    };
}
