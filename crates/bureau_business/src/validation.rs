//! The validation error collection.

use bureau_context::KeyValue;
use std::fmt;

/// One validation failure: a message, optionally tied to an object key.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Human-readable description.
    pub message: String,
    /// Key of the offending object, when known.
    pub key: Option<KeyValue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{} ({key})", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// An ordered collection of validation failures.
///
/// Non-empty means invalid. The wrapper clears the collection at the start
/// of each validate call unless asked to keep accumulated entries, which is
/// how multi-entity validation composes across related objects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    entries: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a failure message.
    pub fn add(&mut self, message: impl Into<String>) {
        self.entries.push(ValidationError {
            message: message.into(),
            key: None,
        });
    }

    /// Appends a failure message tied to an object key.
    pub fn add_for(&mut self, message: impl Into<String>, key: KeyValue) {
        self.entries.push(ValidationError {
            message: message.into(),
            key: Some(key),
        });
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection holds no failures.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates the failures in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.entries.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
