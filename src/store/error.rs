//! Error types for the data store.

use thiserror::Error;

/// Closed set of failure kinds a store call can report.
///
/// The orchestrator matches on these instead of inspecting message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// A natural key (e.g. SKU) is already taken.
    DuplicateKey,
    /// The record is still referenced by other records.
    DependencyExists,
    /// The addressed record does not exist in this tenant.
    NotFound,
    /// A stock level would drop below zero.
    InsufficientStock,
    /// Any other constraint or validation failure.
    Constraint,
    /// The store could not be reached.
    Unavailable,
    Unknown,
}

/// An error reported by a [`DataStore`](crate::store::DataStore) call.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{kind:?}: {message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn duplicate_key(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::DuplicateKey, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::NotFound, message)
    }

    pub fn insufficient_stock(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::InsufficientStock, message)
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Constraint, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Unavailable, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Unknown, message)
    }

    /// Message recorded against a failed batch item.
    ///
    /// Falls back to `"Unknown error"` when the store gave no message.
    pub fn item_message(&self) -> String {
        if self.message.trim().is_empty() {
            "Unknown error".to_string()
        } else {
            self.message.clone()
        }
    }
}

/// Result alias for store calls.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_message_falls_back_to_unknown_error() {
        assert_eq!(StoreError::unknown("").item_message(), "Unknown error");
        assert_eq!(
            StoreError::not_found("Product p1 not found").item_message(),
            "Product p1 not found"
        );
    }
}
