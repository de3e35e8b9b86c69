//! Call-level errors for batch operations.

use crate::model::Role;
use thiserror::Error;

/// Errors that abort a whole batch before any item is processed.
///
/// Everything else (validation, business rules, store failures) is reported per item
/// in [`BatchResult::failed`](crate::batch::BatchResult::failed).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BatchError {
    /// The caller's role may not run batch operations.
    #[error("Unauthorized: batch operations require an admin role, caller is {role}")]
    Unauthorized { role: Role },

    /// The caller context carries no organization.
    #[error("Unauthorized: no organization in caller context")]
    MissingTenant,
}
