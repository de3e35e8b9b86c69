//! Runtime wiring and observability.
//!
//! - [`InventorySystem`] - Starts the in-memory store actor and the orchestrator bound to it
//! - [`setup_tracing`] - Initializes the tracing/logging infrastructure

pub mod inventory_system;
pub mod tracing;

pub use inventory_system::*;
pub use self::tracing::*;
