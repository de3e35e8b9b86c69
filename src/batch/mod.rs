//! Batch processing with partial-failure accounting.
//!
//! # Main Components
//!
//! - [`BatchOrchestrator`] - One operation per work kind (updates, adjustments, transfers,
//!   deletions, imports)
//! - [`BatchResult`] - Per-item outcome of a batch call
//! - [`BatchConfig`] - Default chunk sizes per operation
//! - [`process_in_chunks`] / [`process_grouped`] - The bounded fan-out primitives the
//!   orchestrator is built on, usable for any other operation
//! - [`BatchError`] - The only failures that abort a whole call

pub mod config;
pub mod dispatch;
pub mod error;
pub mod orchestrator;
pub mod result;

pub use config::*;
pub use dispatch::{effective_chunk_size, process_grouped, process_in_chunks, ItemOutcome, OPERATION_FAILED};
pub use error::*;
pub use orchestrator::*;
pub use result::{BatchResult, FailedItem};
