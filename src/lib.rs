//! # Inventory Batch
//!
//! > **Batch operations for a multi-tenant inventory, with partial-failure accounting.**
//!
//! This crate runs many independent inventory operations (product updates, stock
//! adjustments, transfers, deletions, imports) against a remote data store and reports
//! which items succeeded and which failed, without aborting the batch on the first error.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Partial failure is a result, not an error
//! A batch call only fails as a whole when the caller isn't allowed to run it. Every
//! other failure (bad input, business rule, store error) is recorded against its item in
//! a [`BatchResult`](batch::BatchResult). Callers check `total_failed` and resubmit the
//! failed subset if they want to.
//!
//! ### Bounded fan-out
//! Items are dispatched concurrently, but never more than `chunk_size` at a time. Imports
//! send one store call per chunk and run chunks in sequence. Adjustments send one call
//! per warehouse, with at most `chunk_size` warehouses in flight.
//!
//! ### Typed store errors
//! The store reports a closed [`StoreErrorKind`](store::StoreErrorKind). The orchestrator
//! matches on kinds, never on message text.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Orchestrator ([`batch`])
//! - **Role**: Authorization gate, validation, pre-filters, chunked dispatch, accounting.
//! - **Key items**: [`BatchOrchestrator`](batch::BatchOrchestrator), [`BatchResult`](batch::BatchResult),
//!   [`process_in_chunks`](batch::process_in_chunks).
//!
//! ### 2. The Store Seam ([`store`])
//! - **Role**: The [`DataStore`](store::DataStore) trait the orchestrator depends on, an
//!   in-memory [`StoreActor`](store::StoreActor) backend, and a [`MockStore`](store::mock::MockStore) for tests.
//!
//! ### 3. The Work Items ([`model`])
//! - **Role**: Plain DTOs submitted by request handlers, plus the caller's [`BatchContext`](model::BatchContext).
//!
//! ### 4. The Wiring ([`lifecycle`])
//! - **Role**: Spawns the store actor, builds the orchestrator, sets up tracing.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! # Run the demo with batch totals
//! RUST_LOG=info cargo run
//!
//! # Run the tests
//! cargo test
//! ```

pub mod batch;
pub mod lifecycle;
pub mod model;
pub mod store;
