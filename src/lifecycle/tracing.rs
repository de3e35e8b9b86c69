//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered by `RUST_LOG`.
//!
//! ## What Gets Traced
//!
//! - **Batch calls**: one span per orchestrator operation with `tenant`, `user` and `items`
//!   fields, closed by a `Batch complete` event carrying `total_success` / `total_failed`
//! - **Dispatch**: chunk boundaries and per-item failures at `debug`
//! - **Store**: actor startup/shutdown, every request at `debug`, failed calls at `warn`
//! - **Authorization**: rejected callers at `warn`
//!
//! ## Usage
//!
//! ```bash
//! # Batch totals only
//! RUST_LOG=info cargo run
//!
//! # Chunk boundaries, per-item failures, store requests
//! RUST_LOG=debug cargo run
//!
//! # Only the dispatcher
//! RUST_LOG=inventory_batch::batch::dispatch=debug cargo run
//! ```
//!
//! With `RUST_LOG=info` an adjustment batch looks like:
//!
//! ```text
//! INFO adjust_inventory{tenant=org_demo user=user_1 items=4}: Batch complete operation="adjust_inventory" total_processed=4 total_success=3 total_failed=1
//! ```

/// Initializes the global subscriber. Call once, at program start.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
