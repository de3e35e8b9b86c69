//! # Data Store
//!
//! The remote data-operation interface the batch orchestrator consumes.
//!
//! ## Key Types
//!
//! - [`DataStore`]: the capability set (update, procedure call, existence query, insert, delete).
//! - [`StoreError`]: typed failures with a closed [`StoreErrorKind`].
//! - [`StoreActor`] / [`StoreClient`]: an in-memory backend running as a Tokio actor.
//! - [`mock`]: scripted stores for tests.
//!
//! Every call is scoped by a [`TenantScope`]; no call reads or writes across tenants.

pub mod actor;
pub mod client;
pub mod error;
pub mod mock;
mod tables;

pub use actor::*;
pub use client::*;
pub use error::*;
pub use tables::{ProductRecord, StockMovement};

use crate::model::{NewProduct, ProductPatch, QuantityChange, StockTransfer, TenantScope};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Record tables addressable by `update_record` and `delete_records`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Product,
}

/// A partial update for one record, tagged with its table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordPatch {
    Product(ProductPatch),
}

impl RecordPatch {
    pub fn kind(&self) -> RecordKind {
        match self {
            RecordPatch::Product(_) => RecordKind::Product,
        }
    }
}

/// A record to insert, tagged with its table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NewRecord {
    Product(NewProduct),
}

/// Existence queries used to pre-filter batches.
///
/// Each variant returns the subset of the given keys that match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lookup {
    /// SKUs already taken by a product.
    ProductSkus(Vec<String>),
    /// Product ids with a non-zero stock level in any warehouse.
    StockedProducts(Vec<String>),
    /// Product ids referenced by at least one stock movement.
    ProductsWithMovements(Vec<String>),
}

/// One line of a grouped inventory adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentLine {
    pub product_id: String,
    pub change: QuantityChange,
    pub reason: Option<String>,
}

/// Named server-side procedures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Procedure {
    /// Applies several adjustments to one warehouse, reporting a status per line.
    BulkAdjustInventory {
        warehouse_id: String,
        lines: Vec<AdjustmentLine>,
    },
    /// Atomically moves stock between two warehouses and records both movements.
    TransferStock(StockTransfer),
}

impl Procedure {
    pub fn name(&self) -> &'static str {
        match self {
            Procedure::BulkAdjustInventory { .. } => "bulk_adjust_inventory",
            Procedure::TransferStock(_) => "transfer_stock",
        }
    }
}

/// Per-line outcome of a grouped procedure call, in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineStatus {
    pub product_id: String,
    pub success: bool,
    pub error: Option<String>,
}

impl LineStatus {
    pub fn ok(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(product_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Result payload of a [`Procedure`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProcedureOutput {
    LineStatuses(Vec<LineStatus>),
    Transferred { from_quantity: i64, to_quantity: i64 },
}

/// The remote data operations a batch depends on.
///
/// Implementations must be safe to call concurrently: the orchestrator keeps up to
/// `chunk_size` calls in flight against the same store.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn update_record(
        &self,
        scope: &TenantScope,
        id: &str,
        patch: RecordPatch,
    ) -> StoreResult<()>;

    async fn call_procedure(
        &self,
        scope: &TenantScope,
        procedure: Procedure,
    ) -> StoreResult<ProcedureOutput>;

    async fn query_existing(&self, scope: &TenantScope, lookup: Lookup) -> StoreResult<Vec<String>>;

    /// Inserts all records or none of them. Returns the new ids in input order.
    async fn insert_records(
        &self,
        scope: &TenantScope,
        records: Vec<NewRecord>,
    ) -> StoreResult<Vec<String>>;

    /// Deletes all ids or none of them.
    async fn delete_records(
        &self,
        scope: &TenantScope,
        kind: RecordKind,
        ids: Vec<String>,
    ) -> StoreResult<()>;
}
