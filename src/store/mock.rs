//! # Mock Store
//!
//! Utilities for testing the orchestrator and clients without a running backend.
//!
//! - [`MockStore`] implements [`DataStore`] directly: script failures, then inspect the
//!   recorded calls.
//! - [`create_mock_store_client`] returns a real [`StoreClient`] plus the raw receiver,
//!   so a test can assert the exact [`StoreRequest`] a client sends and answer it by hand.

use super::actor::StoreRequest;
use super::{
    DataStore, LineStatus, Lookup, NewRecord, Procedure, ProcedureOutput, RecordKind,
    RecordPatch, StoreClient, StoreError, StoreResult,
};
use crate::model::TenantScope;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// A store call as seen by [`MockStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Update { id: String, patch: RecordPatch },
    Procedure(Procedure),
    Query(Lookup),
    Insert(Vec<NewRecord>),
    Delete { kind: RecordKind, ids: Vec<String> },
}

#[derive(Default)]
struct MockState {
    failing_records: HashMap<String, StoreError>,
    failing_lines: HashMap<String, Option<String>>,
    failing_warehouses: HashMap<String, StoreError>,
    failing_skus: HashMap<String, StoreError>,
    existing_skus: HashSet<String>,
    stocked_products: HashSet<String>,
    products_with_movements: HashSet<String>,
    calls: Vec<StoreCall>,
}

/// A scripted [`DataStore`] that records every call.
///
/// Everything succeeds unless scripted otherwise.
///
/// # Example
/// ```ignore
/// let mock = MockStore::new();
/// mock.fail_record("p2", StoreError::unknown("Update failed"));
///
/// let orchestrator = BatchOrchestrator::new(mock.clone());
/// // run a batch...
/// assert_eq!(mock.call_count(), 2);
/// ```
#[derive(Clone, Default)]
pub struct MockStore {
    state: Arc<Mutex<MockState>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    latency: Option<Duration>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every call, so concurrent calls overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fails updates, deletes and transfers addressing `id`.
    pub fn fail_record(&self, id: impl Into<String>, error: StoreError) {
        self.state().failing_records.insert(id.into(), error);
    }

    /// Reports a failed line for `product_id` in grouped adjustments.
    /// `None` reports the failure without a message.
    pub fn fail_line(&self, product_id: impl Into<String>, message: Option<&str>) {
        self.state()
            .failing_lines
            .insert(product_id.into(), message.map(str::to_string));
    }

    /// Fails the whole grouped adjustment call for `warehouse_id`.
    pub fn fail_warehouse(&self, warehouse_id: impl Into<String>, error: StoreError) {
        self.state()
            .failing_warehouses
            .insert(warehouse_id.into(), error);
    }

    /// Fails any insert call containing `sku`.
    pub fn fail_sku(&self, sku: impl Into<String>, error: StoreError) {
        self.state().failing_skus.insert(sku.into(), error);
    }

    pub fn with_existing_skus<I, S>(&self, skus: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state();
        state.existing_skus.extend(skus.into_iter().map(Into::into));
    }

    pub fn with_stocked_products<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state();
        state.stocked_products.extend(ids.into_iter().map(Into::into));
    }

    pub fn with_movements<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.state();
        state.products_with_movements.extend(ids.into_iter().map(Into::into));
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state().calls.len()
    }

    pub fn procedure_calls(&self) -> Vec<Procedure> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::Procedure(procedure) => Some(procedure),
                _ => None,
            })
            .collect()
    }

    /// Highest number of calls that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Panics if the store has been called at all.
    pub fn verify_no_calls(&self) {
        let count = self.call_count();
        if count != 0 {
            panic!("Expected no store calls, got {}", count);
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn enter(&self, call: StoreCall) {
        self.state().calls.push(call);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn record_error(&self, id: &str) -> Option<StoreError> {
        self.state().failing_records.get(id).cloned()
    }
}

#[async_trait]
impl DataStore for MockStore {
    async fn update_record(
        &self,
        _scope: &TenantScope,
        id: &str,
        patch: RecordPatch,
    ) -> StoreResult<()> {
        self.enter(StoreCall::Update {
            id: id.to_string(),
            patch,
        })
        .await;
        let result = match self.record_error(id) {
            Some(error) => Err(error),
            None => Ok(()),
        };
        self.exit();
        result
    }

    async fn call_procedure(
        &self,
        _scope: &TenantScope,
        procedure: Procedure,
    ) -> StoreResult<ProcedureOutput> {
        self.enter(StoreCall::Procedure(procedure.clone())).await;
        let result = match procedure {
            Procedure::BulkAdjustInventory {
                warehouse_id,
                lines,
            } => {
                let state = self.state();
                match state.failing_warehouses.get(&warehouse_id) {
                    Some(error) => Err(error.clone()),
                    None => Ok(ProcedureOutput::LineStatuses(
                        lines
                            .iter()
                            .map(|line| match state.failing_lines.get(&line.product_id) {
                                Some(message) => LineStatus {
                                    product_id: line.product_id.clone(),
                                    success: false,
                                    error: message.clone(),
                                },
                                None => LineStatus::ok(&line.product_id),
                            })
                            .collect(),
                    )),
                }
            }
            Procedure::TransferStock(transfer) => match self.record_error(&transfer.product_id) {
                Some(error) => Err(error),
                None => Ok(ProcedureOutput::Transferred {
                    from_quantity: 0,
                    to_quantity: transfer.quantity,
                }),
            },
        };
        self.exit();
        result
    }

    async fn query_existing(&self, _scope: &TenantScope, lookup: Lookup) -> StoreResult<Vec<String>> {
        self.enter(StoreCall::Query(lookup.clone())).await;
        let state = self.state();
        let (keys, known) = match lookup {
            Lookup::ProductSkus(keys) => (keys, &state.existing_skus),
            Lookup::StockedProducts(keys) => (keys, &state.stocked_products),
            Lookup::ProductsWithMovements(keys) => (keys, &state.products_with_movements),
        };
        let matched = keys.into_iter().filter(|key| known.contains(key)).collect();
        drop(state);
        self.exit();
        Ok(matched)
    }

    async fn insert_records(
        &self,
        _scope: &TenantScope,
        records: Vec<NewRecord>,
    ) -> StoreResult<Vec<String>> {
        self.enter(StoreCall::Insert(records.clone())).await;
        let result = {
            let state = self.state();
            let mut ids = Vec::with_capacity(records.len());
            let mut outcome = Ok(());
            for NewRecord::Product(product) in &records {
                if let Some(error) = state.failing_skus.get(&product.sku) {
                    outcome = Err(error.clone());
                    break;
                }
                if state.existing_skus.contains(&product.sku) {
                    outcome = Err(StoreError::duplicate_key(format!(
                        "Product with SKU '{}' already exists",
                        product.sku
                    )));
                    break;
                }
                ids.push(format!("new_{}", product.sku));
            }
            outcome.map(|()| ids)
        };
        self.exit();
        result
    }

    async fn delete_records(
        &self,
        _scope: &TenantScope,
        kind: RecordKind,
        ids: Vec<String>,
    ) -> StoreResult<()> {
        self.enter(StoreCall::Delete {
            kind,
            ids: ids.clone(),
        })
        .await;
        let result = match ids.iter().find_map(|id| self.record_error(id)) {
            Some(error) => Err(error),
            None => Ok(()),
        };
        self.exit();
        result
    }
}

// =============================================================================
// CHANNEL HELPERS
// =============================================================================

/// Creates a [`StoreClient`] whose requests arrive on the returned receiver.
///
/// Nothing answers them unless the test does, which makes it possible to assert the
/// exact request and to simulate dropped or failed responses.
pub fn create_mock_store_client(buffer_size: usize) -> (StoreClient, mpsc::Receiver<StoreRequest>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (StoreClient::new(sender), receiver)
}

/// Waits for the next request and returns it if it is a procedure call.
pub async fn expect_procedure(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(
    TenantScope,
    Procedure,
    oneshot::Sender<StoreResult<ProcedureOutput>>,
)> {
    match receiver.recv().await {
        Some(StoreRequest::Procedure {
            scope,
            procedure,
            respond_to,
        }) => Some((scope, procedure, respond_to)),
        _ => None,
    }
}

/// Waits for the next request and returns it if it is a record update.
pub async fn expect_update(
    receiver: &mut mpsc::Receiver<StoreRequest>,
) -> Option<(
    TenantScope,
    String,
    RecordPatch,
    oneshot::Sender<StoreResult<()>>,
)> {
    match receiver.recv().await {
        Some(StoreRequest::Update {
            scope,
            id,
            patch,
            respond_to,
        }) => Some((scope, id, patch, respond_to)),
        _ => None,
    }
}
