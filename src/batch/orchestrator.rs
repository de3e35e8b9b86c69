//! # Batch Orchestrator
//!
//! Runs many independent store operations for one caller and reports a
//! [`BatchResult`] instead of aborting on the first failure.
//!
//! ## Flow
//!
//! 1. **Authorize** once. A non-admin caller gets [`BatchError`] and the store is never touched.
//! 2. **Validate** each item; malformed items fail individually.
//! 3. **Pre-filter** where the operation has business rules (deletions with dependents,
//!    imports with duplicate SKUs).
//! 4. **Dispatch** through [`dispatch`](super::dispatch) with the operation's chunk size.
//! 5. **Return** the frozen result. The orchestrator never retries; callers resubmit
//!    [`BatchResult::into_failed_items`] if they want to.

use super::config::BatchConfig;
use super::dispatch::{
    dispatch_each, dispatch_grouped, dispatch_groups, effective_chunk_size, ItemOutcome,
    OPERATION_FAILED,
};
use super::error::BatchError;
use super::result::{BatchAccumulator, BatchResult};
use crate::model::{
    BatchContext, ImportOptions, InventoryAdjustment, NewProduct, ProductPatch, ProductUpdate,
    StockTransfer, TenantScope,
};
use crate::store::{
    AdjustmentLine, DataStore, LineStatus, Lookup, NewRecord, Procedure, ProcedureOutput,
    RecordKind, RecordPatch, StoreErrorKind,
};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, instrument, warn};

/// Reason recorded for deletions blocked by stock or stock history.
pub const DEPENDENCY_REASON: &str = "Product has existing inventory or transactions";

impl From<LineStatus> for ItemOutcome {
    fn from(status: LineStatus) -> Self {
        if status.success {
            ItemOutcome::Succeeded
        } else {
            ItemOutcome::Failed(status.error)
        }
    }
}

/// Batch entry point for one data store.
///
/// The store is injected at construction; the orchestrator holds no other state,
/// so one instance can serve concurrent batch calls.
#[derive(Debug, Clone)]
pub struct BatchOrchestrator<S> {
    store: S,
    config: BatchConfig,
}

impl<S: DataStore> BatchOrchestrator<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, BatchConfig::default())
    }

    pub fn with_config(store: S, config: BatchConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Applies field changes to products, one `update_record` call per item.
    #[instrument(skip_all, fields(tenant = %ctx.tenant, user = %ctx.user_id, items = items.len()))]
    pub async fn update_products(
        &self,
        ctx: &BatchContext,
        items: Vec<ProductUpdate>,
        chunk_size: Option<usize>,
    ) -> Result<BatchResult<ProductUpdate>, BatchError> {
        authorize(ctx)?;
        let chunk_size = effective_chunk_size(chunk_size, self.config.update_chunk_size);
        let scope = &ctx.tenant;

        let mut acc = BatchAccumulator::new();
        let eligible = reject_invalid(items, &mut acc, |update| update.changes.validate());

        dispatch_each(
            eligible,
            chunk_size,
            |update| async move {
                self.store
                    .update_record(scope, &update.product_id, RecordPatch::Product(update.changes))
                    .await
                    .map_err(|e| e.item_message())
            },
            &mut acc,
        )
        .await;

        Ok(finish("update_products", acc))
    }

    /// Moves products into `category_id`.
    #[instrument(skip_all, fields(tenant = %ctx.tenant, user = %ctx.user_id, items = product_ids.len(), category_id = %category_id))]
    pub async fn assign_category(
        &self,
        ctx: &BatchContext,
        product_ids: Vec<String>,
        category_id: &str,
        chunk_size: Option<usize>,
    ) -> Result<BatchResult<String>, BatchError> {
        authorize(ctx)?;
        let chunk_size = effective_chunk_size(chunk_size, self.config.update_chunk_size);
        let scope = &ctx.tenant;

        let mut acc = BatchAccumulator::new();
        let eligible = reject_invalid(product_ids, &mut acc, |id| {
            require_id(id)?;
            if category_id.trim().is_empty() {
                return Err("Category id is required".to_string());
            }
            Ok(())
        });

        dispatch_each(
            eligible,
            chunk_size,
            |id| async move {
                let patch = ProductPatch {
                    category_id: Some(category_id.to_string()),
                    ..Default::default()
                };
                self.store
                    .update_record(scope, &id, RecordPatch::Product(patch))
                    .await
                    .map_err(|e| e.item_message())
            },
            &mut acc,
        )
        .await;

        Ok(finish("assign_category", acc))
    }

    /// Adjusts stock levels, grouped by warehouse.
    ///
    /// Each warehouse gets exactly one `bulk_adjust_inventory` call carrying all of its
    /// lines, so adjustments to one warehouse travel together. `chunk_size` bounds how
    /// many warehouse calls are in flight at once.
    #[instrument(skip_all, fields(tenant = %ctx.tenant, user = %ctx.user_id, items = items.len()))]
    pub async fn adjust_inventory(
        &self,
        ctx: &BatchContext,
        items: Vec<InventoryAdjustment>,
        chunk_size: Option<usize>,
    ) -> Result<BatchResult<InventoryAdjustment>, BatchError> {
        authorize(ctx)?;
        let chunk_size = effective_chunk_size(chunk_size, self.config.adjust_chunk_size);
        let scope = &ctx.tenant;

        let mut acc = BatchAccumulator::new();
        let eligible = reject_invalid(items, &mut acc, InventoryAdjustment::validate);

        let mut by_warehouse: BTreeMap<String, Vec<InventoryAdjustment>> = BTreeMap::new();
        for adjustment in eligible {
            by_warehouse
                .entry(adjustment.warehouse_id.clone())
                .or_default()
                .push(adjustment);
        }
        debug!(warehouses = by_warehouse.len(), "Grouped by warehouse");

        dispatch_groups(
            by_warehouse.into_values().collect(),
            chunk_size,
            |group| async move {
                let Some(warehouse_id) = group.first().map(|a| a.warehouse_id.clone()) else {
                    return Ok(Vec::new());
                };
                let lines = group
                    .iter()
                    .map(|adjustment| AdjustmentLine {
                        product_id: adjustment.product_id.clone(),
                        change: adjustment.normalized(),
                        reason: adjustment.reason.clone(),
                    })
                    .collect();
                let procedure = Procedure::BulkAdjustInventory {
                    warehouse_id,
                    lines,
                };
                match self.store.call_procedure(scope, procedure).await {
                    Ok(ProcedureOutput::LineStatuses(statuses)) => {
                        Ok(statuses.into_iter().map(ItemOutcome::from).collect::<Vec<_>>())
                    }
                    Ok(other) => {
                        warn!(?other, "Unexpected bulk_adjust_inventory response");
                        Err(OPERATION_FAILED.to_string())
                    }
                    Err(e) => Err(e.item_message()),
                }
            },
            &mut acc,
        )
        .await;

        Ok(finish("adjust_inventory", acc))
    }

    /// Transfers stock between warehouses, one `transfer_stock` call per item.
    #[instrument(skip_all, fields(tenant = %ctx.tenant, user = %ctx.user_id, items = items.len()))]
    pub async fn transfer_stock(
        &self,
        ctx: &BatchContext,
        items: Vec<StockTransfer>,
        chunk_size: Option<usize>,
    ) -> Result<BatchResult<StockTransfer>, BatchError> {
        authorize(ctx)?;
        let chunk_size = effective_chunk_size(chunk_size, self.config.transfer_chunk_size);
        let scope = &ctx.tenant;

        let mut acc = BatchAccumulator::new();
        let eligible = reject_invalid(items, &mut acc, StockTransfer::validate);

        dispatch_each(
            eligible,
            chunk_size,
            |transfer| async move {
                match self
                    .store
                    .call_procedure(scope, Procedure::TransferStock(transfer))
                    .await
                {
                    Ok(ProcedureOutput::Transferred { .. }) => Ok(()),
                    Ok(other) => {
                        warn!(?other, "Unexpected transfer_stock response");
                        Err(OPERATION_FAILED.to_string())
                    }
                    Err(e) => Err(e.item_message()),
                }
            },
            &mut acc,
        )
        .await;

        Ok(finish("transfer_stock", acc))
    }

    /// Deletes products that have neither stock nor stock history.
    ///
    /// Products with either fail with [`DEPENDENCY_REASON`] and are never sent to
    /// `delete_records`.
    #[instrument(skip_all, fields(tenant = %ctx.tenant, user = %ctx.user_id, items = product_ids.len()))]
    pub async fn delete_products(
        &self,
        ctx: &BatchContext,
        product_ids: Vec<String>,
        chunk_size: Option<usize>,
    ) -> Result<BatchResult<String>, BatchError> {
        authorize(ctx)?;
        let chunk_size = effective_chunk_size(chunk_size, self.config.delete_chunk_size);
        let scope = &ctx.tenant;

        let mut acc = BatchAccumulator::new();
        let candidates = reject_invalid(product_ids, &mut acc, |id| require_id(id));

        let deletable = if candidates.is_empty() {
            candidates
        } else {
            match self.blocked_products(scope, &candidates).await {
                Ok(blocked) => {
                    let (blocked_ids, deletable): (Vec<_>, Vec<_>) = candidates
                        .into_iter()
                        .partition(|id| blocked.contains(id));
                    debug!(blocked = blocked_ids.len(), "Dependency pre-filter");
                    for id in blocked_ids {
                        acc.fail(id, DEPENDENCY_REASON);
                    }
                    deletable
                }
                Err(message) => {
                    warn!(error = %message, "Dependency check failed");
                    for id in candidates {
                        acc.fail(id, message.clone());
                    }
                    Vec::new()
                }
            }
        };

        dispatch_each(
            deletable,
            chunk_size,
            |id| async move {
                self.store
                    .delete_records(scope, RecordKind::Product, vec![id])
                    .await
                    .map_err(|e| match e.kind {
                        StoreErrorKind::DependencyExists => DEPENDENCY_REASON.to_string(),
                        _ => e.item_message(),
                    })
            },
            &mut acc,
        )
        .await;

        Ok(finish("delete_products", acc))
    }

    /// Imports new products, one `insert_records` call per chunk.
    ///
    /// A failed insert fails its whole chunk; earlier chunks stay committed.
    /// With `skip_duplicates`, SKUs already in the store (or repeated in the input)
    /// fail up front and are never sent.
    #[instrument(skip_all, fields(tenant = %ctx.tenant, user = %ctx.user_id, items = items.len(), skip_duplicates = options.skip_duplicates))]
    pub async fn import_products(
        &self,
        ctx: &BatchContext,
        items: Vec<NewProduct>,
        options: ImportOptions,
        chunk_size: Option<usize>,
    ) -> Result<BatchResult<NewProduct>, BatchError> {
        authorize(ctx)?;
        let chunk_size = effective_chunk_size(chunk_size, self.config.import_chunk_size);
        let scope = &ctx.tenant;

        let mut acc = BatchAccumulator::new();
        let mut eligible = reject_invalid(items, &mut acc, NewProduct::validate);

        if options.skip_duplicates && !eligible.is_empty() {
            eligible = self.skip_duplicate_skus(scope, eligible, &mut acc).await;
        }

        dispatch_grouped(
            eligible,
            chunk_size,
            |chunk| async move {
                let count = chunk.len();
                let records = chunk.into_iter().map(NewRecord::Product).collect();
                match self.store.insert_records(scope, records).await {
                    Ok(ids) => {
                        debug!(requested = count, inserted = ids.len(), "Chunk inserted");
                        Ok(vec![ItemOutcome::Succeeded; ids.len()])
                    }
                    Err(e) => Err(e.item_message()),
                }
            },
            &mut acc,
        )
        .await;

        Ok(finish("import_products", acc))
    }

    /// Ids among `candidates` that hold stock or appear in stock movements.
    async fn blocked_products(
        &self,
        scope: &TenantScope,
        candidates: &[String],
    ) -> Result<HashSet<String>, String> {
        let stocked = self
            .store
            .query_existing(scope, Lookup::StockedProducts(candidates.to_vec()))
            .await
            .map_err(|e| e.item_message())?;
        let moved = self
            .store
            .query_existing(scope, Lookup::ProductsWithMovements(candidates.to_vec()))
            .await
            .map_err(|e| e.item_message())?;
        Ok(stocked.into_iter().chain(moved).collect())
    }

    async fn skip_duplicate_skus(
        &self,
        scope: &TenantScope,
        items: Vec<NewProduct>,
        acc: &mut BatchAccumulator<NewProduct>,
    ) -> Vec<NewProduct> {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(items.len());
        for product in items {
            if seen.insert(product.sku.clone()) {
                unique.push(product);
            } else {
                let error = format!("Duplicate SKU '{}' already exists in this import", product.sku);
                acc.fail(product, error);
            }
        }

        let skus = unique.iter().map(|product| product.sku.clone()).collect();
        let existing: HashSet<String> = match self
            .store
            .query_existing(scope, Lookup::ProductSkus(skus))
            .await
        {
            Ok(existing) => existing.into_iter().collect(),
            Err(e) => {
                warn!(error = %e, "Duplicate check failed");
                let message = e.item_message();
                for product in unique {
                    acc.fail(product, message.clone());
                }
                return Vec::new();
            }
        };
        debug!(existing = existing.len(), "Duplicate pre-filter");

        unique
            .into_iter()
            .filter_map(|product| {
                if existing.contains(&product.sku) {
                    let error = format!("Product with SKU '{}' already exists", product.sku);
                    acc.fail(product, error);
                    None
                } else {
                    Some(product)
                }
            })
            .collect()
    }
}

fn authorize(ctx: &BatchContext) -> Result<(), BatchError> {
    if ctx.tenant.is_empty() {
        warn!(user = %ctx.user_id, "Batch rejected: no organization");
        return Err(BatchError::MissingTenant);
    }
    if !ctx.role.is_admin() {
        warn!(user = %ctx.user_id, role = %ctx.role, "Batch rejected: not an admin");
        return Err(BatchError::Unauthorized { role: ctx.role });
    }
    Ok(())
}

fn require_id(id: &str) -> Result<(), String> {
    if id.trim().is_empty() {
        Err("Product id is required".to_string())
    } else {
        Ok(())
    }
}

/// Fails every item `validate` rejects and returns the rest in order.
fn reject_invalid<T>(
    items: Vec<T>,
    acc: &mut BatchAccumulator<T>,
    validate: impl Fn(&T) -> Result<(), String>,
) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match validate(&item) {
            Ok(()) => Some(item),
            Err(error) => {
                acc.fail(item, error);
                None
            }
        })
        .collect()
}

fn finish<T>(operation: &'static str, acc: BatchAccumulator<T>) -> BatchResult<T> {
    let result = acc.finish();
    info!(
        operation,
        total_processed = result.total_processed,
        total_success = result.total_success,
        total_failed = result.total_failed,
        "Batch complete"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use crate::store::mock::MockStore;

    #[test]
    fn authorize_requires_admin_and_tenant() {
        assert!(authorize(&BatchContext::new("org_1", "u1", Role::Owner)).is_ok());
        assert!(authorize(&BatchContext::new("org_1", "u1", Role::Admin)).is_ok());
        assert_eq!(
            authorize(&BatchContext::new("org_1", "u1", Role::Member)),
            Err(BatchError::Unauthorized { role: Role::Member })
        );
        assert_eq!(
            authorize(&BatchContext::new(" ", "u1", Role::Admin)),
            Err(BatchError::MissingTenant)
        );
    }

    #[test]
    fn orchestrator_exposes_store_and_config() {
        let config = BatchConfig {
            adjust_chunk_size: 3,
            ..Default::default()
        };
        let orchestrator = BatchOrchestrator::with_config(MockStore::new(), config);
        assert_eq!(orchestrator.config().adjust_chunk_size, 3);
        orchestrator.store().verify_no_calls();
    }

    #[test]
    fn line_status_converts_to_item_outcome() {
        assert_eq!(ItemOutcome::from(LineStatus::ok("p1")), ItemOutcome::Succeeded);
        assert_eq!(
            ItemOutcome::from(LineStatus::failed("p1", "Product not found")),
            ItemOutcome::Failed(Some("Product not found".to_string()))
        );
    }

    #[tokio::test]
    async fn test_invalid_items_fail_without_store_calls() {
        let mock = MockStore::new();
        let orchestrator = BatchOrchestrator::new(mock.clone());
        let ctx = BatchContext::new("org_1", "u1", Role::Admin);

        let result = orchestrator
            .transfer_stock(
                &ctx,
                vec![
                    StockTransfer::new("p1", "w1", "w1", 2),
                    StockTransfer::new("p2", "w1", "w2", 0),
                ],
                None,
            )
            .await
            .unwrap();

        assert_eq!(result.total_failed, 2);
        mock.verify_no_calls();
    }

    #[tokio::test]
    async fn test_delete_pre_filter_failure_fails_candidates() {
        let mock = MockStore::new();
        let orchestrator = BatchOrchestrator::new(ErroringQueries(mock.clone()));
        let ctx = BatchContext::new("org_1", "u1", Role::Admin);

        let result = orchestrator
            .delete_products(&ctx, vec!["p1".into(), "p2".into()], None)
            .await
            .unwrap();

        assert_eq!(result.total_failed, 2);
        assert!(result.failed.iter().all(|f| f.error == "query timeout"));
        assert!(mock
            .calls()
            .iter()
            .all(|call| !matches!(call, crate::store::mock::StoreCall::Delete { .. })));
    }

    /// Delegates to a mock but fails every existence query.
    struct ErroringQueries(MockStore);

    #[async_trait::async_trait]
    impl DataStore for ErroringQueries {
        async fn update_record(
            &self,
            scope: &TenantScope,
            id: &str,
            patch: RecordPatch,
        ) -> crate::store::StoreResult<()> {
            self.0.update_record(scope, id, patch).await
        }

        async fn call_procedure(
            &self,
            scope: &TenantScope,
            procedure: Procedure,
        ) -> crate::store::StoreResult<ProcedureOutput> {
            self.0.call_procedure(scope, procedure).await
        }

        async fn query_existing(
            &self,
            _scope: &TenantScope,
            _lookup: Lookup,
        ) -> crate::store::StoreResult<Vec<String>> {
            Err(crate::store::StoreError::unavailable("query timeout"))
        }

        async fn insert_records(
            &self,
            scope: &TenantScope,
            records: Vec<NewRecord>,
        ) -> crate::store::StoreResult<Vec<String>> {
            self.0.insert_records(scope, records).await
        }

        async fn delete_records(
            &self,
            scope: &TenantScope,
            kind: RecordKind,
            ids: Vec<String>,
        ) -> crate::store::StoreResult<()> {
            self.0.delete_records(scope, kind, ids).await
        }
    }
}
