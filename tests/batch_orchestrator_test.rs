use inventory_batch::batch::{BatchError, BatchOrchestrator, DEPENDENCY_REASON, OPERATION_FAILED};
use inventory_batch::model::{
    AdjustmentType, BatchContext, ImportOptions, InventoryAdjustment, NewProduct, ProductPatch,
    ProductUpdate, QuantityChange, Role, StockTransfer,
};
use inventory_batch::store::mock::{MockStore, StoreCall};
use inventory_batch::store::{NewRecord, Procedure, StoreError};
use std::collections::HashSet;
use std::time::Duration;

fn admin() -> BatchContext {
    BatchContext::new("org_1", "user_1", Role::Admin)
}

fn rename(id: &str, name: &str) -> ProductUpdate {
    ProductUpdate::new(
        id,
        ProductPatch {
            name: Some(name.to_string()),
            ..Default::default()
        },
    )
}

#[tokio::test]
async fn test_partial_failure_accounting() {
    let mock = MockStore::new();
    mock.fail_record("p2", StoreError::unknown("Update failed"));
    let orchestrator = BatchOrchestrator::new(mock.clone());

    let item1 = rename("p1", "First");
    let item2 = rename("p2", "Second");
    let result = orchestrator
        .update_products(&admin(), vec![item1.clone(), item2.clone()], None)
        .await
        .unwrap();

    assert_eq!(result.successful, vec![item1]);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].item, item2);
    assert_eq!(result.failed[0].error, "Update failed");
    assert_eq!(result.total_success, 1);
    assert_eq!(result.total_failed, 1);
    assert_eq!(result.total_processed, 2);
}

#[tokio::test]
async fn test_empty_input_returns_empty_result() {
    let mock = MockStore::new();
    let orchestrator = BatchOrchestrator::new(mock.clone());

    let result = orchestrator
        .delete_products(&admin(), Vec::new(), None)
        .await
        .unwrap();

    assert!(result.successful.is_empty());
    assert!(result.failed.is_empty());
    assert_eq!(result.total_processed, 0);
    assert_eq!(result.total_success, 0);
    assert_eq!(result.total_failed, 0);
    mock.verify_no_calls();
}

#[tokio::test]
async fn test_authorization_gate_runs_before_any_store_call() {
    let mock = MockStore::new();
    let orchestrator = BatchOrchestrator::new(mock.clone());
    let member = BatchContext::new("org_1", "user_2", Role::Member);

    let err = orchestrator
        .update_products(&member, vec![rename("p1", "x")], None)
        .await
        .unwrap_err();
    assert_eq!(err, BatchError::Unauthorized { role: Role::Member });

    let err = orchestrator
        .import_products(
            &member,
            vec![NewProduct::new("SKU-1", "Widget", 1.0)],
            ImportOptions {
                skip_duplicates: true,
            },
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err, BatchError::Unauthorized { role: Role::Member });

    let no_tenant = BatchContext::new("", "user_1", Role::Owner);
    let err = orchestrator
        .delete_products(&no_tenant, vec!["p1".to_string()], None)
        .await
        .unwrap_err();
    assert_eq!(err, BatchError::MissingTenant);

    mock.verify_no_calls();
}

#[tokio::test]
async fn test_completeness_and_exclusivity() {
    let mock = MockStore::new();
    for i in (0..30).step_by(4) {
        mock.fail_record(format!("p{}", i), StoreError::not_found(""));
    }
    let orchestrator = BatchOrchestrator::new(mock.clone());

    let items: Vec<ProductUpdate> = (0..30).map(|i| rename(&format!("p{}", i), "n")).collect();
    let result = orchestrator
        .update_products(&admin(), items.clone(), Some(7))
        .await
        .unwrap();

    assert_eq!(result.total_processed, items.len());
    assert_eq!(result.successful.len() + result.failed.len(), items.len());
    assert_eq!(result.total_success + result.total_failed, result.total_processed);

    let succeeded: HashSet<String> = result
        .successful
        .iter()
        .map(|u| u.product_id.clone())
        .collect();
    let failed: HashSet<String> = result
        .failed
        .iter()
        .map(|f| f.item.product_id.clone())
        .collect();
    assert!(succeeded.is_disjoint(&failed));
    assert_eq!(succeeded.len() + failed.len(), items.len());
    assert!(result.failed.iter().all(|f| f.error == "Unknown error"));
}

#[tokio::test]
async fn test_chunk_size_does_not_change_classification() {
    let mock = MockStore::new();
    mock.fail_record("p3", StoreError::unknown("locked"));
    mock.fail_record("p17", StoreError::unknown("locked"));
    let orchestrator = BatchOrchestrator::new(mock);
    let items: Vec<ProductUpdate> = (0..25).map(|i| rename(&format!("p{}", i), "n")).collect();

    let classify = |result: inventory_batch::batch::BatchResult<ProductUpdate>| {
        let ok: HashSet<String> = result.successful.into_iter().map(|u| u.product_id).collect();
        let failed: HashSet<String> = result
            .failed
            .into_iter()
            .map(|f| f.item.product_id)
            .collect();
        (ok, failed)
    };

    let small = orchestrator
        .update_products(&admin(), items.clone(), Some(10))
        .await
        .unwrap();
    let whole = orchestrator
        .update_products(&admin(), items, Some(25))
        .await
        .unwrap();

    assert_eq!(classify(small), classify(whole));
}

#[tokio::test]
async fn test_in_flight_calls_bounded_by_chunk_size() {
    let mock = MockStore::new().with_latency(Duration::from_millis(5));
    let orchestrator = BatchOrchestrator::new(mock.clone());
    let transfers: Vec<StockTransfer> = (0..12)
        .map(|i| StockTransfer::new(format!("p{}", i), "w1", "w2", 1))
        .collect();

    let result = orchestrator
        .transfer_stock(&admin(), transfers, Some(3))
        .await
        .unwrap();

    assert_eq!(result.total_success, 12);
    assert_eq!(mock.call_count(), 12);
    assert!(mock.max_in_flight() <= 3);
}

#[tokio::test]
async fn test_adjustments_grouped_once_per_warehouse() {
    let mock = MockStore::new();
    let orchestrator = BatchOrchestrator::new(mock.clone());

    let items = vec![
        InventoryAdjustment::new("p1", "w1", AdjustmentType::Add, 1),
        InventoryAdjustment::new("p2", "w2", AdjustmentType::Add, 2),
        InventoryAdjustment::new("p3", "w1", AdjustmentType::Add, 3),
        InventoryAdjustment::new("p4", "w2", AdjustmentType::Add, 4),
        InventoryAdjustment::new("p5", "w1", AdjustmentType::Add, 5),
    ];
    let result = orchestrator
        .adjust_inventory(&admin(), items, None)
        .await
        .unwrap();

    assert_eq!(result.total_success, 5);
    let procedures = mock.procedure_calls();
    assert_eq!(procedures.len(), 2);
    let mut warehouses: Vec<(String, usize)> = procedures
        .into_iter()
        .map(|procedure| match procedure {
            Procedure::BulkAdjustInventory {
                warehouse_id,
                lines,
            } => (warehouse_id, lines.len()),
            other => panic!("unexpected procedure {:?}", other),
        })
        .collect();
    warehouses.sort();
    assert_eq!(warehouses, vec![("w1".to_string(), 3), ("w2".to_string(), 2)]);
}

#[tokio::test]
async fn test_large_warehouse_groups_still_use_one_call_each() {
    let mock = MockStore::new();
    let orchestrator = BatchOrchestrator::new(mock.clone());

    let items: Vec<InventoryAdjustment> = (0..24)
        .map(|i| {
            let warehouse = if i % 2 == 0 { "w1" } else { "w2" };
            InventoryAdjustment::new(format!("p{}", i), warehouse, AdjustmentType::Add, 1)
                .with_reason("restock")
        })
        .collect();
    let result = orchestrator
        .adjust_inventory(&admin(), items, Some(1))
        .await
        .unwrap();

    assert_eq!(result.total_success, 24);
    let procedures = mock.procedure_calls();
    assert_eq!(procedures.len(), 2);
    for procedure in procedures {
        let Procedure::BulkAdjustInventory { lines, .. } = procedure else {
            panic!("expected bulk adjustment");
        };
        assert_eq!(lines.len(), 12);
        assert!(lines.iter().all(|line| line.reason.as_deref() == Some("restock")));
    }
}

#[tokio::test]
async fn test_adjustment_quantities_are_normalized() {
    let mock = MockStore::new();
    let orchestrator = BatchOrchestrator::new(mock.clone());

    orchestrator
        .adjust_inventory(
            &admin(),
            vec![
                InventoryAdjustment::new("p1", "w1", AdjustmentType::Remove, 5),
                InventoryAdjustment::new("p2", "w1", AdjustmentType::Add, 10),
                InventoryAdjustment::new("p3", "w1", AdjustmentType::Set, 15),
            ],
            None,
        )
        .await
        .unwrap();

    let procedures = mock.procedure_calls();
    let Procedure::BulkAdjustInventory { lines, .. } = &procedures[0] else {
        panic!("expected bulk adjustment");
    };
    let changes: Vec<QuantityChange> = lines.iter().map(|line| line.change).collect();
    assert_eq!(
        changes,
        vec![
            QuantityChange::Delta(-5),
            QuantityChange::Delta(10),
            QuantityChange::Absolute(15),
        ]
    );
}

#[tokio::test]
async fn test_adjustment_line_and_call_failures() {
    let mock = MockStore::new();
    mock.fail_line("p2", Some("Insufficient stock: available 0"));
    mock.fail_line("p3", None);
    mock.fail_warehouse("w9", StoreError::not_found("Warehouse w9 not found"));
    let orchestrator = BatchOrchestrator::new(mock.clone());

    let result = orchestrator
        .adjust_inventory(
            &admin(),
            vec![
                InventoryAdjustment::new("p1", "w1", AdjustmentType::Add, 1),
                InventoryAdjustment::new("p2", "w1", AdjustmentType::Remove, 1),
                InventoryAdjustment::new("p3", "w1", AdjustmentType::Add, 1),
                InventoryAdjustment::new("p4", "w9", AdjustmentType::Add, 1),
                InventoryAdjustment::new("p5", "w1", AdjustmentType::Add, -1),
            ],
            None,
        )
        .await
        .unwrap();

    assert_eq!(result.total_success, 1);
    assert_eq!(result.total_failed, 4);
    let error_for = |id: &str| {
        result
            .failed
            .iter()
            .find(|f| f.item.product_id == id)
            .map(|f| f.error.clone())
            .unwrap()
    };
    assert_eq!(error_for("p2"), "Insufficient stock: available 0");
    assert_eq!(error_for("p3"), OPERATION_FAILED);
    assert_eq!(error_for("p4"), "Warehouse w9 not found");
    assert!(error_for("p5").contains("must not be negative"));
}

#[tokio::test]
async fn test_import_skips_existing_skus() {
    let mock = MockStore::new();
    mock.with_existing_skus(["SKU-2"]);
    let orchestrator = BatchOrchestrator::new(mock.clone());

    let result = orchestrator
        .import_products(
            &admin(),
            vec![
                NewProduct::new("SKU-1", "One", 1.0),
                NewProduct::new("SKU-2", "Two", 2.0),
                NewProduct::new("SKU-3", "Three", 3.0),
            ],
            ImportOptions {
                skip_duplicates: true,
            },
            None,
        )
        .await
        .unwrap();

    assert_eq!(result.total_success, 2);
    assert_eq!(result.total_failed, 1);
    assert_eq!(result.failed[0].item.sku, "SKU-2");
    assert!(result.failed[0].error.contains("already exists"));

    let inserted: Vec<Vec<NewRecord>> = mock
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            StoreCall::Insert(records) => Some(records),
            _ => None,
        })
        .collect();
    assert_eq!(inserted.len(), 1);
    let skus: Vec<String> = inserted[0]
        .iter()
        .map(|NewRecord::Product(product)| product.sku.clone())
        .collect();
    assert_eq!(skus, vec!["SKU-1".to_string(), "SKU-3".to_string()]);
}

#[tokio::test]
async fn test_import_without_skip_fails_whole_chunk_on_duplicate() {
    let mock = MockStore::new();
    mock.with_existing_skus(["SKU-2"]);
    let orchestrator = BatchOrchestrator::new(mock.clone());

    let items: Vec<NewProduct> = (1..=4)
        .map(|i| NewProduct::new(format!("SKU-{}", i), format!("P{}", i), 1.0))
        .collect();
    let result = orchestrator
        .import_products(&admin(), items, ImportOptions::default(), Some(2))
        .await
        .unwrap();

    let ok: Vec<&str> = result.successful.iter().map(|p| p.sku.as_str()).collect();
    assert_eq!(ok, vec!["SKU-3", "SKU-4"]);
    assert_eq!(result.total_failed, 2);
    assert!(result
        .failed
        .iter()
        .all(|f| f.error == "Product with SKU 'SKU-2' already exists"));
}

#[tokio::test]
async fn test_import_flags_repeated_skus_within_input() {
    let mock = MockStore::new();
    let orchestrator = BatchOrchestrator::new(mock.clone());

    let result = orchestrator
        .import_products(
            &admin(),
            vec![
                NewProduct::new("SKU-1", "One", 1.0),
                NewProduct::new("SKU-1", "One again", 1.0),
                NewProduct::new("", "No SKU", 1.0),
            ],
            ImportOptions {
                skip_duplicates: true,
            },
            None,
        )
        .await
        .unwrap();

    assert_eq!(result.total_success, 1);
    assert_eq!(result.successful[0].name, "One");
    let errors: Vec<&str> = result.failed.iter().map(|f| f.error.as_str()).collect();
    assert!(errors.contains(&"SKU is required"));
    assert!(errors.iter().any(|e| e.contains("in this import")));
}

#[tokio::test]
async fn test_delete_pre_filter_blocks_dependents() {
    let mock = MockStore::new();
    mock.with_stocked_products(["p1"]);
    mock.with_movements(["p3"]);
    mock.fail_record("p4", StoreError::unknown("row locked"));
    let orchestrator = BatchOrchestrator::new(mock.clone());

    let ids: Vec<String> = ["p1", "p2", "p3", "p4"].iter().map(|s| s.to_string()).collect();
    let result = orchestrator
        .delete_products(&admin(), ids, None)
        .await
        .unwrap();

    assert_eq!(result.successful, vec!["p2".to_string()]);
    assert_eq!(result.total_failed, 3);
    let reason = |id: &str| {
        result
            .failed
            .iter()
            .find(|f| f.item == id)
            .map(|f| f.error.as_str())
            .unwrap()
    };
    assert_eq!(reason("p1"), DEPENDENCY_REASON);
    assert_eq!(reason("p3"), DEPENDENCY_REASON);
    assert_eq!(reason("p4"), "row locked");

    let deleted: Vec<String> = mock
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            StoreCall::Delete { ids, .. } => Some(ids),
            _ => None,
        })
        .flatten()
        .collect();
    assert!(!deleted.contains(&"p1".to_string()));
    assert!(!deleted.contains(&"p3".to_string()));
}

#[tokio::test]
async fn test_assign_category_patches_only_category() {
    let mock = MockStore::new();
    let orchestrator = BatchOrchestrator::new(mock.clone());

    let result = orchestrator
        .assign_category(&admin(), vec!["p1".into(), "".into()], "cat_tools", None)
        .await
        .unwrap();

    assert_eq!(result.total_success, 1);
    assert_eq!(result.failed[0].error, "Product id is required");
    match &mock.calls()[0] {
        StoreCall::Update { id, patch } => {
            assert_eq!(id, "p1");
            assert_eq!(patch.kind(), inventory_batch::store::RecordKind::Product);
            let inventory_batch::store::RecordPatch::Product(patch) = patch;
            assert_eq!(patch.category_id.as_deref(), Some("cat_tools"));
            assert!(patch.name.is_none());
        }
        other => panic!("unexpected call {:?}", other),
    }
}
