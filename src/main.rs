use inventory_batch::batch::BatchConfig;
use inventory_batch::lifecycle::{setup_tracing, InventorySystem};
use inventory_batch::model::{
    AdjustmentType, BatchContext, ImportOptions, InventoryAdjustment, NewProduct, Role,
    StockTransfer,
};
use tracing::{info, warn, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let system = InventorySystem::new(BatchConfig::from_env());
    let ctx = BatchContext::new("org_demo", "user_1", Role::Admin);

    for warehouse_id in ["main", "overflow"] {
        system
            .store_client
            .register_warehouse(&ctx.tenant, warehouse_id)
            .await
            .map_err(|e| e.to_string())?;
    }

    let imported = async {
        system
            .orchestrator
            .import_products(
                &ctx,
                vec![
                    NewProduct::new("WID-001", "Widget", 4.5),
                    NewProduct::new("GAD-001", "Gadget", 12.0),
                    NewProduct::new("WID-001", "Widget (again)", 4.5),
                ],
                ImportOptions {
                    skip_duplicates: true,
                },
                None,
            )
            .await
            .map_err(|e| e.to_string())
    }
    .instrument(tracing::info_span!("import"))
    .await?;
    for failed in &imported.failed {
        warn!(sku = %failed.item.sku, error = %failed.error, "Import skipped");
    }

    // Ids are sequential in the in-memory store
    let widget = "product_1";
    let gadget = "product_2";

    let adjusted = system
        .orchestrator
        .adjust_inventory(
            &ctx,
            vec![
                InventoryAdjustment::new(widget, "main", AdjustmentType::Add, 40),
                InventoryAdjustment::new(gadget, "main", AdjustmentType::Set, 15),
                InventoryAdjustment::new(widget, "overflow", AdjustmentType::Add, 5),
                InventoryAdjustment::new(gadget, "overflow", AdjustmentType::Remove, 3),
            ],
            None,
        )
        .await
        .map_err(|e| e.to_string())?;
    info!(
        success = adjusted.total_success,
        failed = adjusted.total_failed,
        "Adjustments applied"
    );

    let transferred = system
        .orchestrator
        .transfer_stock(
            &ctx,
            vec![
                StockTransfer::new(widget, "main", "overflow", 10),
                StockTransfer::new(gadget, "main", "overflow", 100),
            ],
            None,
        )
        .await
        .map_err(|e| e.to_string())?;
    for failed in &transferred.failed {
        warn!(product_id = %failed.item.product_id, error = %failed.error, "Transfer failed");
    }

    let level = system
        .store_client
        .stock_level(&ctx.tenant, widget, "overflow")
        .await
        .map_err(|e| e.to_string())?;
    info!(product_id = widget, warehouse_id = "overflow", level, "Final stock");

    let viewer = BatchContext::new("org_demo", "user_2", Role::Viewer);
    if let Err(e) = system
        .orchestrator
        .delete_products(&viewer, vec![widget.to_string()], None)
        .await
    {
        warn!(error = %e, "Delete rejected");
    }

    system.shutdown().await?;
    Ok(())
}
