//! Per-tenant state owned by the [`StoreActor`](super::StoreActor).
//!
//! Everything here runs inside the actor task, one request at a time, so multi-step
//! procedures like `transfer_stock` are atomic without locks.

use super::{
    AdjustmentLine, LineStatus, Lookup, NewRecord, Procedure, ProcedureOutput, RecordKind,
    RecordPatch, StoreError, StoreResult,
};
use crate::model::{NewProduct, ProductPatch, StockTransfer};
use std::collections::{HashMap, HashSet};

/// A product row as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub price: f64,
    pub category_id: Option<String>,
    pub is_active: bool,
    pub reorder_point: i64,
}

/// One signed change to a stock level, recorded by adjustments and transfers.
#[derive(Debug, Clone, PartialEq)]
pub struct StockMovement {
    pub product_id: String,
    pub warehouse_id: String,
    pub quantity: i64,
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct TenantTables {
    products: HashMap<String, ProductRecord>,
    warehouses: HashSet<String>,
    stock: HashMap<(String, String), i64>,
    movements: Vec<StockMovement>,
}

impl TenantTables {
    pub(crate) fn register_warehouse(&mut self, warehouse_id: String) {
        self.warehouses.insert(warehouse_id);
    }

    pub(crate) fn product(&self, id: &str) -> Option<ProductRecord> {
        self.products.get(id).cloned()
    }

    pub(crate) fn stock_level(&self, product_id: &str, warehouse_id: &str) -> i64 {
        self.stock
            .get(&(product_id.to_string(), warehouse_id.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn movements(&self) -> Vec<StockMovement> {
        self.movements.clone()
    }

    pub(crate) fn update(&mut self, id: &str, patch: RecordPatch) -> StoreResult<()> {
        match patch {
            RecordPatch::Product(patch) => self.update_product(id, patch),
        }
    }

    fn update_product(&mut self, id: &str, patch: ProductPatch) -> StoreResult<()> {
        if let Some(sku) = &patch.sku {
            if self.products.values().any(|p| p.id != id && &p.sku == sku) {
                return Err(StoreError::duplicate_key(format!(
                    "Product with SKU '{}' already exists",
                    sku
                )));
            }
        }
        let product = self
            .products
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(format!("Product {} not found", id)))?;

        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(sku) = patch.sku {
            product.sku = sku;
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(category_id) = patch.category_id {
            product.category_id = Some(category_id);
        }
        if let Some(is_active) = patch.is_active {
            product.is_active = is_active;
        }
        if let Some(reorder_point) = patch.reorder_point {
            product.reorder_point = reorder_point;
        }
        Ok(())
    }

    pub(crate) fn query(&self, lookup: Lookup) -> Vec<String> {
        match lookup {
            Lookup::ProductSkus(skus) => skus
                .into_iter()
                .filter(|sku| self.products.values().any(|p| &p.sku == sku))
                .collect(),
            Lookup::StockedProducts(ids) => ids
                .into_iter()
                .filter(|id| {
                    self.stock
                        .iter()
                        .any(|((product_id, _), level)| product_id == id && *level != 0)
                })
                .collect(),
            Lookup::ProductsWithMovements(ids) => ids
                .into_iter()
                .filter(|id| self.movements.iter().any(|m| &m.product_id == id))
                .collect(),
        }
    }

    /// Inserts every record or none: SKUs are checked against the table and each other first.
    pub(crate) fn insert(
        &mut self,
        records: Vec<NewRecord>,
        mut next_id: impl FnMut() -> String,
    ) -> StoreResult<Vec<String>> {
        let mut seen = HashSet::new();
        for NewRecord::Product(product) in &records {
            let taken = self.products.values().any(|p| p.sku == product.sku);
            if taken || !seen.insert(product.sku.as_str()) {
                return Err(StoreError::duplicate_key(format!(
                    "Product with SKU '{}' already exists",
                    product.sku
                )));
            }
        }

        let mut ids = Vec::with_capacity(records.len());
        for NewRecord::Product(product) in records {
            let id = next_id();
            self.products.insert(id.clone(), Self::product_row(id.clone(), product));
            ids.push(id);
        }
        Ok(ids)
    }

    fn product_row(id: String, product: NewProduct) -> ProductRecord {
        ProductRecord {
            id,
            sku: product.sku,
            name: product.name,
            price: product.price,
            category_id: product.category_id,
            is_active: true,
            reorder_point: product.reorder_point.unwrap_or(0),
        }
    }

    /// Deletes every id or none. Stock rows for deleted products go with them.
    pub(crate) fn delete(&mut self, kind: RecordKind, ids: Vec<String>) -> StoreResult<()> {
        match kind {
            RecordKind::Product => {
                if let Some(missing) = ids.iter().find(|id| !self.products.contains_key(*id)) {
                    return Err(StoreError::not_found(format!("Product {} not found", missing)));
                }
                if let Some(referenced) = ids
                    .iter()
                    .find(|id| self.movements.iter().any(|m| &m.product_id == *id))
                {
                    return Err(StoreError::new(
                        super::StoreErrorKind::DependencyExists,
                        format!("Product {} is referenced by stock movements", referenced),
                    ));
                }
                for id in &ids {
                    self.products.remove(id);
                    self.stock.retain(|(product_id, _), _| product_id != id);
                }
                Ok(())
            }
        }
    }

    pub(crate) fn call(&mut self, procedure: Procedure) -> StoreResult<ProcedureOutput> {
        match procedure {
            Procedure::BulkAdjustInventory {
                warehouse_id,
                lines,
            } => self.bulk_adjust(&warehouse_id, lines),
            Procedure::TransferStock(transfer) => self.transfer(transfer),
        }
    }

    fn bulk_adjust(
        &mut self,
        warehouse_id: &str,
        lines: Vec<AdjustmentLine>,
    ) -> StoreResult<ProcedureOutput> {
        if !self.warehouses.contains(warehouse_id) {
            return Err(StoreError::not_found(format!(
                "Warehouse {} not found",
                warehouse_id
            )));
        }

        let statuses = lines
            .into_iter()
            .map(|line| {
                if !self.products.contains_key(&line.product_id) {
                    return LineStatus::failed(&line.product_id, "Product not found");
                }
                let key = (line.product_id.clone(), warehouse_id.to_string());
                let current = self.stock.get(&key).copied().unwrap_or(0);
                let Some(next) = line.change.apply(current) else {
                    return LineStatus::failed(&line.product_id, "Quantity out of range");
                };
                if next < 0 {
                    return LineStatus::failed(
                        &line.product_id,
                        format!("Insufficient stock: available {}", current),
                    );
                }
                self.stock.insert(key, next);
                self.movements.push(StockMovement {
                    product_id: line.product_id.clone(),
                    warehouse_id: warehouse_id.to_string(),
                    quantity: next - current,
                    reason: line.reason,
                });
                LineStatus::ok(line.product_id)
            })
            .collect();

        Ok(ProcedureOutput::LineStatuses(statuses))
    }

    fn transfer(&mut self, transfer: StockTransfer) -> StoreResult<ProcedureOutput> {
        if !self.products.contains_key(&transfer.product_id) {
            return Err(StoreError::not_found(format!(
                "Product {} not found",
                transfer.product_id
            )));
        }
        for warehouse_id in [&transfer.from_warehouse_id, &transfer.to_warehouse_id] {
            if !self.warehouses.contains(warehouse_id) {
                return Err(StoreError::not_found(format!(
                    "Warehouse {} not found",
                    warehouse_id
                )));
            }
        }
        if transfer.quantity <= 0 {
            return Err(StoreError::constraint("Transfer quantity must be positive"));
        }

        let from_key = (transfer.product_id.clone(), transfer.from_warehouse_id.clone());
        let to_key = (transfer.product_id.clone(), transfer.to_warehouse_id.clone());
        let available = self.stock.get(&from_key).copied().unwrap_or(0);
        if available < transfer.quantity {
            return Err(StoreError::insufficient_stock(format!(
                "Insufficient stock: requested {}, available {}",
                transfer.quantity, available
            )));
        }

        let from_quantity = available - transfer.quantity;
        let to_quantity = self
            .stock
            .get(&to_key)
            .copied()
            .unwrap_or(0)
            .checked_add(transfer.quantity)
            .ok_or_else(|| StoreError::constraint("Quantity out of range"))?;
        self.stock.insert(from_key, from_quantity);
        self.stock.insert(to_key, to_quantity);
        self.movements.push(StockMovement {
            product_id: transfer.product_id.clone(),
            warehouse_id: transfer.from_warehouse_id,
            quantity: -transfer.quantity,
            reason: transfer.notes.clone(),
        });
        self.movements.push(StockMovement {
            product_id: transfer.product_id,
            warehouse_id: transfer.to_warehouse_id,
            quantity: transfer.quantity,
            reason: transfer.notes,
        });

        Ok(ProcedureOutput::Transferred {
            from_quantity,
            to_quantity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuantityChange;
    use crate::store::StoreErrorKind;

    fn tables_with_product() -> (TenantTables, String) {
        let mut tables = TenantTables::default();
        tables.register_warehouse("w1".into());
        tables.register_warehouse("w2".into());
        let ids = tables
            .insert(
                vec![NewRecord::Product(NewProduct::new("SKU-1", "Widget", 2.5))],
                || "product_1".to_string(),
            )
            .unwrap();
        (tables, ids[0].clone())
    }

    #[test]
    fn insert_rejects_whole_call_on_duplicate_sku() {
        let (mut tables, _) = tables_with_product();
        let mut n = 1;
        let result = tables.insert(
            vec![
                NewRecord::Product(NewProduct::new("SKU-2", "Gadget", 1.0)),
                NewRecord::Product(NewProduct::new("SKU-1", "Widget again", 1.0)),
            ],
            || {
                n += 1;
                format!("product_{}", n)
            },
        );

        assert_eq!(result.unwrap_err().kind, StoreErrorKind::DuplicateKey);
        assert!(tables.query(Lookup::ProductSkus(vec!["SKU-2".into()])).is_empty());
    }

    #[test]
    fn bulk_adjust_reports_per_line_status() {
        let (mut tables, id) = tables_with_product();
        let output = tables
            .call(Procedure::BulkAdjustInventory {
                warehouse_id: "w1".into(),
                lines: vec![
                    AdjustmentLine {
                        product_id: id.clone(),
                        change: QuantityChange::Delta(10),
                        reason: None,
                    },
                    AdjustmentLine {
                        product_id: "missing".into(),
                        change: QuantityChange::Delta(1),
                        reason: None,
                    },
                    AdjustmentLine {
                        product_id: id.clone(),
                        change: QuantityChange::Delta(-20),
                        reason: None,
                    },
                ],
            })
            .unwrap();

        let ProcedureOutput::LineStatuses(statuses) = output else {
            panic!("expected line statuses");
        };
        assert!(statuses[0].success);
        assert_eq!(statuses[1].error.as_deref(), Some("Product not found"));
        assert!(!statuses[2].success);
        assert_eq!(tables.stock_level(&id, "w1"), 10);
    }

    #[test]
    fn transfer_is_all_or_nothing() {
        let (mut tables, id) = tables_with_product();
        tables
            .call(Procedure::BulkAdjustInventory {
                warehouse_id: "w1".into(),
                lines: vec![AdjustmentLine {
                    product_id: id.clone(),
                    change: QuantityChange::Absolute(4),
                    reason: None,
                }],
            })
            .unwrap();

        let err = tables
            .call(Procedure::TransferStock(StockTransfer::new(&id, "w1", "w2", 5)))
            .unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::InsufficientStock);
        assert_eq!(tables.stock_level(&id, "w1"), 4);
        assert_eq!(tables.stock_level(&id, "w2"), 0);

        tables
            .call(Procedure::TransferStock(StockTransfer::new(&id, "w1", "w2", 3)))
            .unwrap();
        assert_eq!(tables.stock_level(&id, "w1"), 1);
        assert_eq!(tables.stock_level(&id, "w2"), 3);
        assert_eq!(tables.movements().len(), 3);
    }

    #[test]
    fn bulk_adjust_overflow_fails_only_its_line() {
        let (mut tables, id) = tables_with_product();
        let output = tables
            .call(Procedure::BulkAdjustInventory {
                warehouse_id: "w1".into(),
                lines: vec![
                    AdjustmentLine {
                        product_id: id.clone(),
                        change: QuantityChange::Delta(1),
                        reason: None,
                    },
                    AdjustmentLine {
                        product_id: id.clone(),
                        change: QuantityChange::Delta(i64::MAX),
                        reason: None,
                    },
                ],
            })
            .unwrap();

        let ProcedureOutput::LineStatuses(statuses) = output else {
            panic!("expected line statuses");
        };
        assert!(statuses[0].success);
        assert_eq!(statuses[1].error.as_deref(), Some("Quantity out of range"));
        assert_eq!(tables.stock_level(&id, "w1"), 1);
        assert_eq!(tables.movements().len(), 1);
    }

    #[test]
    fn transfer_overflow_is_rejected_atomically() {
        let (mut tables, id) = tables_with_product();
        tables
            .call(Procedure::BulkAdjustInventory {
                warehouse_id: "w1".into(),
                lines: vec![AdjustmentLine {
                    product_id: id.clone(),
                    change: QuantityChange::Absolute(i64::MAX),
                    reason: None,
                }],
            })
            .unwrap();
        tables
            .call(Procedure::BulkAdjustInventory {
                warehouse_id: "w2".into(),
                lines: vec![AdjustmentLine {
                    product_id: id.clone(),
                    change: QuantityChange::Absolute(1),
                    reason: None,
                }],
            })
            .unwrap();

        let err = tables
            .call(Procedure::TransferStock(StockTransfer::new(
                &id,
                "w1",
                "w2",
                i64::MAX,
            )))
            .unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::Constraint);
        assert_eq!(tables.stock_level(&id, "w1"), i64::MAX);
        assert_eq!(tables.stock_level(&id, "w2"), 1);
        assert_eq!(tables.movements().len(), 2);
    }

    #[test]
    fn delete_refuses_products_with_movements() {
        let (mut tables, id) = tables_with_product();
        tables
            .call(Procedure::BulkAdjustInventory {
                warehouse_id: "w1".into(),
                lines: vec![AdjustmentLine {
                    product_id: id.clone(),
                    change: QuantityChange::Delta(1),
                    reason: None,
                }],
            })
            .unwrap();

        let err = tables.delete(RecordKind::Product, vec![id.clone()]).unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::DependencyExists);
        assert!(tables.product(&id).is_some());
    }
}
