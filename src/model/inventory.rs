//! Inventory work items: adjustments and transfers between warehouses.

use serde::{Deserialize, Serialize};

/// How an adjustment's quantity is applied to the current stock level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentType {
    /// Increase stock by the quantity.
    Add,
    /// Decrease stock by the quantity.
    Remove,
    /// Replace the stock level with the quantity.
    Set,
}

/// A normalized quantity change, as sent to the store.
///
/// `Set` adjustments stay absolute so the store never has to guess whether a
/// number is a delta or a target level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "quantity", rename_all = "lowercase")]
pub enum QuantityChange {
    Delta(i64),
    Absolute(i64),
}

impl QuantityChange {
    /// Applies the change to `current` and returns the resulting level,
    /// or `None` if the level would overflow.
    pub fn apply(self, current: i64) -> Option<i64> {
        match self {
            QuantityChange::Delta(delta) => current.checked_add(delta),
            QuantityChange::Absolute(level) => Some(level),
        }
    }
}

/// A single stock adjustment for one product in one warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryAdjustment {
    pub product_id: String,
    pub warehouse_id: String,
    pub adjustment_type: AdjustmentType,
    pub quantity: i64,
    pub reason: Option<String>,
}

impl InventoryAdjustment {
    pub fn new(
        product_id: impl Into<String>,
        warehouse_id: impl Into<String>,
        adjustment_type: AdjustmentType,
        quantity: i64,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            warehouse_id: warehouse_id.into(),
            adjustment_type,
            quantity,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Converts the user-facing type and quantity into the change the store applies.
    ///
    /// # Examples
    /// - `Remove` 5 becomes `Delta(-5)`
    /// - `Add` 10 becomes `Delta(10)`
    /// - `Set` 15 becomes `Absolute(15)`
    ///
    /// Expects a validated quantity; a `Remove` of `i64::MIN` saturates.
    pub fn normalized(&self) -> QuantityChange {
        match self.adjustment_type {
            AdjustmentType::Add => QuantityChange::Delta(self.quantity),
            AdjustmentType::Remove => QuantityChange::Delta(self.quantity.saturating_neg()),
            AdjustmentType::Set => QuantityChange::Absolute(self.quantity),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.product_id.trim().is_empty() {
            return Err("Product id is required".to_string());
        }
        if self.warehouse_id.trim().is_empty() {
            return Err("Warehouse id is required".to_string());
        }
        if self.quantity < 0 {
            return Err(format!("Quantity must not be negative: {}", self.quantity));
        }
        if self.quantity == 0 && self.adjustment_type != AdjustmentType::Set {
            return Err("Quantity must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Moves stock of one product between two warehouses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockTransfer {
    pub product_id: String,
    pub from_warehouse_id: String,
    pub to_warehouse_id: String,
    pub quantity: i64,
    pub notes: Option<String>,
}

impl StockTransfer {
    pub fn new(
        product_id: impl Into<String>,
        from_warehouse_id: impl Into<String>,
        to_warehouse_id: impl Into<String>,
        quantity: i64,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            from_warehouse_id: from_warehouse_id.into(),
            to_warehouse_id: to_warehouse_id.into(),
            quantity,
            notes: None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.product_id.trim().is_empty() {
            return Err("Product id is required".to_string());
        }
        if self.quantity <= 0 {
            return Err(format!("Transfer quantity must be positive: {}", self.quantity));
        }
        if self.from_warehouse_id == self.to_warehouse_id {
            return Err("Source and destination warehouses must differ".to_string());
        }
        Ok(())
    }
}
