use serde::{Deserialize, Serialize};

/// A change to one product's fields, addressed by product id.
///
/// # Batch Processing
/// Handled by [`BatchOrchestrator::update_products`](crate::batch::BatchOrchestrator::update_products),
/// which dispatches one `update_record` call per item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub product_id: String,
    pub changes: ProductPatch,
}

impl ProductUpdate {
    pub fn new(product_id: impl Into<String>, changes: ProductPatch) -> Self {
        Self {
            product_id: product_id.into(),
            changes,
        }
    }
}

/// Partial product fields. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub price: Option<f64>,
    pub category_id: Option<String>,
    pub is_active: Option<bool>,
    pub reorder_point: Option<i64>,
}

impl ProductPatch {
    /// Returns true when no field would change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.sku.is_none()
            && self.price.is_none()
            && self.category_id.is_none()
            && self.is_active.is_none()
            && self.reorder_point.is_none()
    }

    /// Checks the patch for values the store would reject anyway.
    pub fn validate(&self) -> Result<(), String> {
        if self.is_empty() {
            return Err("No fields to update".to_string());
        }
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err("Name must not be empty".to_string());
            }
        }
        if let Some(sku) = &self.sku {
            if sku.trim().is_empty() {
                return Err("SKU must not be empty".to_string());
            }
        }
        if let Some(price) = self.price {
            if !price.is_finite() || price < 0.0 {
                return Err(format!("Invalid price: {}", price));
            }
        }
        if let Some(reorder_point) = self.reorder_point {
            if reorder_point < 0 {
                return Err(format!("Invalid reorder point: {}", reorder_point));
            }
        }
        Ok(())
    }
}

/// Payload for importing a new product. The SKU is the natural key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub price: f64,
    pub category_id: Option<String>,
    pub reorder_point: Option<i64>,
}

impl NewProduct {
    /// Creates an import payload with no category and no reorder point.
    ///
    /// # Arguments
    /// * `sku` - Natural key, unique per organization
    /// * `name` - Display name
    /// * `price` - Unit price
    pub fn new(sku: impl Into<String>, name: impl Into<String>, price: f64) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            price,
            category_id: None,
            reorder_point: None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sku.trim().is_empty() {
            return Err("SKU is required".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("Name is required".to_string());
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(format!("Invalid price: {}", self.price));
        }
        Ok(())
    }
}

/// Flags for product imports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// Check SKUs against the store before inserting and fail matches up front.
    pub skip_duplicates: bool,
}
