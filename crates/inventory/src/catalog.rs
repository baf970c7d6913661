//! Catalog data the reconciliation engine reads: warehouses and the products
//! stocked in them, with their classification thresholds.

use serde::{Deserialize, Serialize};

use stockrec_core::{DomainError, DomainResult, ProductId, WarehouseId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
}

impl Warehouse {
    pub fn new(id: WarehouseId, name: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("warehouse name cannot be empty"));
        }
        Ok(Self { id, name })
    }
}

/// A product stocked in a warehouse, with its min/max thresholds.
///
/// Thresholds are configuration: the engine reads them for classification and
/// never mutates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockedProduct {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    pub unit: String,
    pub min_stock: i64,
    pub max_stock: i64,
}

impl StockedProduct {
    pub fn new(
        product_id: ProductId,
        name: impl Into<String>,
        sku: impl Into<String>,
        unit: impl Into<String>,
        min_stock: i64,
        max_stock: i64,
    ) -> DomainResult<Self> {
        let name = name.into();
        let sku = sku.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if sku.trim().is_empty() {
            return Err(DomainError::validation("sku cannot be empty"));
        }
        if min_stock < 0 {
            return Err(DomainError::validation("min_stock cannot be negative"));
        }
        if min_stock > max_stock {
            return Err(DomainError::validation(format!(
                "min_stock ({min_stock}) cannot exceed max_stock ({max_stock})"
            )));
        }
        Ok(Self {
            product_id,
            name,
            sku,
            unit: unit.into(),
            min_stock,
            max_stock,
        })
    }
}
