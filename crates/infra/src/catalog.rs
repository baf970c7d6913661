//! Warehouse and stocked-product catalog.
//!
//! The catalog is configuration owned outside reconciliation: the engine reads
//! thresholds and descriptive data from it and never mutates a product.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use stockrec_core::WarehouseId;
use stockrec_inventory::{StockedProduct, Warehouse};

use crate::error::CatalogError;

#[async_trait]
pub trait StockCatalog: Send + Sync {
    async fn register_warehouse(&self, warehouse: Warehouse) -> Result<(), CatalogError>;

    async fn register_product(
        &self,
        warehouse_id: WarehouseId,
        product: StockedProduct,
    ) -> Result<(), CatalogError>;

    async fn find_warehouse(
        &self,
        warehouse_id: WarehouseId,
    ) -> Result<Option<Warehouse>, CatalogError>;

    /// Products stocked in a warehouse, in registration order.
    async fn stocked_products(
        &self,
        warehouse_id: WarehouseId,
    ) -> Result<Vec<StockedProduct>, CatalogError>;
}

#[async_trait]
impl<C> StockCatalog for Arc<C>
where
    C: StockCatalog + ?Sized,
{
    async fn register_warehouse(&self, warehouse: Warehouse) -> Result<(), CatalogError> {
        (**self).register_warehouse(warehouse).await
    }

    async fn register_product(
        &self,
        warehouse_id: WarehouseId,
        product: StockedProduct,
    ) -> Result<(), CatalogError> {
        (**self).register_product(warehouse_id, product).await
    }

    async fn find_warehouse(
        &self,
        warehouse_id: WarehouseId,
    ) -> Result<Option<Warehouse>, CatalogError> {
        (**self).find_warehouse(warehouse_id).await
    }

    async fn stocked_products(
        &self,
        warehouse_id: WarehouseId,
    ) -> Result<Vec<StockedProduct>, CatalogError> {
        (**self).stocked_products(warehouse_id).await
    }
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    warehouse: Warehouse,
    products: Vec<StockedProduct>,
}

/// In-memory catalog (tests/dev).
#[derive(Debug, Default)]
pub struct InMemoryStockCatalog {
    entries: RwLock<HashMap<WarehouseId, CatalogEntry>>,
}

impl InMemoryStockCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StockCatalog for InMemoryStockCatalog {
    async fn register_warehouse(&self, warehouse: Warehouse) -> Result<(), CatalogError> {
        let mut entries = self.entries.write().map_err(|_| CatalogError::LockPoisoned)?;
        if entries.contains_key(&warehouse.id) {
            return Err(CatalogError::Duplicate(format!("warehouse {}", warehouse.id)));
        }
        entries.insert(
            warehouse.id,
            CatalogEntry {
                warehouse,
                products: Vec::new(),
            },
        );
        Ok(())
    }

    async fn register_product(
        &self,
        warehouse_id: WarehouseId,
        product: StockedProduct,
    ) -> Result<(), CatalogError> {
        let mut entries = self.entries.write().map_err(|_| CatalogError::LockPoisoned)?;
        let entry = entries
            .get_mut(&warehouse_id)
            .ok_or(CatalogError::UnknownWarehouse(warehouse_id))?;

        if entry
            .products
            .iter()
            .any(|p| p.product_id == product.product_id || p.sku == product.sku)
        {
            return Err(CatalogError::Duplicate(format!(
                "product {} (sku {}) in warehouse {warehouse_id}",
                product.product_id, product.sku
            )));
        }
        entry.products.push(product);
        Ok(())
    }

    async fn find_warehouse(
        &self,
        warehouse_id: WarehouseId,
    ) -> Result<Option<Warehouse>, CatalogError> {
        let entries = self.entries.read().map_err(|_| CatalogError::LockPoisoned)?;
        Ok(entries.get(&warehouse_id).map(|e| e.warehouse.clone()))
    }

    async fn stocked_products(
        &self,
        warehouse_id: WarehouseId,
    ) -> Result<Vec<StockedProduct>, CatalogError> {
        let entries = self.entries.read().map_err(|_| CatalogError::LockPoisoned)?;
        entries
            .get(&warehouse_id)
            .map(|e| e.products.clone())
            .ok_or(CatalogError::UnknownWarehouse(warehouse_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockrec_core::ProductId;

    fn product(sku: &str) -> StockedProduct {
        StockedProduct::new(ProductId::new(), "Sugar 1kg", sku, "bag", 5, 40).unwrap()
    }

    #[tokio::test]
    async fn products_are_registered_per_warehouse() {
        let catalog = InMemoryStockCatalog::new();
        let warehouse = Warehouse::new(WarehouseId::new(), "Main depot").unwrap();
        let other = Warehouse::new(WarehouseId::new(), "Annex").unwrap();
        catalog.register_warehouse(warehouse.clone()).await.unwrap();
        catalog.register_warehouse(other.clone()).await.unwrap();

        catalog.register_product(warehouse.id, product("SUG-1")).await.unwrap();

        assert_eq!(catalog.stocked_products(warehouse.id).await.unwrap().len(), 1);
        assert!(catalog.stocked_products(other.id).await.unwrap().is_empty());
        assert_eq!(
            catalog.find_warehouse(warehouse.id).await.unwrap(),
            Some(warehouse)
        );
    }

    #[tokio::test]
    async fn duplicates_and_unknown_warehouses_are_rejected() {
        let catalog = InMemoryStockCatalog::new();
        let warehouse = Warehouse::new(WarehouseId::new(), "Main depot").unwrap();
        catalog.register_warehouse(warehouse.clone()).await.unwrap();

        assert!(matches!(
            catalog.register_warehouse(warehouse.clone()).await,
            Err(CatalogError::Duplicate(_))
        ));

        catalog.register_product(warehouse.id, product("SUG-1")).await.unwrap();
        assert!(matches!(
            catalog.register_product(warehouse.id, product("SUG-1")).await,
            Err(CatalogError::Duplicate(_))
        ));

        let missing = WarehouseId::new();
        assert!(matches!(
            catalog.register_product(missing, product("SUG-2")).await,
            Err(CatalogError::UnknownWarehouse(id)) if id == missing
        ));
        assert!(catalog.find_warehouse(missing).await.unwrap().is_none());
    }
}
