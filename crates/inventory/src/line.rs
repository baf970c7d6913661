//! Inventory line: one row per (warehouse, product, accounting period).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockrec_core::{DomainError, ProductId, WarehouseId};

use crate::catalog::StockedProduct;

/// Largest quantity a physical count or a single movement may carry, and the
/// largest magnitude on-hand stock may reach.
pub const MAX_QUANTITY: i64 = 1_000_000_000_000;

/// Stock status derived from a reference quantity and the min/max thresholds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Stockout,
    Understocked,
    Normal,
    Overstocked,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Stockout => "stockout",
            StockStatus::Understocked => "understocked",
            StockStatus::Normal => "normal",
            StockStatus::Overstocked => "overstocked",
        }
    }
}

impl core::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn saturate(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

/// Classify a reference quantity against `[min_stock, max_stock]`.
///
/// `reference <= 0` is always a stockout, including negative theoretical stock.
pub fn classify(reference: i64, min_stock: i64, max_stock: i64) -> StockStatus {
    if reference <= 0 {
        StockStatus::Stockout
    } else if reference < min_stock {
        StockStatus::Understocked
    } else if reference <= max_stock {
        StockStatus::Normal
    } else {
        StockStatus::Overstocked
    }
}

/// Immutable ledger counters for one stream over an accounting period.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodCounters {
    pub stock_initial: i64,
    pub entries: i64,
    pub exits: i64,
}

impl PeriodCounters {
    pub fn new(stock_initial: i64, entries: i64, exits: i64) -> Self {
        Self {
            stock_initial,
            entries,
            exits,
        }
    }

    /// `stock_initial + entries - exits`, unclamped. Results outside the
    /// `i64` range saturate.
    pub fn sdu_theoretical(&self) -> i64 {
        saturate(
            i128::from(self.stock_initial) + i128::from(self.entries) - i128::from(self.exits),
        )
    }
}

/// Computed inventory view for one product in one warehouse.
///
/// Theoretical stock, variance and status are methods rather than fields, so
/// they are always derived from the current inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLine {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub name: String,
    pub sku: String,
    pub unit: String,
    pub stock_initial: i64,
    pub entries: i64,
    pub exits: i64,
    pub physical_count: Option<i64>,
    pub min_stock: i64,
    pub max_stock: i64,
    pub cmm: Decimal,
    pub cmp: Decimal,
}

impl InventoryLine {
    pub fn new(
        warehouse_id: WarehouseId,
        product: &StockedProduct,
        counters: PeriodCounters,
        cmm: Decimal,
        cmp: Decimal,
    ) -> Self {
        Self {
            product_id: product.product_id,
            warehouse_id,
            name: product.name.clone(),
            sku: product.sku.clone(),
            unit: product.unit.clone(),
            stock_initial: counters.stock_initial,
            entries: counters.entries,
            exits: counters.exits,
            physical_count: None,
            min_stock: product.min_stock,
            max_stock: product.max_stock,
            cmm,
            cmp,
        }
    }

    /// Attach (or clear) a provisional physical count.
    pub fn with_physical_count(mut self, physical_count: Option<i64>) -> Self {
        self.physical_count = physical_count;
        self
    }

    pub fn counters(&self) -> PeriodCounters {
        PeriodCounters::new(self.stock_initial, self.entries, self.exits)
    }

    pub fn sdu_theoretical(&self) -> i64 {
        self.counters().sdu_theoretical()
    }

    /// `physical_count - sdu_theoretical`, defined only when a count is present.
    /// Saturates like `sdu_theoretical`; see `checked_variance`.
    pub fn variance(&self) -> Option<i64> {
        let sdu = i128::from(self.sdu_theoretical());
        self.physical_count.map(|count| saturate(i128::from(count) - sdu))
    }

    /// Exact variance, or `Err` when theoretical stock or the variance does
    /// not fit in an `i64`. `Ok(None)` when no count is attached.
    pub fn checked_variance(&self) -> Result<Option<i64>, DomainError> {
        let Some(count) = self.physical_count else {
            return Ok(None);
        };
        self.stock_initial
            .checked_add(self.entries)
            .and_then(|v| v.checked_sub(self.exits))
            .and_then(|sdu| count.checked_sub(sdu))
            .map(Some)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "variance for product {} is out of range",
                    self.product_id
                ))
            })
    }

    /// Variance relative to theoretical stock, in percent (0 when theoretical
    /// stock is not positive or no count was taken).
    pub fn variance_percentage(&self) -> Decimal {
        let sdu = self.sdu_theoretical();
        match self.variance() {
            Some(variance) if sdu > 0 => {
                Decimal::from(variance) * Decimal::ONE_HUNDRED / Decimal::from(sdu)
            }
            _ => Decimal::ZERO,
        }
    }

    /// Absolute variance valued at the weighted-average cost.
    pub fn variance_value(&self) -> Decimal {
        self.variance()
            .map(|v| Decimal::from(v.unsigned_abs()).saturating_mul(self.cmp))
            .unwrap_or(Decimal::ZERO)
    }

    /// Quantity used for classification: the physical count when present,
    /// otherwise theoretical stock.
    pub fn reference_quantity(&self) -> i64 {
        self.physical_count.unwrap_or_else(|| self.sdu_theoretical())
    }

    pub fn status(&self) -> StockStatus {
        classify(self.reference_quantity(), self.min_stock, self.max_stock)
    }
}
