//! Inventory reconciliation domain module.
//!
//! This crate contains the business rules for theoretical stock, physical-count
//! variance, stock-status classification, consumption (CMM) and weighted-average
//! valuation (CMP), implemented purely as deterministic domain logic (no IO, no
//! HTTP, no storage).

pub mod catalog;
pub mod consumption;
pub mod line;
pub mod period;
pub mod position;
pub mod reconciliation;

pub use catalog::{StockedProduct, Warehouse};
pub use consumption::mean_consumption;
pub use line::{InventoryLine, MAX_QUANTITY, PeriodCounters, StockStatus, classify};
pub use period::{AccountingPeriod, DEFAULT_LOOKBACK, DateRange, Granularity, PeriodWindow};
pub use position::{
    AdjustStock, IssueStock, ReceiveStock, StockAdjusted, StockCommand, StockIssued,
    StockMovementEvent, StockPosition, StockPositionId, StockReceived, weighted_average,
};
pub use reconciliation::{
    CountRejection, CountSummary, PHYSICAL_COUNT_REASON, PhysicalCount, StatusBreakdown,
    StockAdjustmentTransaction, VarianceDetail, VarianceKind, VarianceReport, validate_counts,
};
