use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockrec_core::{ProductId, WarehouseId};
use stockrec_inventory::{
    AccountingPeriod, PeriodCounters, PeriodWindow, StockAdjustmentTransaction, StockCommand,
    StockPosition,
};

use crate::error::LedgerError;

/// A receipt read back from a movement stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryEvent {
    pub sequence_number: u64,
    pub quantity: i64,
    pub unit_cost: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Source of truth for stock movements and running valuation.
///
/// ## Read semantics
///
/// - Unknown streams read as empty: zero counters, no exits, an empty position.
/// - `read_exit_series` returns one total per completed window, oldest first,
///   and omits windows that start before the stream's first movement, so a
///   short series means "not enough history".
///
/// ## Write semantics
///
/// - `record_movement` appends the decided events and evolves the position in
///   one unit of work.
/// - `commit_adjustments` is all-or-nothing across the whole batch, including
///   when the caller drops the future on timeout before it resolves.
#[async_trait]
pub trait StockLedger: Send + Sync {
    async fn read_period_counters(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        period: AccountingPeriod,
    ) -> Result<PeriodCounters, LedgerError>;

    async fn read_exit_series(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        window: PeriodWindow,
        as_of: NaiveDate,
    ) -> Result<Vec<i64>, LedgerError>;

    /// Receipts recorded at or after `since`, in stream order.
    async fn read_entry_events(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        since: DateTime<Utc>,
    ) -> Result<Vec<EntryEvent>, LedgerError>;

    async fn read_position(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
    ) -> Result<StockPosition, LedgerError>;

    async fn record_movement(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        command: StockCommand,
    ) -> Result<StockPosition, LedgerError>;

    async fn commit_adjustments(
        &self,
        warehouse_id: WarehouseId,
        transactions: &[StockAdjustmentTransaction],
    ) -> Result<(), LedgerError>;
}

#[async_trait]
impl<L> StockLedger for Arc<L>
where
    L: StockLedger + ?Sized,
{
    async fn read_period_counters(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        period: AccountingPeriod,
    ) -> Result<PeriodCounters, LedgerError> {
        (**self)
            .read_period_counters(warehouse_id, product_id, period)
            .await
    }

    async fn read_exit_series(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        window: PeriodWindow,
        as_of: NaiveDate,
    ) -> Result<Vec<i64>, LedgerError> {
        (**self)
            .read_exit_series(warehouse_id, product_id, window, as_of)
            .await
    }

    async fn read_entry_events(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        since: DateTime<Utc>,
    ) -> Result<Vec<EntryEvent>, LedgerError> {
        (**self)
            .read_entry_events(warehouse_id, product_id, since)
            .await
    }

    async fn read_position(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
    ) -> Result<StockPosition, LedgerError> {
        (**self).read_position(warehouse_id, product_id).await
    }

    async fn record_movement(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        command: StockCommand,
    ) -> Result<StockPosition, LedgerError> {
        (**self)
            .record_movement(warehouse_id, product_id, command)
            .await
    }

    async fn commit_adjustments(
        &self,
        warehouse_id: WarehouseId,
        transactions: &[StockAdjustmentTransaction],
    ) -> Result<(), LedgerError> {
        (**self)
            .commit_adjustments(warehouse_id, transactions)
            .await
    }
}
