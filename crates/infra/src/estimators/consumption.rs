use chrono::NaiveDate;
use rust_decimal::Decimal;

use stockrec_core::{ProductId, WarehouseId};
use stockrec_inventory::{PeriodWindow, mean_consumption};

use crate::error::LedgerError;
use crate::ledger::StockLedger;

/// Average exits per completed window over `window.lookback()` windows, or zero
/// when the product has less history than that.
///
/// Reads only the exit series; theoretical stock is never touched.
pub async fn compute_cmm<L>(
    ledger: &L,
    warehouse_id: WarehouseId,
    product_id: ProductId,
    window: PeriodWindow,
    as_of: NaiveDate,
) -> Result<Decimal, LedgerError>
where
    L: StockLedger + ?Sized,
{
    let series = ledger
        .read_exit_series(warehouse_id, product_id, window, as_of)
        .await?;
    let cmm = mean_consumption(&series, window.lookback());

    tracing::debug!(
        %warehouse_id,
        %product_id,
        granularity = %window.granularity(),
        windows = series.len(),
        %cmm,
        "computed CMM"
    );
    Ok(cmm)
}
