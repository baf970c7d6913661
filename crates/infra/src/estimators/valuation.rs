use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockrec_core::{DomainError, ProductId, WarehouseId};

use crate::error::LedgerError;
use crate::ledger::StockLedger;

/// Current weighted-average unit cost, read from the maintained position.
pub async fn compute_cmp<L>(
    ledger: &L,
    warehouse_id: WarehouseId,
    product_id: ProductId,
) -> Result<Decimal, LedgerError>
where
    L: StockLedger + ?Sized,
{
    let position = ledger.read_position(warehouse_id, product_id).await?;
    Ok(position.average_cost())
}

/// Purchase totals over a span of receipts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptSummary {
    pub receipts: usize,
    pub quantity: i64,
    pub value: Decimal,
    pub average_unit_cost: Decimal,
}

/// Totals of the receipts recorded at or after `since`.
pub async fn purchase_cost_since<L>(
    ledger: &L,
    warehouse_id: WarehouseId,
    product_id: ProductId,
    since: DateTime<Utc>,
) -> Result<ReceiptSummary, LedgerError>
where
    L: StockLedger + ?Sized,
{
    let entries = ledger
        .read_entry_events(warehouse_id, product_id, since)
        .await?;

    let mut summary = ReceiptSummary {
        receipts: entries.len(),
        ..ReceiptSummary::default()
    };
    for entry in &entries {
        let quantity = summary.quantity.checked_add(entry.quantity);
        let value = Decimal::from(entry.quantity)
            .checked_mul(entry.unit_cost)
            .and_then(|v| summary.value.checked_add(v));
        let (Some(quantity), Some(value)) = (quantity, value) else {
            return Err(LedgerError::Rejected(DomainError::invariant(format!(
                "receipt totals of {warehouse_id}/{product_id} overflow"
            ))));
        };
        summary.quantity = quantity;
        summary.value = value;
    }
    if summary.quantity > 0 {
        summary.average_unit_cost = summary.value / Decimal::from(summary.quantity);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use stockrec_inventory::{IssueStock, ReceiveStock, StockCommand};

    use crate::ledger::InMemoryStockLedger;

    fn receive(quantity: i64, cost: i64, day: u32) -> StockCommand {
        StockCommand::Receive(ReceiveStock {
            quantity,
            unit_cost: Decimal::from(cost),
            occurred_at: Utc.with_ymd_and_hms(2026, 3, day, 10, 0, 0).unwrap(),
        })
    }

    #[tokio::test]
    async fn cmp_follows_receipts_and_ignores_issues() {
        let ledger = InMemoryStockLedger::new();
        let (w, p) = (WarehouseId::new(), ProductId::new());

        ledger.record_movement(w, p, receive(10, 100, 1)).await.unwrap();
        ledger.record_movement(w, p, receive(5, 130, 2)).await.unwrap();
        assert_eq!(compute_cmp(&ledger, w, p).await.unwrap(), Decimal::from(110));

        ledger
            .record_movement(
                w,
                p,
                StockCommand::Issue(IssueStock {
                    quantity: 7,
                    occurred_at: Utc.with_ymd_and_hms(2026, 3, 3, 10, 0, 0).unwrap(),
                }),
            )
            .await
            .unwrap();
        assert_eq!(compute_cmp(&ledger, w, p).await.unwrap(), Decimal::from(110));
    }

    #[tokio::test]
    async fn no_receipts_means_zero_cost() {
        let ledger = InMemoryStockLedger::new();
        let cmp = compute_cmp(&ledger, WarehouseId::new(), ProductId::new())
            .await
            .unwrap();
        assert_eq!(cmp, Decimal::ZERO);
    }

    #[tokio::test]
    async fn purchase_cost_totals_receipts_since_an_instant() {
        let ledger = InMemoryStockLedger::new();
        let (w, p) = (WarehouseId::new(), ProductId::new());

        ledger.record_movement(w, p, receive(10, 100, 1)).await.unwrap();
        ledger.record_movement(w, p, receive(5, 130, 5)).await.unwrap();
        ledger.record_movement(w, p, receive(15, 90, 9)).await.unwrap();

        let since = Utc.with_ymd_and_hms(2026, 3, 4, 0, 0, 0).unwrap();
        let summary = purchase_cost_since(&ledger, w, p, since).await.unwrap();
        assert_eq!(summary.receipts, 2);
        assert_eq!(summary.quantity, 20);
        assert_eq!(summary.value, Decimal::from(2_000));
        assert_eq!(summary.average_unit_cost, Decimal::from(100));
    }
}
