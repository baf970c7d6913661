//! Physical-count reconciliation: count validation, adjustment transactions and
//! the summaries shown around a counting session.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockrec_core::{AdjustmentId, ProductId, UserId, WarehouseId};

use crate::line::{InventoryLine, MAX_QUANTITY, StockStatus};
use crate::position::{AdjustStock, StockCommand};

/// Reason recorded on every adjustment created from a physical count.
pub const PHYSICAL_COUNT_REASON: &str = "physical_count_reconciliation";

/// One counted quantity supplied by an operator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalCount {
    pub product_id: ProductId,
    pub physical_count: i64,
}

impl PhysicalCount {
    pub fn new(product_id: ProductId, physical_count: i64) -> Self {
        Self {
            product_id,
            physical_count,
        }
    }
}

/// Why a batch of counts was refused before any work was done.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CountRejection {
    #[error("no physical counts were submitted")]
    EmptyBatch,

    #[error("physical count for product {product_id} cannot be negative (got {physical_count})")]
    NegativeCount {
        product_id: ProductId,
        physical_count: i64,
    },

    #[error(
        "physical count for product {product_id} exceeds {max} (got {physical_count})",
        max = MAX_QUANTITY
    )]
    CountTooLarge {
        product_id: ProductId,
        physical_count: i64,
    },

    #[error("product {product_id} appears more than once in the batch")]
    DuplicateProduct { product_id: ProductId },
}

impl CountRejection {
    /// The offending product, for per-line rejections.
    pub fn product_id(&self) -> Option<ProductId> {
        match self {
            CountRejection::EmptyBatch => None,
            CountRejection::NegativeCount { product_id, .. }
            | CountRejection::CountTooLarge { product_id, .. }
            | CountRejection::DuplicateProduct { product_id } => Some(*product_id),
        }
    }
}

/// Validate a batch of counts as a whole. The first offending line wins.
pub fn validate_counts(counts: &[PhysicalCount], allow_empty: bool) -> Result<(), CountRejection> {
    if counts.is_empty() && !allow_empty {
        return Err(CountRejection::EmptyBatch);
    }

    let mut seen = HashSet::with_capacity(counts.len());
    for count in counts {
        if count.physical_count < 0 {
            return Err(CountRejection::NegativeCount {
                product_id: count.product_id,
                physical_count: count.physical_count,
            });
        }
        if count.physical_count > MAX_QUANTITY {
            return Err(CountRejection::CountTooLarge {
                product_id: count.product_id,
                physical_count: count.physical_count,
            });
        }
        if !seen.insert(count.product_id) {
            return Err(CountRejection::DuplicateProduct {
                product_id: count.product_id,
            });
        }
    }
    Ok(())
}

/// Committed correction of theoretical stock towards a physical count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustmentTransaction {
    pub adjustment_id: AdjustmentId,
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub quantity_delta: i64,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
    pub recorded_by: UserId,
}

impl StockAdjustmentTransaction {
    /// Build the adjustment for a counted line, or `None` when the count
    /// confirms theoretical stock (or no count is attached).
    pub fn for_line(
        line: &InventoryLine,
        recorded_by: UserId,
        recorded_at: DateTime<Utc>,
    ) -> Option<Self> {
        let variance = line.variance().filter(|v| *v != 0)?;
        Some(Self {
            adjustment_id: AdjustmentId::new(),
            warehouse_id: line.warehouse_id,
            product_id: line.product_id,
            quantity_delta: variance,
            reason: PHYSICAL_COUNT_REASON.to_string(),
            recorded_at,
            recorded_by,
        })
    }

    /// Ledger command applying this adjustment to the product's position.
    pub fn to_command(&self) -> StockCommand {
        StockCommand::Adjust(AdjustStock {
            adjustment_id: self.adjustment_id,
            delta: self.quantity_delta,
            reason: self.reason.clone(),
            recorded_by: self.recorded_by,
            occurred_at: self.recorded_at,
        })
    }
}

/// Totals over the counted lines of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountSummary {
    pub items_count: usize,
    pub items_with_variance: usize,
    pub surplus_items: usize,
    pub shortage_items: usize,
    pub total_expected: i64,
    pub total_physical: i64,
    pub total_variance: i64,
    pub variance_percentage: Decimal,
}

impl CountSummary {
    /// Lines without a physical count are ignored.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a InventoryLine>) -> Self {
        let mut summary = Self::default();

        for line in lines {
            let (Some(physical), Some(variance)) = (line.physical_count, line.variance()) else {
                continue;
            };
            summary.items_count += 1;
            summary.total_expected =
                summary.total_expected.saturating_add(line.sdu_theoretical());
            summary.total_physical = summary.total_physical.saturating_add(physical);
            summary.total_variance = summary.total_variance.saturating_add(variance);
            if variance > 0 {
                summary.surplus_items += 1;
            } else if variance < 0 {
                summary.shortage_items += 1;
            }
        }

        summary.items_with_variance = summary.surplus_items + summary.shortage_items;
        if summary.total_expected > 0 {
            summary.variance_percentage = Decimal::from(summary.total_variance)
                * Decimal::ONE_HUNDRED
                / Decimal::from(summary.total_expected);
        }
        summary
    }
}

/// Number of lines in each stock status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub stockout: usize,
    pub understocked: usize,
    pub normal: usize,
    pub overstocked: usize,
}

impl StatusBreakdown {
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a InventoryLine>) -> Self {
        lines
            .into_iter()
            .fold(Self::default(), |mut acc, line| {
                match line.status() {
                    StockStatus::Stockout => acc.stockout += 1,
                    StockStatus::Understocked => acc.understocked += 1,
                    StockStatus::Normal => acc.normal += 1,
                    StockStatus::Overstocked => acc.overstocked += 1,
                }
                acc
            })
    }

    /// Lines needing replenishment (stockout or understocked).
    pub fn needs_attention(&self) -> usize {
        self.stockout + self.understocked
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceKind {
    Surplus,
    Shortage,
}

/// One line of a variance report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarianceDetail {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    pub expected: i64,
    pub physical: i64,
    pub variance: i64,
    pub variance_percentage: Decimal,
    pub unit_cost: Decimal,
    pub variance_value: Decimal,
    pub kind: VarianceKind,
}

impl VarianceDetail {
    fn from_line(line: &InventoryLine) -> Option<Self> {
        let physical = line.physical_count?;
        let variance = line.variance().filter(|v| *v != 0)?;
        Some(Self {
            product_id: line.product_id,
            name: line.name.clone(),
            sku: line.sku.clone(),
            expected: line.sdu_theoretical(),
            physical,
            variance,
            variance_percentage: line.variance_percentage(),
            unit_cost: line.cmp,
            variance_value: line.variance_value(),
            kind: if variance > 0 {
                VarianceKind::Surplus
            } else {
                VarianceKind::Shortage
            },
        })
    }
}

/// Valued discrepancies of a counting session, largest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarianceReport {
    pub warehouse_id: WarehouseId,
    pub generated_at: DateTime<Utc>,
    pub lines: Vec<VarianceDetail>,
    pub summary: CountSummary,
    pub total_variance_value: Decimal,
}

impl VarianceReport {
    pub fn build(
        warehouse_id: WarehouseId,
        lines: &[InventoryLine],
        generated_at: DateTime<Utc>,
    ) -> Self {
        let mut details: Vec<VarianceDetail> =
            lines.iter().filter_map(VarianceDetail::from_line).collect();
        details.sort_by(|a, b| {
            b.variance_value
                .cmp(&a.variance_value)
                .then_with(|| a.name.cmp(&b.name))
        });

        let total_variance_value = details
            .iter()
            .fold(Decimal::ZERO, |acc, d| acc.saturating_add(d.variance_value));

        Self {
            warehouse_id,
            generated_at,
            lines: details,
            summary: CountSummary::from_lines(lines),
            total_variance_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StockedProduct;
    use crate::line::PeriodCounters;

    fn line(name: &str, counters: PeriodCounters, cmp: i64, count: Option<i64>) -> InventoryLine {
        let product =
            StockedProduct::new(ProductId::new(), name, format!("SKU-{name}"), "unit", 5, 50)
                .unwrap();
        InventoryLine::new(
            WarehouseId::new(),
            &product,
            counters,
            Decimal::ZERO,
            Decimal::from(cmp),
        )
        .with_physical_count(count)
    }

    #[test]
    fn empty_batch_is_rejected_unless_allowed() {
        assert_eq!(validate_counts(&[], false), Err(CountRejection::EmptyBatch));
        assert_eq!(validate_counts(&[], true), Ok(()));
    }

    #[test]
    fn negative_count_names_the_product() {
        let bad = ProductId::new();
        let counts = [
            PhysicalCount::new(ProductId::new(), 3),
            PhysicalCount::new(bad, -1),
        ];
        let err = validate_counts(&counts, false).unwrap_err();
        assert_eq!(err.product_id(), Some(bad));
        assert!(err.to_string().contains(&bad.to_string()));
    }

    #[test]
    fn duplicate_product_is_rejected() {
        let p = ProductId::new();
        let counts = [PhysicalCount::new(p, 3), PhysicalCount::new(p, 4)];
        assert_eq!(
            validate_counts(&counts, false),
            Err(CountRejection::DuplicateProduct { product_id: p })
        );
    }

    #[test]
    fn oversized_count_is_rejected() {
        let p = ProductId::new();
        assert!(validate_counts(&[PhysicalCount::new(p, MAX_QUANTITY)], false).is_ok());
        assert_eq!(
            validate_counts(&[PhysicalCount::new(p, i64::MAX)], false),
            Err(CountRejection::CountTooLarge {
                product_id: p,
                physical_count: i64::MAX,
            })
        );
    }

    #[test]
    fn zero_variance_creates_no_transaction() {
        let l = line("Flour", PeriodCounters::new(10, 0, 0), 2, Some(10));
        assert!(StockAdjustmentTransaction::for_line(&l, UserId::new(), Utc::now()).is_none());

        let uncounted = line("Flour", PeriodCounters::new(10, 0, 0), 2, None);
        assert!(
            StockAdjustmentTransaction::for_line(&uncounted, UserId::new(), Utc::now()).is_none()
        );
    }

    #[test]
    fn transaction_carries_variance_and_reason() {
        let user = UserId::new();
        let l = line("Rice", PeriodCounters::new(50, 20, 30), 4, Some(35));
        let tx = StockAdjustmentTransaction::for_line(&l, user, Utc::now()).unwrap();
        assert_eq!(tx.quantity_delta, -5);
        assert_eq!(tx.reason, PHYSICAL_COUNT_REASON);
        assert_eq!(tx.recorded_by, user);
        assert_eq!(tx.product_id, l.product_id);

        match tx.to_command() {
            StockCommand::Adjust(cmd) => assert_eq!(cmd.delta, -5),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn summary_counts_surplus_and_shortage() {
        let lines = vec![
            line("A", PeriodCounters::new(10, 0, 0), 1, Some(12)),
            line("B", PeriodCounters::new(10, 0, 0), 1, Some(6)),
            line("C", PeriodCounters::new(20, 0, 0), 1, Some(20)),
            line("D", PeriodCounters::new(40, 0, 0), 1, None),
        ];
        let summary = CountSummary::from_lines(&lines);
        assert_eq!(summary.items_count, 3);
        assert_eq!(summary.items_with_variance, 2);
        assert_eq!(summary.surplus_items, 1);
        assert_eq!(summary.shortage_items, 1);
        assert_eq!(summary.total_expected, 40);
        assert_eq!(summary.total_physical, 38);
        assert_eq!(summary.total_variance, -2);
        assert_eq!(summary.variance_percentage, Decimal::from(-5));
    }

    #[test]
    fn breakdown_uses_the_count_when_present() {
        let lines = vec![
            line("A", PeriodCounters::new(0, 0, 0), 1, None),
            line("B", PeriodCounters::new(3, 0, 0), 1, None),
            line("C", PeriodCounters::new(3, 0, 0), 1, Some(20)),
            line("D", PeriodCounters::new(60, 0, 0), 1, None),
        ];
        let breakdown = StatusBreakdown::from_lines(&lines);
        assert_eq!(
            breakdown,
            StatusBreakdown {
                stockout: 1,
                understocked: 1,
                normal: 1,
                overstocked: 1,
            }
        );
        assert_eq!(breakdown.needs_attention(), 2);
    }

    #[test]
    fn report_is_sorted_by_variance_value() {
        let lines = vec![
            line("Cheap", PeriodCounters::new(10, 0, 0), 1, Some(5)),
            line("Dear", PeriodCounters::new(10, 0, 0), 100, Some(12)),
            line("Even", PeriodCounters::new(10, 0, 0), 100, Some(10)),
        ];
        let report = VarianceReport::build(WarehouseId::new(), &lines, Utc::now());

        assert_eq!(report.lines.len(), 2);
        assert_eq!(report.lines[0].name, "Dear");
        assert_eq!(report.lines[0].kind, VarianceKind::Surplus);
        assert_eq!(report.lines[0].variance_value, Decimal::from(200));
        assert_eq!(report.lines[1].kind, VarianceKind::Shortage);
        assert_eq!(report.total_variance_value, Decimal::from(205));
        assert_eq!(report.summary.items_count, 3);
    }
}
