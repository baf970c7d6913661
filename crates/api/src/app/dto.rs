use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockrec_core::{ProductId, WarehouseId};
use stockrec_infra::ReceiptSummary;
use stockrec_inventory::{
    AccountingPeriod, CountSummary, InventoryLine, PhysicalCount, StatusBreakdown, StockPosition,
    StockStatus,
};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateWarehouseRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterProductRequest {
    pub product_id: Option<ProductId>,
    pub name: String,
    pub sku: String,
    pub unit: String,
    pub min_stock: i64,
    pub max_stock: i64,
}

#[derive(Debug, Deserialize)]
pub struct ReceiptRequest {
    pub quantity: i64,
    pub unit_cost: Decimal,
    pub occurred_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct IssueRequest {
    pub quantity: i64,
    pub occurred_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CountsRequest {
    pub counts: Vec<PhysicalCount>,
}

/// `?period=day|week|month&as_of=RFC3339`
#[derive(Debug, Default, Deserialize)]
pub struct InventoryQuery {
    pub period: Option<String>,
    pub as_of: Option<DateTime<Utc>>,
}

impl InventoryQuery {
    pub fn granularity(&self) -> &str {
        self.period.as_deref().unwrap_or("month")
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of.unwrap_or_else(Utc::now)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ValuationQuery {
    pub since: Option<DateTime<Utc>>,
}

// -------------------------
// Response DTOs
// -------------------------

/// Inventory line with its derived values spelled out.
#[derive(Debug, Serialize)]
pub struct LineDto {
    pub product_id: ProductId,
    pub name: String,
    pub sku: String,
    pub unit: String,
    pub stock_initial: i64,
    pub entries: i64,
    pub exits: i64,
    pub sdu_theoretical: i64,
    pub physical_count: Option<i64>,
    pub variance: Option<i64>,
    pub variance_percentage: Decimal,
    pub min_stock: i64,
    pub max_stock: i64,
    pub cmm: Decimal,
    pub cmp: Decimal,
    pub status: StockStatus,
}

impl From<&InventoryLine> for LineDto {
    fn from(line: &InventoryLine) -> Self {
        Self {
            product_id: line.product_id,
            name: line.name.clone(),
            sku: line.sku.clone(),
            unit: line.unit.clone(),
            stock_initial: line.stock_initial,
            entries: line.entries,
            exits: line.exits,
            sdu_theoretical: line.sdu_theoretical(),
            physical_count: line.physical_count,
            variance: line.variance(),
            variance_percentage: line.variance_percentage(),
            min_stock: line.min_stock,
            max_stock: line.max_stock,
            cmm: line.cmm,
            cmp: line.cmp,
            status: line.status(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InventoryResponse {
    pub warehouse_id: WarehouseId,
    pub period: String,
    pub granularity: String,
    pub lines: Vec<LineDto>,
    pub breakdown: StatusBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<CountSummary>,
}

impl InventoryResponse {
    pub fn new(
        warehouse_id: WarehouseId,
        granularity: &str,
        as_of: DateTime<Utc>,
        lines: &[InventoryLine],
    ) -> Self {
        Self {
            warehouse_id,
            period: AccountingPeriod::containing(as_of.date_naive()).label(),
            granularity: granularity.to_ascii_lowercase(),
            lines: lines.iter().map(LineDto::from).collect(),
            breakdown: StatusBreakdown::from_lines(lines),
            summary: None,
        }
    }

    pub fn with_summary(mut self, lines: &[InventoryLine]) -> Self {
        self.summary = Some(CountSummary::from_lines(lines));
        self
    }
}

#[derive(Debug, Serialize)]
pub struct PositionResponse {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub on_hand: i64,
    pub cmp: Decimal,
}

impl From<&StockPosition> for PositionResponse {
    fn from(position: &StockPosition) -> Self {
        let id = position.position_id();
        Self {
            warehouse_id: id.warehouse_id,
            product_id: id.product_id,
            on_hand: position.on_hand(),
            cmp: position.average_cost(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ValuationResponse {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub cmp: Decimal,
    pub since: DateTime<Utc>,
    pub purchases: ReceiptSummary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockrec_inventory::{PeriodCounters, StockedProduct};

    #[test]
    fn line_dto_carries_derived_values() {
        let product = StockedProduct::new(ProductId::new(), "Rice", "RICE-1", "kg", 30, 80).unwrap();
        let line = InventoryLine::new(
            WarehouseId::new(),
            &product,
            PeriodCounters::new(50, 20, 30),
            Decimal::new(45, 0),
            Decimal::new(110, 0),
        )
        .with_physical_count(Some(35));

        let dto = LineDto::from(&line);
        assert_eq!(dto.sdu_theoretical, 40);
        assert_eq!(dto.variance, Some(-5));
        assert_eq!(dto.status, StockStatus::Normal);

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["status"], "normal");
        assert_eq!(json["variance"], -5);
    }

    #[test]
    fn query_defaults_to_monthly() {
        let query = InventoryQuery::default();
        assert_eq!(query.granularity(), "month");
    }
}
