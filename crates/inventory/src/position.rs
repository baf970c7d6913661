//! Stock position aggregate: on-hand quantity and weighted-average cost (CMP)
//! for one product in one warehouse.
//!
//! Every movement is an event; applying a receipt updates quantity and average
//! cost together, so a store that appends and applies in one write can never
//! expose one without the other.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockrec_core::{
    AdjustmentId, Aggregate, AggregateRoot, DomainError, ProductId, UserId, WarehouseId,
};
use stockrec_events::Event;

use crate::line::MAX_QUANTITY;

/// Stream key of a stock position.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockPositionId {
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
}

impl StockPositionId {
    pub fn new(warehouse_id: WarehouseId, product_id: ProductId) -> Self {
        Self {
            warehouse_id,
            product_id,
        }
    }
}

impl core::fmt::Display for StockPositionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.warehouse_id, self.product_id)
    }
}

/// New weighted-average cost after receiving `quantity` at `unit_cost`.
///
/// `A' = (Q·A + q·c) / (Q + q)`, or `c` when `Q + q <= 0`. Negative on-hand
/// carries no cost, so `Q` is floored at zero for the weighting. `None` when
/// the value of stock does not fit in a `Decimal`.
pub fn weighted_average(
    on_hand: i64,
    average_cost: Decimal,
    quantity: i64,
    unit_cost: Decimal,
) -> Option<Decimal> {
    let held = Decimal::from(on_hand.max(0));
    let incoming = Decimal::from(quantity);
    let total = held.checked_add(incoming)?;
    if total > Decimal::ZERO {
        held.checked_mul(average_cost)?
            .checked_add(incoming.checked_mul(unit_cost)?)?
            .checked_div(total)
    } else {
        Some(unit_cost)
    }
}

fn check_quantity(what: &str, quantity: i64) -> Result<(), DomainError> {
    if quantity > MAX_QUANTITY {
        return Err(DomainError::validation(format!(
            "{what} exceeds {MAX_QUANTITY} (got {quantity})"
        )));
    }
    Ok(())
}

/// Aggregate root: StockPosition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockPosition {
    id: StockPositionId,
    on_hand: i64,
    average_cost: Decimal,
    version: u64,
}

impl StockPosition {
    /// Empty position (no movements yet) for rehydration.
    pub fn empty(id: StockPositionId) -> Self {
        Self {
            id,
            on_hand: 0,
            average_cost: Decimal::ZERO,
            version: 0,
        }
    }

    pub fn position_id(&self) -> StockPositionId {
        self.id
    }

    pub fn on_hand(&self) -> i64 {
        self.on_hand
    }

    /// Current weighted-average unit cost (CMP).
    pub fn average_cost(&self) -> Decimal {
        self.average_cost
    }
}

impl AggregateRoot for StockPosition {
    type Id = StockPositionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: ReceiveStock (an entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveStock {
    pub quantity: i64,
    pub unit_cost: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: IssueStock (an exit: sale, transfer out).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueStock {
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AdjustStock (a committed reconciliation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub adjustment_id: AdjustmentId,
    pub delta: i64,
    pub reason: String,
    pub recorded_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockCommand {
    Receive(ReceiveStock),
    Issue(IssueStock),
    Adjust(AdjustStock),
}

/// Event: StockReceived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReceived {
    pub quantity: i64,
    pub unit_cost: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockIssued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockIssued {
    pub quantity: i64,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockAdjusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub adjustment_id: AdjustmentId,
    pub delta: i64,
    pub reason: String,
    pub recorded_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockMovementEvent {
    Received(StockReceived),
    Issued(StockIssued),
    Adjusted(StockAdjusted),
}

impl StockMovementEvent {
    /// Signed effect on on-hand quantity.
    pub fn quantity_delta(&self) -> i64 {
        match self {
            StockMovementEvent::Received(e) => e.quantity,
            StockMovementEvent::Issued(e) => -e.quantity,
            StockMovementEvent::Adjusted(e) => e.delta,
        }
    }
}

impl Event for StockMovementEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StockMovementEvent::Received(_) => "stock.position.received",
            StockMovementEvent::Issued(_) => "stock.position.issued",
            StockMovementEvent::Adjusted(_) => "stock.position.adjusted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            StockMovementEvent::Received(e) => e.occurred_at,
            StockMovementEvent::Issued(e) => e.occurred_at,
            StockMovementEvent::Adjusted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for StockPosition {
    type Command = StockCommand;
    type Event = StockMovementEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        // Movements are range-checked in `handle`; replayed history is trusted.
        if let StockMovementEvent::Received(e) = event {
            self.average_cost =
                weighted_average(self.on_hand, self.average_cost, e.quantity, e.unit_cost)
                    .unwrap_or(self.average_cost);
        }
        self.on_hand = self.on_hand.saturating_add(event.quantity_delta());

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockCommand::Receive(cmd) => self.handle_receive(cmd),
            StockCommand::Issue(cmd) => self.handle_issue(cmd),
            StockCommand::Adjust(cmd) => self.handle_adjust(cmd),
        }
    }
}

impl StockPosition {
    fn on_hand_after(&self, delta: i64) -> Result<i64, DomainError> {
        self.on_hand
            .checked_add(delta)
            .filter(|q| q.unsigned_abs() <= MAX_QUANTITY.unsigned_abs())
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "on-hand stock of {} would leave the range of ±{MAX_QUANTITY}",
                    self.id
                ))
            })
    }

    fn handle_receive(&self, cmd: &ReceiveStock) -> Result<Vec<StockMovementEvent>, DomainError> {
        if cmd.quantity <= 0 {
            return Err(DomainError::validation("received quantity must be positive"));
        }
        if cmd.unit_cost < Decimal::ZERO {
            return Err(DomainError::validation("unit cost cannot be negative"));
        }
        check_quantity("received quantity", cmd.quantity)?;
        self.on_hand_after(cmd.quantity)?;
        weighted_average(self.on_hand, self.average_cost, cmd.quantity, cmd.unit_cost)
            .ok_or_else(|| DomainError::validation("receipt value is out of range"))?;
        Ok(vec![StockMovementEvent::Received(StockReceived {
            quantity: cmd.quantity,
            unit_cost: cmd.unit_cost,
            occurred_at: cmd.occurred_at,
        })])
    }

    // Oversold positions are accepted: theoretical stock may go negative and is
    // surfaced as-is to reconciliation.
    fn handle_issue(&self, cmd: &IssueStock) -> Result<Vec<StockMovementEvent>, DomainError> {
        if cmd.quantity <= 0 {
            return Err(DomainError::validation("issued quantity must be positive"));
        }
        check_quantity("issued quantity", cmd.quantity)?;
        self.on_hand_after(-cmd.quantity)?;
        Ok(vec![StockMovementEvent::Issued(StockIssued {
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_adjust(&self, cmd: &AdjustStock) -> Result<Vec<StockMovementEvent>, DomainError> {
        if cmd.delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }
        if cmd.reason.trim().is_empty() {
            return Err(DomainError::validation("adjustment reason cannot be empty"));
        }
        self.on_hand_after(cmd.delta)?;
        Ok(vec![StockMovementEvent::Adjusted(StockAdjusted {
            adjustment_id: cmd.adjustment_id,
            delta: cmd.delta,
            reason: cmd.reason.clone(),
            recorded_by: cmd.recorded_by,
            occurred_at: cmd.occurred_at,
        })])
    }
}
