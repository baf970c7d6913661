use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use stockrec_core::{Aggregate, DomainError, ProductId, WarehouseId};
use stockrec_events::EventEnvelope;
use stockrec_inventory::{
    AccountingPeriod, PeriodCounters, PeriodWindow, StockAdjustmentTransaction, StockCommand,
    StockMovementEvent, StockPosition, StockPositionId,
};

use super::r#trait::{EntryEvent, StockLedger};
use crate::error::LedgerError;

#[derive(Debug, Clone)]
struct Stream {
    events: Vec<EventEnvelope<StockMovementEvent>>,
    position: StockPosition,
}

impl Stream {
    fn open(id: StockPositionId) -> Self {
        Self {
            events: Vec::new(),
            position: StockPosition::empty(id),
        }
    }

    fn current_version(&self) -> u64 {
        self.events.last().map(|e| e.sequence_number()).unwrap_or(0)
    }

    fn first_movement_date(&self) -> Option<NaiveDate> {
        self.events.iter().map(|e| e.occurred_at().date_naive()).min()
    }

    /// Decide, then append and apply. Nothing changes when the position
    /// rejects the command.
    fn execute(&mut self, command: &StockCommand) -> Result<(), DomainError> {
        let decided = self.position.handle(command)?;
        let id = self.position.position_id();

        let mut next = self.current_version() + 1;
        for event in decided {
            self.position.apply(&event);
            self.events.push(EventEnvelope::new(
                Uuid::now_v7(),
                id.warehouse_id,
                id.product_id,
                next,
                event,
            ));
            next += 1;
        }
        Ok(())
    }

    fn counters(&self, period: AccountingPeriod) -> Result<PeriodCounters, DomainError> {
        let overflow = || {
            DomainError::invariant(format!(
                "period counters of {} overflow",
                self.position.position_id()
            ))
        };
        let mut counters = PeriodCounters::default();
        for envelope in &self.events {
            let date = envelope.occurred_at().date_naive();
            let event = envelope.payload();
            let (slot, quantity) = if date < period.start() {
                (&mut counters.stock_initial, event.quantity_delta())
            } else if period.contains(date) {
                match event {
                    StockMovementEvent::Received(e) => (&mut counters.entries, e.quantity),
                    StockMovementEvent::Issued(e) => (&mut counters.exits, e.quantity),
                    StockMovementEvent::Adjusted(e) if e.delta > 0 => {
                        (&mut counters.entries, e.delta)
                    }
                    StockMovementEvent::Adjusted(e) => (&mut counters.exits, e.delta.saturating_neg()),
                }
            } else {
                continue;
            };
            *slot = slot.checked_add(quantity).ok_or_else(overflow)?;
        }
        Ok(counters)
    }

    fn exit_series(&self, window: PeriodWindow, as_of: NaiveDate) -> Vec<i64> {
        let Some(first) = self.first_movement_date() else {
            return Vec::new();
        };

        window
            .completed_windows(as_of)
            .into_iter()
            .filter(|range| range.start >= first)
            .map(|range| {
                self.events
                    .iter()
                    .filter(|e| range.contains(e.occurred_at().date_naive()))
                    .filter_map(|e| match e.payload() {
                        StockMovementEvent::Issued(issued) => Some(issued.quantity),
                        _ => None,
                    })
                    .fold(0i64, |acc, q| acc.saturating_add(q))
            })
            .collect()
    }
}

/// Injected failure modes, for exercising timeout and atomicity paths.
#[derive(Debug, Clone, Default)]
struct Faults {
    latency: Option<Duration>,
    unavailable: Option<String>,
    failing_products: HashSet<ProductId>,
}

/// In-memory stock ledger.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryStockLedger {
    streams: RwLock<HashMap<StockPositionId, Stream>>,
    faults: RwLock<Faults>,
}

impl InMemoryStockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` before it touches the streams.
    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut faults) = self.faults.write() {
            faults.latency = latency;
        }
    }

    /// Fail every call with `LedgerError::Unavailable` until cleared.
    pub fn set_unavailable(&self, reason: Option<String>) {
        if let Ok(mut faults) = self.faults.write() {
            faults.unavailable = reason;
        }
    }

    /// Fail any adjustment batch that touches `product_id`.
    pub fn fail_commits_for(&self, product_id: ProductId) {
        if let Ok(mut faults) = self.faults.write() {
            faults.failing_products.insert(product_id);
        }
    }

    pub fn clear_faults(&self) {
        if let Ok(mut faults) = self.faults.write() {
            *faults = Faults::default();
        }
    }

    /// Number of events in a stream.
    pub fn stream_len(&self, warehouse_id: WarehouseId, product_id: ProductId) -> usize {
        self.streams
            .read()
            .ok()
            .and_then(|streams| {
                streams
                    .get(&StockPositionId::new(warehouse_id, product_id))
                    .map(|s| s.events.len())
            })
            .unwrap_or(0)
    }

    async fn gate(&self) -> Result<Faults, LedgerError> {
        let faults = self
            .faults
            .read()
            .map_err(|_| LedgerError::LockPoisoned)?
            .clone();

        if let Some(latency) = faults.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(reason) = &faults.unavailable {
            return Err(LedgerError::Unavailable(reason.clone()));
        }
        Ok(faults)
    }

    fn read_stream<T>(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        read: impl FnOnce(Option<&Stream>) -> T,
    ) -> Result<T, LedgerError> {
        let streams = self.streams.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(read(streams.get(&StockPositionId::new(warehouse_id, product_id))))
    }
}

#[async_trait]
impl StockLedger for InMemoryStockLedger {
    async fn read_period_counters(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        period: AccountingPeriod,
    ) -> Result<PeriodCounters, LedgerError> {
        self.gate().await?;
        let counters = self.read_stream(warehouse_id, product_id, |stream| {
            stream.map_or(Ok(PeriodCounters::default()), |s| s.counters(period))
        })?;
        Ok(counters?)
    }

    async fn read_exit_series(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        window: PeriodWindow,
        as_of: NaiveDate,
    ) -> Result<Vec<i64>, LedgerError> {
        self.gate().await?;
        self.read_stream(warehouse_id, product_id, |stream| {
            stream
                .map(|s| s.exit_series(window, as_of))
                .unwrap_or_default()
        })
    }

    async fn read_entry_events(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        since: DateTime<Utc>,
    ) -> Result<Vec<EntryEvent>, LedgerError> {
        self.gate().await?;
        self.read_stream(warehouse_id, product_id, |stream| {
            let Some(stream) = stream else {
                return Vec::new();
            };
            stream
                .events
                .iter()
                .filter_map(|envelope| match envelope.payload() {
                    StockMovementEvent::Received(e) if e.occurred_at >= since => Some(EntryEvent {
                        sequence_number: envelope.sequence_number(),
                        quantity: e.quantity,
                        unit_cost: e.unit_cost,
                        occurred_at: e.occurred_at,
                    }),
                    _ => None,
                })
                .collect()
        })
    }

    async fn read_position(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
    ) -> Result<StockPosition, LedgerError> {
        self.gate().await?;
        self.read_stream(warehouse_id, product_id, |stream| match stream {
            Some(s) => s.position.clone(),
            None => StockPosition::empty(StockPositionId::new(warehouse_id, product_id)),
        })
    }

    async fn record_movement(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        command: StockCommand,
    ) -> Result<StockPosition, LedgerError> {
        self.gate().await?;

        let key = StockPositionId::new(warehouse_id, product_id);
        let mut streams = self.streams.write().map_err(|_| LedgerError::LockPoisoned)?;
        let stream = streams.entry(key).or_insert_with(|| Stream::open(key));
        stream.execute(&command)?;
        Ok(stream.position.clone())
    }

    async fn commit_adjustments(
        &self,
        warehouse_id: WarehouseId,
        transactions: &[StockAdjustmentTransaction],
    ) -> Result<(), LedgerError> {
        let faults = self.gate().await?;

        if let Some(stray) = transactions.iter().find(|t| t.warehouse_id != warehouse_id) {
            return Err(LedgerError::Rejected(DomainError::invariant(format!(
                "adjustment {} targets warehouse {}, batch is for {}",
                stray.adjustment_id, stray.warehouse_id, warehouse_id
            ))));
        }

        let mut streams = self.streams.write().map_err(|_| LedgerError::LockPoisoned)?;

        // Stage every stream touched by the batch; swap in only if all succeed.
        let mut staged: HashMap<StockPositionId, Stream> = HashMap::new();
        for transaction in transactions {
            if faults.failing_products.contains(&transaction.product_id) {
                return Err(LedgerError::Unavailable(format!(
                    "write failed for product {}",
                    transaction.product_id
                )));
            }

            let key = StockPositionId::new(warehouse_id, transaction.product_id);
            let mut stream = match staged.remove(&key) {
                Some(s) => s,
                None => streams.get(&key).cloned().unwrap_or_else(|| Stream::open(key)),
            };
            stream.execute(&transaction.to_command())?;
            staged.insert(key, stream);
        }

        streams.extend(staged);
        Ok(())
    }
}
