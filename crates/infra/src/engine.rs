//! Reconciliation engine (application-level orchestration).
//!
//! The engine composes a `StockLedger` and a `StockCatalog` and implements the
//! two-phase counting workflow:
//!
//! ```text
//! get_inventory / preview_counts      (pure reads, cancellable)
//!   ↓
//! submit_physical_counts
//!   1. validate the whole batch (no partial work)
//!   2. take the warehouse lock (held → Conflict)
//!   3. re-read counters under the lock
//!   4. one atomic commit of the non-zero variances
//! ```
//!
//! Steps 3 and 4 run on a detached task that owns the lock guard, so a caller
//! that goes away after the commit has started cannot interrupt it. Every
//! ledger call in that task, the commit included, is bounded by the
//! configured timeout: a stalled ledger yields `Timeout` and the lock is
//! released.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockrec_core::{ProductId, UserId, WarehouseId};
use stockrec_inventory::{
    AccountingPeriod, CountSummary, Granularity, InventoryLine, IssueStock, PhysicalCount,
    PeriodWindow, ReceiveStock, StockAdjustmentTransaction, StockCommand, StockPosition,
    StockedProduct, VarianceReport, Warehouse, validate_counts,
};

use crate::catalog::StockCatalog;
use crate::config::EngineConfig;
use crate::error::{EngineError, PendingBatch};
use crate::estimators::{self, ReceiptSummary};
use crate::export;
use crate::ledger::StockLedger;
use crate::locks::{SubmissionGuard, SubmissionLocks};

/// Already-authorized caller of a mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub user_id: UserId,
    pub role: String,
}

impl CallerIdentity {
    pub fn new(user_id: UserId, role: impl Into<String>) -> Self {
        Self {
            user_id,
            role: role.into(),
        }
    }
}

/// Result of a committed physical-count submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub warehouse_id: WarehouseId,
    /// Number of submitted lines.
    pub saved_count: usize,
    /// Transactions actually created (non-zero variance only).
    pub adjustments: Vec<StockAdjustmentTransaction>,
    /// Products whose count matched theoretical stock.
    pub confirmed: Vec<ProductId>,
    pub summary: CountSummary,
}

#[derive(Debug)]
pub struct ReconciliationEngine<L, C> {
    ledger: Arc<L>,
    catalog: Arc<C>,
    locks: SubmissionLocks,
    config: EngineConfig,
}

impl<L, C> ReconciliationEngine<L, C> {
    pub fn new(ledger: Arc<L>, catalog: Arc<C>, config: EngineConfig) -> Self {
        Self {
            ledger,
            catalog,
            locks: SubmissionLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn catalog(&self) -> &Arc<C> {
        &self.catalog
    }

    /// Parse a granularity (`day`, `week`, `month`) with the configured lookback.
    pub fn window(&self, granularity: &str) -> Result<PeriodWindow, EngineError> {
        let granularity: Granularity = granularity.parse()?;
        Ok(PeriodWindow::with_lookback(granularity, self.config.cmm_lookback))
    }

    /// Monthly window with the configured lookback.
    pub fn default_window(&self) -> PeriodWindow {
        PeriodWindow::with_lookback(Granularity::Month, self.config.cmm_lookback)
    }
}

impl<L, C> ReconciliationEngine<L, C>
where
    L: StockLedger + 'static,
    C: StockCatalog + 'static,
{
    pub async fn register_warehouse(&self, name: &str) -> Result<Warehouse, EngineError> {
        let warehouse = Warehouse::new(WarehouseId::new(), name)?;
        self.bounded("register_warehouse", self.catalog.register_warehouse(warehouse.clone()))
            .await?;
        tracing::info!(warehouse_id = %warehouse.id, name = %warehouse.name, "warehouse registered");
        Ok(warehouse)
    }

    pub async fn register_product(
        &self,
        warehouse_id: WarehouseId,
        product: StockedProduct,
    ) -> Result<StockedProduct, EngineError> {
        self.bounded(
            "register_product",
            self.catalog.register_product(warehouse_id, product.clone()),
        )
        .await?;
        tracing::info!(
            %warehouse_id,
            product_id = %product.product_id,
            sku = %product.sku,
            min_stock = product.min_stock,
            max_stock = product.max_stock,
            "product registered"
        );
        Ok(product)
    }

    /// Record an entry and update the running average in the same write.
    pub async fn record_receipt(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        quantity: i64,
        unit_cost: Decimal,
        occurred_at: DateTime<Utc>,
    ) -> Result<StockPosition, EngineError> {
        self.stocked_product(warehouse_id, product_id).await?;
        let command = StockCommand::Receive(ReceiveStock {
            quantity,
            unit_cost,
            occurred_at,
        });
        let position = self
            .bounded(
                "record_movement",
                self.ledger.record_movement(warehouse_id, product_id, command),
            )
            .await?;
        tracing::debug!(
            %warehouse_id,
            %product_id,
            quantity,
            %unit_cost,
            on_hand = position.on_hand(),
            cmp = %position.average_cost(),
            "receipt recorded"
        );
        Ok(position)
    }

    pub async fn record_issue(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        quantity: i64,
        occurred_at: DateTime<Utc>,
    ) -> Result<StockPosition, EngineError> {
        self.stocked_product(warehouse_id, product_id).await?;
        let command = StockCommand::Issue(IssueStock {
            quantity,
            occurred_at,
        });
        let position = self
            .bounded(
                "record_movement",
                self.ledger.record_movement(warehouse_id, product_id, command),
            )
            .await?;
        tracing::debug!(%warehouse_id, %product_id, quantity, on_hand = position.on_hand(), "issue recorded");
        Ok(position)
    }

    /// One line per stocked product for the accounting period containing
    /// `as_of`, sorted by name then SKU. No physical counts are attached.
    pub async fn get_inventory(
        &self,
        warehouse_id: WarehouseId,
        window: PeriodWindow,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<InventoryLine>, EngineError> {
        let products = self.products(warehouse_id).await?;
        let period = AccountingPeriod::containing(as_of.date_naive());

        let mut lines = Vec::with_capacity(products.len());
        for product in &products {
            lines.push(self.build_line(warehouse_id, product, period, window, as_of).await?);
        }
        sort_lines(&mut lines);

        tracing::debug!(
            %warehouse_id,
            period = %period.label(),
            granularity = %window.granularity(),
            lines = lines.len(),
            "inventory computed"
        );
        Ok(lines)
    }

    /// Inventory with provisional counts attached. Nothing is written.
    pub async fn preview_counts(
        &self,
        warehouse_id: WarehouseId,
        window: PeriodWindow,
        counts: &[PhysicalCount],
        as_of: DateTime<Utc>,
    ) -> Result<Vec<InventoryLine>, EngineError> {
        validate_counts(counts, true)?;
        let products = self.products(warehouse_id).await?;
        ensure_stocked(warehouse_id, &products, counts)?;

        let lines = self.get_inventory(warehouse_id, window, as_of).await?;
        Ok(attach_counts(lines, counts))
    }

    /// Commit a batch of physical counts.
    ///
    /// Every line is validated before anything is written; an invalid line
    /// fails the whole batch. Lines whose count matches theoretical stock are
    /// confirmed without a transaction.
    pub async fn submit_physical_counts(
        &self,
        caller: &CallerIdentity,
        warehouse_id: WarehouseId,
        counts: Vec<PhysicalCount>,
        as_of: DateTime<Utc>,
    ) -> Result<SubmissionOutcome, EngineError> {
        validate_counts(&counts, false)?;
        let products = self.products(warehouse_id).await?;
        ensure_stocked(warehouse_id, &products, &counts)?;

        let guard = self.locks.try_acquire(warehouse_id).inspect_err(|_| {
            tracing::warn!(%warehouse_id, user_id = %caller.user_id, "submission refused: warehouse busy");
        })?;

        let pending = PendingBatch {
            warehouse_id,
            counts: counts.clone(),
        };

        let batch = CommitBatch {
            guard,
            products,
            counts,
            recorded_by: caller.user_id,
            as_of,
            limit: self.config.ledger_timeout,
        };
        let handle = tokio::spawn(batch.run(Arc::clone(&self.ledger)));

        let result = match handle.await {
            Ok(result) => result,
            Err(join) => Err(EngineError::UpstreamFailure {
                message: format!("commit task failed: {join}"),
                pending: None,
            }),
        };

        match result {
            Ok(outcome) => {
                tracing::info!(
                    %warehouse_id,
                    user_id = %caller.user_id,
                    role = %caller.role,
                    saved_count = outcome.saved_count,
                    adjustments = outcome.adjustments.len(),
                    confirmed = outcome.confirmed.len(),
                    total_variance = outcome.summary.total_variance,
                    "physical counts committed"
                );
                Ok(outcome)
            }
            Err(err) => {
                let err = err.with_pending(&pending);
                tracing::warn!(%warehouse_id, user_id = %caller.user_id, error = %err, "physical count submission failed");
                Err(err)
            }
        }
    }

    /// Valued discrepancies for a set of counts, largest first. Nothing is
    /// written.
    pub async fn variance_report(
        &self,
        warehouse_id: WarehouseId,
        counts: &[PhysicalCount],
        as_of: DateTime<Utc>,
    ) -> Result<VarianceReport, EngineError> {
        let lines = self
            .preview_counts(warehouse_id, self.default_window(), counts, as_of)
            .await?;
        Ok(VarianceReport::build(warehouse_id, &lines, Utc::now()))
    }

    pub async fn export_inventory(
        &self,
        warehouse_id: WarehouseId,
        window: PeriodWindow,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<u8>, EngineError> {
        let lines = self.get_inventory(warehouse_id, window, as_of).await?;
        let bytes = export::export_inventory(&lines, self.config.export_delimiter)?;
        tracing::info!(%warehouse_id, rows = lines.len(), bytes = bytes.len(), "inventory exported");
        Ok(bytes)
    }

    pub async fn compute_cmm(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        window: PeriodWindow,
        as_of: DateTime<Utc>,
    ) -> Result<Decimal, EngineError> {
        self.stocked_product(warehouse_id, product_id).await?;
        self.bounded(
            "read_exit_series",
            estimators::compute_cmm(
                self.ledger.as_ref(),
                warehouse_id,
                product_id,
                window,
                as_of.date_naive(),
            ),
        )
        .await
    }

    pub async fn compute_cmp(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
    ) -> Result<Decimal, EngineError> {
        self.stocked_product(warehouse_id, product_id).await?;
        self.bounded(
            "read_position",
            estimators::compute_cmp(self.ledger.as_ref(), warehouse_id, product_id),
        )
        .await
    }

    pub async fn purchase_cost_since(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
        since: DateTime<Utc>,
    ) -> Result<ReceiptSummary, EngineError> {
        self.stocked_product(warehouse_id, product_id).await?;
        self.bounded(
            "read_entry_events",
            estimators::purchase_cost_since(self.ledger.as_ref(), warehouse_id, product_id, since),
        )
        .await
    }

    async fn bounded<T, E, F>(&self, operation: &'static str, call: F) -> Result<T, EngineError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<EngineError>,
    {
        bounded(self.config.ledger_timeout, operation, call).await
    }

    async fn products(&self, warehouse_id: WarehouseId) -> Result<Vec<StockedProduct>, EngineError> {
        self.bounded("find_warehouse", self.catalog.find_warehouse(warehouse_id))
            .await?
            .ok_or_else(|| EngineError::warehouse_not_found(warehouse_id))?;
        self.bounded("stocked_products", self.catalog.stocked_products(warehouse_id))
            .await
    }

    async fn stocked_product(
        &self,
        warehouse_id: WarehouseId,
        product_id: ProductId,
    ) -> Result<StockedProduct, EngineError> {
        self.products(warehouse_id)
            .await?
            .into_iter()
            .find(|p| p.product_id == product_id)
            .ok_or_else(|| EngineError::product_not_stocked(warehouse_id, product_id))
    }

    async fn build_line(
        &self,
        warehouse_id: WarehouseId,
        product: &StockedProduct,
        period: AccountingPeriod,
        window: PeriodWindow,
        as_of: DateTime<Utc>,
    ) -> Result<InventoryLine, EngineError> {
        let product_id = product.product_id;
        let counters = self
            .bounded(
                "read_period_counters",
                self.ledger.read_period_counters(warehouse_id, product_id, period),
            )
            .await?;
        let cmm = self
            .bounded(
                "read_exit_series",
                estimators::compute_cmm(
                    self.ledger.as_ref(),
                    warehouse_id,
                    product_id,
                    window,
                    as_of.date_naive(),
                ),
            )
            .await?;
        let cmp = self
            .bounded(
                "read_position",
                estimators::compute_cmp(self.ledger.as_ref(), warehouse_id, product_id),
            )
            .await?;

        Ok(InventoryLine::new(warehouse_id, product, counters, cmm, cmp))
    }
}

/// Work done while holding the warehouse lock.
struct CommitBatch {
    guard: SubmissionGuard,
    products: Vec<StockedProduct>,
    counts: Vec<PhysicalCount>,
    recorded_by: UserId,
    as_of: DateTime<Utc>,
    limit: Duration,
}

impl CommitBatch {
    async fn run<L>(self, ledger: Arc<L>) -> Result<SubmissionOutcome, EngineError>
    where
        L: StockLedger + 'static,
    {
        let warehouse_id = self.guard.warehouse_id();
        let period = AccountingPeriod::containing(self.as_of.date_naive());
        let by_id: HashMap<ProductId, &StockedProduct> =
            self.products.iter().map(|p| (p.product_id, p)).collect();

        // Fresh reads: counters may have moved since the caller's preview.
        let mut lines = Vec::with_capacity(self.counts.len());
        for count in &self.counts {
            let product = by_id
                .get(&count.product_id)
                .ok_or_else(|| EngineError::product_not_stocked(warehouse_id, count.product_id))?;
            let counters = bounded(
                self.limit,
                "read_period_counters",
                ledger.read_period_counters(warehouse_id, count.product_id, period),
            )
            .await?;
            let cmp = bounded(
                self.limit,
                "read_position",
                estimators::compute_cmp(ledger.as_ref(), warehouse_id, count.product_id),
            )
            .await?;
            let line = InventoryLine::new(warehouse_id, product, counters, Decimal::ZERO, cmp)
                .with_physical_count(Some(count.physical_count));
            line.checked_variance().map_err(|e| EngineError::InvalidArgument {
                message: e.to_string(),
                product_id: Some(count.product_id),
            })?;
            tracing::debug!(
                %warehouse_id,
                product_id = %count.product_id,
                sdu_theoretical = line.sdu_theoretical(),
                physical_count = count.physical_count,
                variance = line.variance().unwrap_or_default(),
                "count reconciled"
            );
            lines.push(line);
        }

        let mut adjustments = Vec::new();
        let mut confirmed = Vec::new();
        for line in &lines {
            match StockAdjustmentTransaction::for_line(line, self.recorded_by, self.as_of) {
                Some(tx) => adjustments.push(tx),
                None => confirmed.push(line.product_id),
            }
        }

        if !adjustments.is_empty() {
            bounded(
                self.limit,
                "commit_adjustments",
                ledger.commit_adjustments(warehouse_id, &adjustments),
            )
            .await?;
        }

        Ok(SubmissionOutcome {
            warehouse_id,
            saved_count: lines.len(),
            summary: CountSummary::from_lines(&lines),
            adjustments,
            confirmed,
        })
    }
}

async fn bounded<T, E, F>(limit: Duration, operation: &'static str, call: F) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<EngineError>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => {
            tracing::warn!(operation, timeout_ms = limit.as_millis() as u64, "upstream call timed out");
            Err(EngineError::Timeout {
                operation,
                pending: None,
            })
        }
    }
}

fn ensure_stocked(
    warehouse_id: WarehouseId,
    products: &[StockedProduct],
    counts: &[PhysicalCount],
) -> Result<(), EngineError> {
    let stocked: HashSet<ProductId> = products.iter().map(|p| p.product_id).collect();
    match counts.iter().find(|c| !stocked.contains(&c.product_id)) {
        Some(unknown) => Err(EngineError::product_not_stocked(warehouse_id, unknown.product_id)),
        None => Ok(()),
    }
}

fn attach_counts(lines: Vec<InventoryLine>, counts: &[PhysicalCount]) -> Vec<InventoryLine> {
    let by_id: HashMap<ProductId, i64> = counts
        .iter()
        .map(|c| (c.product_id, c.physical_count))
        .collect();
    lines
        .into_iter()
        .map(|line| {
            let count = by_id.get(&line.product_id).copied();
            line.with_physical_count(count)
        })
        .collect()
}

fn sort_lines(lines: &mut [InventoryLine]) {
    lines.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.sku.cmp(&b.sku)));
}
