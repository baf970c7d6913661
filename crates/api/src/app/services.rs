use std::sync::Arc;

use stockrec_infra::{
    InMemoryStockCatalog, InMemoryStockLedger, ReconciliationEngine,
};

use crate::config::ApiConfig;

pub type InMemoryEngine = ReconciliationEngine<InMemoryStockLedger, InMemoryStockCatalog>;

/// Shared state of the HTTP layer.
#[derive(Debug)]
pub struct AppServices {
    pub engine: InMemoryEngine,
    pub config: ApiConfig,
}

impl AppServices {
    pub fn ledger(&self) -> &Arc<InMemoryStockLedger> {
        self.engine.ledger()
    }
}

pub fn build_services(config: ApiConfig) -> AppServices {
    // In-memory infra wiring (dev/test): ledger + catalog + engine.
    let ledger = Arc::new(InMemoryStockLedger::new());
    let catalog = Arc::new(InMemoryStockCatalog::new());
    let engine = ReconciliationEngine::new(ledger, catalog, config.engine.clone());

    AppServices { engine, config }
}
