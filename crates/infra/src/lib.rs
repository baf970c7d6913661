//! Infrastructure layer: ledger and catalog adapters, estimators, the
//! reconciliation engine, export and configuration.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod estimators;
pub mod export;
pub mod ledger;
pub mod locks;


pub use catalog::{InMemoryStockCatalog, StockCatalog};
pub use config::EngineConfig;
pub use engine::{CallerIdentity, ReconciliationEngine, SubmissionOutcome};
pub use error::{CatalogError, EngineError, LedgerError, PendingBatch};
pub use estimators::ReceiptSummary;
pub use ledger::{EntryEvent, InMemoryStockLedger, StockLedger};
