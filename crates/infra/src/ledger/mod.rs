//! Stock ledger boundary.
//!
//! The ledger owns the append-only movement stream of every (warehouse,
//! product) pair and the `StockPosition` evolved from it. Reconciliation only
//! reads counters from it and commits adjustment batches through it.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryStockLedger;
pub use r#trait::{EntryEvent, StockLedger};
