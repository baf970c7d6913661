//! Ledger-backed estimators: consumption (CMM) and valuation (CMP).

pub mod consumption;
pub mod valuation;

pub use consumption::compute_cmm;
pub use valuation::{ReceiptSummary, compute_cmp, purchase_cost_since};
