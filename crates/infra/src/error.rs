//! Error types at the infrastructure boundary and the engine's caller-facing
//! taxonomy.

use serde::Serialize;
use thiserror::Error;

use stockrec_core::{DomainError, ProductId, WarehouseId};
use stockrec_inventory::{CountRejection, PhysicalCount};

/// Stock ledger operation error.
///
/// These are infrastructure failures (availability, storage state) as opposed
/// to reconciliation decisions. `Rejected` carries a movement the position
/// aggregate refused.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("movement rejected: {0}")]
    Rejected(#[from] DomainError),

    #[error("ledger lock poisoned")]
    LockPoisoned,
}

/// Catalog operation error.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("already registered: {0}")]
    Duplicate(String),

    #[error("unknown warehouse {0}")]
    UnknownWarehouse(WarehouseId),

    #[error("catalog lock poisoned")]
    LockPoisoned,
}

/// The batch a failed submission was carrying, returned so callers can retry
/// it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingBatch {
    pub warehouse_id: WarehouseId,
    pub counts: Vec<PhysicalCount>,
}

/// Caller-facing engine error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid argument: {message}")]
    InvalidArgument {
        message: String,
        product_id: Option<ProductId>,
    },

    #[error("{resource} not found")]
    NotFound {
        resource: String,
        product_id: Option<ProductId>,
    },

    #[error("a physical count submission for warehouse {warehouse_id} is already in progress")]
    Conflict { warehouse_id: WarehouseId },

    #[error("upstream failure: {message}")]
    UpstreamFailure {
        message: String,
        pending: Option<PendingBatch>,
    },

    #[error("timed out waiting for {operation}")]
    Timeout {
        operation: &'static str,
        pending: Option<PendingBatch>,
    },

    #[error("export sink failed: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            product_id: None,
        }
    }

    pub fn warehouse_not_found(warehouse_id: WarehouseId) -> Self {
        Self::NotFound {
            resource: format!("warehouse {warehouse_id}"),
            product_id: None,
        }
    }

    pub fn product_not_stocked(warehouse_id: WarehouseId, product_id: ProductId) -> Self {
        Self::NotFound {
            resource: format!("product {product_id} in warehouse {warehouse_id}"),
            product_id: Some(product_id),
        }
    }

    /// Product the error refers to, for per-line failures.
    pub fn product_id(&self) -> Option<ProductId> {
        match self {
            Self::InvalidArgument { product_id, .. } | Self::NotFound { product_id, .. } => {
                *product_id
            }
            _ => None,
        }
    }

    /// Batch that was in flight, for global failures during a submission.
    pub fn pending(&self) -> Option<&PendingBatch> {
        match self {
            Self::UpstreamFailure { pending, .. } | Self::Timeout { pending, .. } => {
                pending.as_ref()
            }
            _ => None,
        }
    }

    /// Attach the in-flight batch to a global failure. Per-line errors are
    /// returned unchanged.
    pub fn with_pending(self, batch: &PendingBatch) -> Self {
        match self {
            Self::UpstreamFailure { message, .. } => Self::UpstreamFailure {
                message,
                pending: Some(batch.clone()),
            },
            Self::Timeout { operation, .. } => Self::Timeout {
                operation,
                pending: Some(batch.clone()),
            },
            other => other,
        }
    }
}

impl From<DomainError> for EngineError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg)
            | DomainError::InvalidId(msg)
            | DomainError::InvariantViolation(msg) => EngineError::invalid(msg),
        }
    }
}

impl From<CountRejection> for EngineError {
    fn from(value: CountRejection) -> Self {
        EngineError::InvalidArgument {
            message: value.to_string(),
            product_id: value.product_id(),
        }
    }
}

impl From<LedgerError> for EngineError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::Rejected(domain) => EngineError::from(domain),
            other => EngineError::UpstreamFailure {
                message: other.to_string(),
                pending: None,
            },
        }
    }
}

impl From<CatalogError> for EngineError {
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::UnknownWarehouse(id) => EngineError::warehouse_not_found(id),
            CatalogError::Duplicate(what) => EngineError::invalid(format!("already registered: {what}")),
            other => EngineError::UpstreamFailure {
                message: other.to_string(),
                pending: None,
            },
        }
    }
}
