//! Per-warehouse submission locks.
//!
//! At most one physical-count submission per warehouse is in flight. A second
//! caller is refused immediately instead of queueing behind the first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use stockrec_core::WarehouseId;

use crate::error::EngineError;

/// Held for the whole lifetime of a submission, commit included.
#[derive(Debug)]
pub struct SubmissionGuard {
    warehouse_id: WarehouseId,
    _guard: OwnedMutexGuard<()>,
}

impl SubmissionGuard {
    pub fn warehouse_id(&self) -> WarehouseId {
        self.warehouse_id
    }
}

#[derive(Debug, Default)]
pub struct SubmissionLocks {
    locks: Mutex<HashMap<WarehouseId, Arc<AsyncMutex<()>>>>,
}

impl SubmissionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the warehouse's lock, or fail with `Conflict` if it is held.
    pub fn try_acquire(&self, warehouse_id: WarehouseId) -> Result<SubmissionGuard, EngineError> {
        let lock = {
            let mut locks = self.locks.lock().map_err(|_| EngineError::UpstreamFailure {
                message: "submission lock table poisoned".to_string(),
                pending: None,
            })?;
            Arc::clone(locks.entry(warehouse_id).or_default())
        };

        let guard = lock
            .try_lock_owned()
            .map_err(|_| EngineError::Conflict { warehouse_id })?;

        Ok(SubmissionGuard {
            warehouse_id,
            _guard: guard,
        })
    }
}
