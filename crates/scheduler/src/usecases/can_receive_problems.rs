//! Availability probe: could this manager receive new problems right now?

use std::sync::Arc;

use chatdesk_core::UserId;
use chatdesk_store::ProblemsStoreError;

use crate::load::ManagerLoad;
use crate::pool::ManagerPool;

/// Non-mutating; used by the manager UI to decide whether to offer the
/// "free hands" button.
pub struct CanReceiveProblemsUseCase {
    manager_load: Arc<dyn ManagerLoad>,
    pool: Arc<ManagerPool>,
}

impl CanReceiveProblemsUseCase {
    pub fn new(manager_load: Arc<dyn ManagerLoad>, pool: Arc<ManagerPool>) -> Self {
        Self { manager_load, pool }
    }

    pub async fn handle(&self, manager_id: UserId) -> Result<bool, ProblemsStoreError> {
        // Already waiting in the pool, nothing more to offer.
        if self.pool.contains(manager_id) {
            return Ok(false);
        }

        self.manager_load.can_manager_take_problem(manager_id).await
    }
}
