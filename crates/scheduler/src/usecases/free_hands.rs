//! Manager declares readiness for new problems.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use chatdesk_core::UserId;
use chatdesk_store::ProblemsStoreError;

use crate::load::ManagerLoad;
use crate::pool::{ManagerPool, PoolError};

#[derive(Debug, Error)]
pub enum FreeHandsError {
    /// The manager already holds the maximum number of open problems.
    #[error("manager cannot take more problems")]
    ManagerOverloaded,

    #[error(transparent)]
    Load(#[from] ProblemsStoreError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

pub struct FreeHandsUseCase {
    manager_load: Arc<dyn ManagerLoad>,
    pool: Arc<ManagerPool>,
}

impl FreeHandsUseCase {
    pub fn new(manager_load: Arc<dyn ManagerLoad>, pool: Arc<ManagerPool>) -> Self {
        Self { manager_load, pool }
    }

    pub async fn handle(&self, manager_id: UserId) -> Result<(), FreeHandsError> {
        let can_take = self
            .manager_load
            .can_manager_take_problem(manager_id)
            .await?;
        if !can_take {
            return Err(FreeHandsError::ManagerOverloaded);
        }

        self.pool.put(manager_id)?;
        debug!(manager_id = %manager_id, "manager admitted to the pool");
        Ok(())
    }
}
