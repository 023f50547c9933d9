//! Periodic matcher between pending problems and available managers.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use chatdesk_core::UserId;
use chatdesk_outbox::jobs::manager_assigned_to_problem;
use chatdesk_outbox::EnqueueJob;
use chatdesk_store::{Problem, ProblemsStore, Transactor};

use crate::error::SchedulerError;
use crate::pool::{ManagerPool, PoolError};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Tick period between drain passes.
    pub period: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(1),
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.period < Duration::from_millis(100) || self.period > Duration::from_secs(60) {
            return Err(SchedulerError::Config(format!(
                "period must be in 100ms..=1m, got {:?}",
                self.period
            )));
        }
        Ok(())
    }
}

/// Matches problems to managers, oldest to oldest.
///
/// Runs as a single loop: one instance cluster-wide unless the assignment
/// transaction is made cluster-safe (deployment constraint, not enforced
/// here).
pub struct ManagerScheduler<P, T, O> {
    pool: Arc<ManagerPool>,
    problems: P,
    transactor: T,
    outbox: O,
    period: Duration,
}

impl<P, T, O> ManagerScheduler<P, T, O>
where
    P: ProblemsStore + Clone + Send + Sync + 'static,
    T: Transactor + Send + Sync,
    O: EnqueueJob + Clone + Send + Sync + 'static,
{
    pub fn new(
        pool: Arc<ManagerPool>,
        problems: P,
        transactor: T,
        outbox: O,
        config: SchedulerConfig,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;
        Ok(Self {
            pool,
            problems,
            transactor,
            outbox,
            period: config.period,
        })
    }

    /// Tick until `cancel` fires; returns Ok on clean cancellation.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), SchedulerError> {
        info!(period = ?self.period, "manager scheduler started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("manager scheduler stopped");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.period) => {}
            }

            self.drain().await;
        }
    }

    /// One drain pass: walk pending problems oldest-first, pairing each with
    /// the longest-waiting manager, until either side runs out.
    async fn drain(&self) {
        let pending = match self.problems.list_pending().await {
            Ok(pending) => pending,
            Err(e) => {
                error!(error = %e, "failed to list pending problems");
                return;
            }
        };

        for problem in pending {
            let manager_id = match self.pool.get() {
                Ok(manager_id) => manager_id,
                Err(PoolError::NoAvailableManagers) => {
                    // Nobody left for this tick; the rest of the queue waits.
                    debug!("manager pool drained");
                    return;
                }
                Err(e) => {
                    error!(error = %e, "failed to get manager from pool");
                    return;
                }
            };

            if let Err(e) = self.assign(&problem, manager_id).await {
                error!(
                    problem_id = %problem.id,
                    manager_id = %manager_id,
                    error = %e,
                    "assignment failed, returning manager to pool"
                );
                // The pop preceded the transaction, so the manager must be
                // handed back or it would leak out of rotation. Idempotent,
                // safe to repeat.
                if let Err(put_err) = self.pool.put(manager_id) {
                    error!(manager_id = %manager_id, error = %put_err, "failed to return manager");
                }
                continue;
            }

            debug!(problem_id = %problem.id, manager_id = %manager_id, "manager assigned");
        }
    }

    /// Record the assignment and the announcement job as one atomic unit.
    async fn assign(&self, problem: &Problem, manager_id: UserId) -> anyhow::Result<()> {
        let problems = self.problems.clone();
        let outbox = self.outbox.clone();
        let problem_id = problem.id;

        self.transactor
            .run_in_tx(Box::new(move || {
                async move {
                    problems.set_manager(problem_id, manager_id).await?;

                    let payload = manager_assigned_to_problem::marshal_payload(problem_id)?;
                    outbox
                        .put(manager_assigned_to_problem::NAME, &payload, Utc::now())
                        .await?;

                    Ok(())
                }
                .boxed()
            }))
            .await
    }
}
