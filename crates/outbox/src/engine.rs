//! The outbox engine: a pool of workers draining the job store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use chatdesk_core::JobId;
use chatdesk_store::{JobStore, JobStoreError, ReservedJob, Transactor};

use crate::config::OutboxConfig;
use crate::error::OutboxError;
use crate::handler::{JobHandler, JobRegistry};

const REASON_MAX_ATTEMPTS: &str = "max attempts exceeded";
const REASON_NOT_REGISTERED: &str = "job is not registered";

/// Capability to enqueue deferred work.
///
/// Producers (use-cases, the manager scheduler, handlers themselves) depend
/// on this narrow trait rather than on the engine.
#[async_trait]
pub trait EnqueueJob: Send + Sync {
    /// Durably enqueue a job; never blocks on its execution.
    async fn put(
        &self,
        name: &str,
        payload: &str,
        available_at: DateTime<Utc>,
    ) -> Result<JobId, OutboxError>;
}

#[async_trait]
impl<T> EnqueueJob for Arc<T>
where
    T: EnqueueJob + ?Sized,
{
    async fn put(
        &self,
        name: &str,
        payload: &str,
        available_at: DateTime<Utc>,
    ) -> Result<JobId, OutboxError> {
        (**self).put(name, payload, available_at).await
    }
}

/// Worker pool over a [`JobStore`].
///
/// Workers share no in-memory state; the store's claim operation is the only
/// coordination point, so any number of engine instances can run against the
/// same store.
pub struct OutboxEngine<S, T> {
    store: S,
    transactor: T,
    registry: Arc<JobRegistry>,
    config: OutboxConfig,
}

impl<S, T> OutboxEngine<S, T>
where
    S: JobStore + Clone + Send + Sync + 'static,
    T: Transactor + Clone + Send + Sync + 'static,
{
    pub fn new(
        store: S,
        transactor: T,
        registry: JobRegistry,
        config: OutboxConfig,
    ) -> Result<Self, OutboxError> {
        config.validate()?;
        Ok(Self {
            store,
            transactor,
            registry: Arc::new(registry),
            config,
        })
    }

    /// Run `workers` worker tasks until `cancel` fires.
    ///
    /// Returns Ok on clean cancellation; each in-flight handler gets to
    /// finish within its own deadline first.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), OutboxError> {
        info!(workers = self.config.workers, "starting outbox workers");

        let mut tasks = JoinSet::new();
        for worker_id in 0..self.config.workers {
            let worker = Worker {
                store: self.store.clone(),
                transactor: self.transactor.clone(),
                registry: self.registry.clone(),
                idle_time: self.config.idle_time,
                reserve_for: self.config.reserve_for,
                worker_id,
            };
            let cancel = cancel.clone();
            tasks.spawn(async move { worker.run(cancel).await });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "outbox worker aborted");
            }
        }

        info!("outbox workers stopped");
        Ok(())
    }
}

#[async_trait]
impl<S, T> EnqueueJob for OutboxEngine<S, T>
where
    S: JobStore + Clone + Send + Sync + 'static,
    T: Transactor + Clone + Send + Sync + 'static,
{
    async fn put(
        &self,
        name: &str,
        payload: &str,
        available_at: DateTime<Utc>,
    ) -> Result<JobId, OutboxError> {
        let id = self.store.create_job(name, payload, available_at).await?;
        debug!(job_id = %id, job = name, "job enqueued");
        Ok(id)
    }
}

struct Worker<S, T> {
    store: S,
    transactor: T,
    registry: Arc<JobRegistry>,
    idle_time: Duration,
    reserve_for: Duration,
    worker_id: usize,
}

impl<S, T> Worker<S, T>
where
    S: JobStore + Clone + Send + Sync + 'static,
    T: Transactor + Clone + Send + Sync + 'static,
{
    async fn run(&self, cancel: CancellationToken) {
        debug!(worker_id = self.worker_id, "worker started");

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let until = Utc::now()
                + chrono::Duration::from_std(self.reserve_for).unwrap_or_default();
            match self.store.find_and_reserve(until).await {
                Ok(job) => self.process(job).await,
                Err(JobStoreError::NoJobs) => {
                    if self.idle(&cancel).await {
                        break;
                    }
                }
                Err(e) => {
                    error!(worker_id = self.worker_id, error = %e, "failed to claim a job");
                    if self.idle(&cancel).await {
                        break;
                    }
                }
            }
        }

        debug!(worker_id = self.worker_id, "worker stopped");
    }

    /// Sleep one idle period; true when woken by cancellation.
    async fn idle(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => true,
            _ = tokio::time::sleep(self.idle_time) => false,
        }
    }

    async fn process(&self, job: ReservedJob) {
        debug!(
            worker_id = self.worker_id,
            job_id = %job.id,
            job = %job.name,
            attempts = job.attempts,
            "job claimed"
        );

        let Some(handler) = self.registry.get(&job.name) else {
            warn!(job_id = %job.id, job = %job.name, "no handler registered");
            self.dead_letter(&job, REASON_NOT_REGISTERED).await;
            return;
        };

        if job.attempts > handler.max_attempts() {
            self.dead_letter(&job, REASON_MAX_ATTEMPTS).await;
            return;
        }

        match invoke(handler.clone(), job.payload.clone()).await {
            Ok(()) => {
                if let Err(e) = self.store.delete_job(job.id).await {
                    // The lease still guards the row; the job will be seen
                    // again after expiry and the handler must absorb the
                    // duplicate.
                    error!(job_id = %job.id, error = %e, "failed to delete finished job");
                    return;
                }
                debug!(job_id = %job.id, "job processed");
            }
            Err(e) => {
                warn!(
                    job_id = %job.id,
                    job = %job.name,
                    attempts = job.attempts,
                    error = %e,
                    "job attempt failed"
                );

                // The claim already incremented the counter; once it passes
                // the budget there is no point keeping the job alive.
                if job.attempts > handler.max_attempts() {
                    self.dead_letter(&job, REASON_MAX_ATTEMPTS).await;
                }
                // Otherwise the job stays reserved until its lease expires
                // and is retried by whichever worker claims it next.
            }
        }
    }

    /// Record the failure and drop the job, atomically.
    async fn dead_letter(&self, job: &ReservedJob, reason: &str) {
        let store = self.store.clone();
        let doomed = job.clone();
        let reason_owned = reason.to_string();

        let result = self
            .transactor
            .run_in_tx(Box::new(move || {
                async move {
                    store
                        .create_failed_job(&doomed.name, &doomed.payload, &reason_owned)
                        .await?;
                    store.delete_job(doomed.id).await?;
                    Ok(())
                }
                .boxed()
            }))
            .await;

        match result {
            Ok(()) => warn!(job_id = %job.id, job = %job.name, reason, "job dead-lettered"),
            // The job stays claimable after lease expiry and will be
            // dead-lettered by a later worker.
            Err(e) => error!(job_id = %job.id, error = %e, "failed to dead-letter job"),
        }
    }
}

/// Run the handler under its deadline, isolating panics.
async fn invoke(handler: Arc<dyn JobHandler>, payload: String) -> anyhow::Result<()> {
    let timeout = handler.execution_timeout();
    let mut task = tokio::spawn(async move { handler.handle(&payload).await });

    match tokio::time::timeout(timeout, &mut task).await {
        Err(_) => {
            task.abort();
            Err(anyhow::anyhow!("execution timeout {timeout:?} exceeded"))
        }
        Ok(Err(join_err)) => Err(anyhow::anyhow!("handler crashed: {join_err}")),
        Ok(Ok(result)) => result,
    }
}
