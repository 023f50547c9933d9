//! Outbox job storage seam.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use chatdesk_core::JobId;

/// A job claimed by a worker: the row as of the moment the reservation won.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedJob {
    pub id: JobId,
    pub name: String,
    pub payload: String,
    /// Attempt counter *after* the claim incremented it.
    pub attempts: u32,
}

/// A permanently failed job, moved out of the active queue for inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedJob {
    pub id: JobId,
    pub name: String,
    pub payload: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Error)]
pub enum JobStoreError {
    /// Nothing eligible to reserve. Normal idle signal, not a failure.
    #[error("no jobs to reserve")]
    NoJobs,

    #[error("job not found: {0}")]
    NotFound(JobId),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Durable queue of deferred work.
///
/// `find_and_reserve` is the mutual-exclusion primitive: it must atomically
/// pick one eligible job (`available_at <= now`, lease expired), advance its
/// lease to `until` and increment its attempt counter. On SQL this is a
/// select-for-update-skip-locked or a conditional `UPDATE .. RETURNING`;
/// in memory it is a mutation under the store mutex.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(
        &self,
        name: &str,
        payload: &str,
        available_at: DateTime<Utc>,
    ) -> Result<JobId, JobStoreError>;

    /// Claim the oldest eligible job, extending its lease to `until`.
    ///
    /// Returns [`JobStoreError::NoJobs`] when nothing is eligible.
    async fn find_and_reserve(&self, until: DateTime<Utc>) -> Result<ReservedJob, JobStoreError>;

    async fn create_failed_job(
        &self,
        name: &str,
        payload: &str,
        reason: &str,
    ) -> Result<(), JobStoreError>;

    async fn delete_job(&self, id: JobId) -> Result<(), JobStoreError>;
}

#[async_trait]
impl<T> JobStore for Arc<T>
where
    T: JobStore + ?Sized,
{
    async fn create_job(
        &self,
        name: &str,
        payload: &str,
        available_at: DateTime<Utc>,
    ) -> Result<JobId, JobStoreError> {
        (**self).create_job(name, payload, available_at).await
    }

    async fn find_and_reserve(&self, until: DateTime<Utc>) -> Result<ReservedJob, JobStoreError> {
        (**self).find_and_reserve(until).await
    }

    async fn create_failed_job(
        &self,
        name: &str,
        payload: &str,
        reason: &str,
    ) -> Result<(), JobStoreError> {
        (**self).create_failed_job(name, payload, reason).await
    }

    async fn delete_job(&self, id: JobId) -> Result<(), JobStoreError> {
        (**self).delete_job(id).await
    }
}
