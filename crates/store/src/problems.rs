//! Problems storage seam.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use chatdesk_core::{ChatId, ProblemId, RequestId, UserId};

/// A client problem: one open support case per chat at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: ProblemId,
    pub chat_id: ChatId,
    pub manager_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Problem {
    /// Open = not yet resolved (assigned or not).
    pub fn is_open(&self) -> bool {
        self.resolved_at.is_none()
    }
}

#[derive(Debug, Clone, Error)]
pub enum ProblemsStoreError {
    #[error("problem not found: {0}")]
    NotFound(ProblemId),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Problems store. Sole writer of `Problem::manager_id`.
#[async_trait]
pub trait ProblemsStore: Send + Sync {
    /// Return the open problem of the chat, creating one if none exists.
    async fn create_if_not_exists(&self, chat_id: ChatId) -> Result<ProblemId, ProblemsStoreError>;

    async fn get(&self, problem_id: ProblemId) -> Result<Problem, ProblemsStoreError>;

    /// All problems waiting for a manager, oldest first.
    ///
    /// A problem is pending iff it has no manager, is unresolved, and its
    /// chat holds at least one manager-visible message. Problems whose chat
    /// has nothing a manager could read are invisible here even though they
    /// are unassigned.
    async fn list_pending(&self) -> Result<Vec<Problem>, ProblemsStoreError>;

    async fn set_manager(
        &self,
        problem_id: ProblemId,
        manager_id: UserId,
    ) -> Result<(), ProblemsStoreError>;

    /// Number of open problems currently assigned to the manager.
    async fn manager_open_problems_count(
        &self,
        manager_id: UserId,
    ) -> Result<usize, ProblemsStoreError>;

    /// Client owning the chat this problem belongs to.
    async fn get_client(&self, problem_id: ProblemId) -> Result<UserId, ProblemsStoreError>;

    /// Request id of the latest message in the problem's chat.
    async fn get_request_id(&self, problem_id: ProblemId) -> Result<RequestId, ProblemsStoreError>;

    async fn resolve(&self, problem_id: ProblemId) -> Result<(), ProblemsStoreError>;
}

#[async_trait]
impl<T> ProblemsStore for Arc<T>
where
    T: ProblemsStore + ?Sized,
{
    async fn create_if_not_exists(&self, chat_id: ChatId) -> Result<ProblemId, ProblemsStoreError> {
        (**self).create_if_not_exists(chat_id).await
    }

    async fn get(&self, problem_id: ProblemId) -> Result<Problem, ProblemsStoreError> {
        (**self).get(problem_id).await
    }

    async fn list_pending(&self) -> Result<Vec<Problem>, ProblemsStoreError> {
        (**self).list_pending().await
    }

    async fn set_manager(
        &self,
        problem_id: ProblemId,
        manager_id: UserId,
    ) -> Result<(), ProblemsStoreError> {
        (**self).set_manager(problem_id, manager_id).await
    }

    async fn manager_open_problems_count(
        &self,
        manager_id: UserId,
    ) -> Result<usize, ProblemsStoreError> {
        (**self).manager_open_problems_count(manager_id).await
    }

    async fn get_client(&self, problem_id: ProblemId) -> Result<UserId, ProblemsStoreError> {
        (**self).get_client(problem_id).await
    }

    async fn get_request_id(&self, problem_id: ProblemId) -> Result<RequestId, ProblemsStoreError> {
        (**self).get_request_id(problem_id).await
    }

    async fn resolve(&self, problem_id: ProblemId) -> Result<(), ProblemsStoreError> {
        (**self).resolve(problem_id).await
    }
}
