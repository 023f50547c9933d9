//! In-memory reference store for tests/dev.
//!
//! One structure implements every storage seam plus [`Transactor`] over a
//! single mutex, so cross-table reads (pending problems need message
//! visibility) stay consistent. The lock is held only for the duration of a
//! table mutation, never across I/O.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use chatdesk_core::{ChatId, JobId, MessageId, ProblemId, RequestId, UserId};

use crate::chats::{Chat, ChatsStore, ChatsStoreError};
use crate::jobs::{FailedJob, JobStore, JobStoreError, ReservedJob};
use crate::messages::{Message, MessagesStore, MessagesStoreError};
use crate::problems::{Problem, ProblemsStore, ProblemsStoreError};
use crate::transactor::{Transactor, TxUnit};

#[derive(Debug, Clone)]
struct JobRow {
    id: JobId,
    name: String,
    payload: String,
    attempts: u32,
    available_at: DateTime<Utc>,
    reserved_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl JobRow {
    fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        self.available_at <= now && self.reserved_until.is_none_or(|until| until < now)
    }
}

#[derive(Debug, Default)]
struct State {
    jobs: HashMap<JobId, JobRow>,
    failed_jobs: Vec<FailedJob>,
    chats: HashMap<ChatId, Chat>,
    problems: HashMap<ProblemId, Problem>,
    messages: Vec<Message>,
}

/// In-memory backend implementing all store traits.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("store mutex poisoned")
    }

    /// Active job count (test/introspection helper).
    pub fn jobs_len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn failed_jobs(&self) -> Vec<FailedJob> {
        self.lock().failed_jobs.clone()
    }

    /// Snapshot of a job's attempt counter and lease, if the job is still live.
    pub fn job_state(&self, id: JobId) -> Option<(u32, Option<DateTime<Utc>>)> {
        self.lock()
            .jobs
            .get(&id)
            .map(|j| (j.attempts, j.reserved_until))
    }

    pub fn messages_in_chat(&self, chat_id: ChatId) -> Vec<Message> {
        self.lock()
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl JobStore for InMemoryStore {
    async fn create_job(
        &self,
        name: &str,
        payload: &str,
        available_at: DateTime<Utc>,
    ) -> Result<JobId, JobStoreError> {
        let mut state = self.lock();
        let id = JobId::new();
        state.jobs.insert(
            id,
            JobRow {
                id,
                name: name.to_string(),
                payload: payload.to_string(),
                attempts: 0,
                available_at,
                reserved_until: None,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }

    async fn find_and_reserve(&self, until: DateTime<Utc>) -> Result<ReservedJob, JobStoreError> {
        let mut state = self.lock();
        let now = Utc::now();

        // Oldest eligible first; the mutex plays the role of the row lock.
        let id = state
            .jobs
            .values()
            .filter(|j| j.is_claimable(now))
            .min_by_key(|j| (j.created_at, j.id))
            .map(|j| j.id)
            .ok_or(JobStoreError::NoJobs)?;

        let job = state.jobs.get_mut(&id).ok_or(JobStoreError::NoJobs)?;
        job.attempts += 1;
        job.reserved_until = Some(until);

        Ok(ReservedJob {
            id: job.id,
            name: job.name.clone(),
            payload: job.payload.clone(),
            attempts: job.attempts,
        })
    }

    async fn create_failed_job(
        &self,
        name: &str,
        payload: &str,
        reason: &str,
    ) -> Result<(), JobStoreError> {
        let mut state = self.lock();
        state.failed_jobs.push(FailedJob {
            id: JobId::new(),
            name: name.to_string(),
            payload: payload.to_string(),
            reason: reason.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn delete_job(&self, id: JobId) -> Result<(), JobStoreError> {
        let mut state = self.lock();
        state
            .jobs
            .remove(&id)
            .map(|_| ())
            .ok_or(JobStoreError::NotFound(id))
    }
}

#[async_trait]
impl ChatsStore for InMemoryStore {
    async fn ensure_chat(&self, client_id: UserId) -> Result<ChatId, ChatsStoreError> {
        let mut state = self.lock();
        if let Some(chat) = state.chats.values().find(|c| c.client_id == client_id) {
            return Ok(chat.id);
        }

        let id = ChatId::new();
        state.chats.insert(
            id,
            Chat {
                id,
                client_id,
                created_at: Utc::now(),
            },
        );
        Ok(id)
    }
}

#[async_trait]
impl ProblemsStore for InMemoryStore {
    async fn create_if_not_exists(&self, chat_id: ChatId) -> Result<ProblemId, ProblemsStoreError> {
        let mut state = self.lock();
        if let Some(p) = state
            .problems
            .values()
            .find(|p| p.chat_id == chat_id && p.resolved_at.is_none())
        {
            return Ok(p.id);
        }

        let id = ProblemId::new();
        state.problems.insert(
            id,
            Problem {
                id,
                chat_id,
                manager_id: None,
                created_at: Utc::now(),
                resolved_at: None,
            },
        );
        Ok(id)
    }

    async fn get(&self, problem_id: ProblemId) -> Result<Problem, ProblemsStoreError> {
        self.lock()
            .problems
            .get(&problem_id)
            .cloned()
            .ok_or(ProblemsStoreError::NotFound(problem_id))
    }

    async fn list_pending(&self) -> Result<Vec<Problem>, ProblemsStoreError> {
        let state = self.lock();
        let mut pending: Vec<Problem> = state
            .problems
            .values()
            .filter(|p| {
                p.manager_id.is_none()
                    && p.resolved_at.is_none()
                    && state
                        .messages
                        .iter()
                        .any(|m| m.chat_id == p.chat_id && m.is_visible_for_manager)
            })
            .cloned()
            .collect();

        pending.sort_by_key(|p| (p.created_at, p.id));
        Ok(pending)
    }

    async fn set_manager(
        &self,
        problem_id: ProblemId,
        manager_id: UserId,
    ) -> Result<(), ProblemsStoreError> {
        let mut state = self.lock();
        let problem = state
            .problems
            .get_mut(&problem_id)
            .ok_or(ProblemsStoreError::NotFound(problem_id))?;
        problem.manager_id = Some(manager_id);
        Ok(())
    }

    async fn manager_open_problems_count(
        &self,
        manager_id: UserId,
    ) -> Result<usize, ProblemsStoreError> {
        Ok(self
            .lock()
            .problems
            .values()
            .filter(|p| p.manager_id == Some(manager_id) && p.resolved_at.is_none())
            .count())
    }

    async fn get_client(&self, problem_id: ProblemId) -> Result<UserId, ProblemsStoreError> {
        let state = self.lock();
        let problem = state
            .problems
            .get(&problem_id)
            .ok_or(ProblemsStoreError::NotFound(problem_id))?;
        state
            .chats
            .get(&problem.chat_id)
            .map(|c| c.client_id)
            .ok_or_else(|| ProblemsStoreError::Storage(format!("chat missing: {}", problem.chat_id)))
    }

    async fn get_request_id(&self, problem_id: ProblemId) -> Result<RequestId, ProblemsStoreError> {
        let state = self.lock();
        let problem = state
            .problems
            .get(&problem_id)
            .ok_or(ProblemsStoreError::NotFound(problem_id))?;
        state
            .messages
            .iter()
            .rev()
            .find(|m| m.chat_id == problem.chat_id)
            .map(|m| m.request_id)
            .ok_or_else(|| {
                ProblemsStoreError::Storage(format!("chat has no messages: {}", problem.chat_id))
            })
    }

    async fn resolve(&self, problem_id: ProblemId) -> Result<(), ProblemsStoreError> {
        let mut state = self.lock();
        let problem = state
            .problems
            .get_mut(&problem_id)
            .ok_or(ProblemsStoreError::NotFound(problem_id))?;
        problem.resolved_at = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl MessagesStore for InMemoryStore {
    async fn get_message(&self, id: MessageId) -> Result<Message, MessagesStoreError> {
        self.lock()
            .messages
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or(MessagesStoreError::NotFound(id))
    }

    async fn mark_visible_for_manager(&self, id: MessageId) -> Result<(), MessagesStoreError> {
        let mut state = self.lock();
        let msg = state
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(MessagesStoreError::NotFound(id))?;
        msg.is_visible_for_manager = true;
        Ok(())
    }

    async fn block_message(&self, id: MessageId) -> Result<(), MessagesStoreError> {
        let mut state = self.lock();
        let msg = state
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(MessagesStoreError::NotFound(id))?;
        msg.is_blocked = true;
        Ok(())
    }

    async fn create_client_visible(
        &self,
        request_id: RequestId,
        problem_id: ProblemId,
        chat_id: ChatId,
        author_id: UserId,
        body: &str,
    ) -> Result<Message, MessagesStoreError> {
        let mut state = self.lock();
        // Repeated requests return the already-stored message.
        if let Some(msg) = state
            .messages
            .iter()
            .find(|m| m.request_id == request_id && !m.is_service)
        {
            return Ok(msg.clone());
        }

        let msg = Message {
            id: MessageId::new(),
            chat_id,
            problem_id,
            author_id: Some(author_id),
            request_id,
            body: body.to_string(),
            created_at: Utc::now(),
            is_visible_for_client: true,
            is_visible_for_manager: false,
            is_blocked: false,
            is_service: false,
        };
        state.messages.push(msg.clone());
        Ok(msg)
    }

    async fn create_service_message(
        &self,
        request_id: RequestId,
        problem_id: ProblemId,
        chat_id: ChatId,
        body: &str,
    ) -> Result<Message, MessagesStoreError> {
        let mut state = self.lock();
        // One service message per triggering request, so retried jobs
        // don't spam the chat.
        if let Some(msg) = state
            .messages
            .iter()
            .find(|m| m.request_id == request_id && m.is_service)
        {
            return Ok(msg.clone());
        }

        let msg = Message {
            id: MessageId::new(),
            chat_id,
            problem_id,
            author_id: None,
            request_id,
            body: body.to_string(),
            created_at: Utc::now(),
            is_visible_for_client: true,
            is_visible_for_manager: false,
            is_blocked: false,
            is_service: true,
        };
        state.messages.push(msg.clone());
        Ok(msg)
    }
}

#[async_trait]
impl Transactor for InMemoryStore {
    /// Executes the unit directly. Atomicity across the enclosed writes is a
    /// property of the production (SQL) transactor; tests drive the failure
    /// paths with a rejecting transactor instead.
    async fn run_in_tx(&self, unit: TxUnit) -> anyhow::Result<()> {
        unit().await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use futures::FutureExt;

    use super::*;

    #[tokio::test]
    async fn create_and_reserve_picks_oldest_first() {
        let store = InMemoryStore::new();
        let now = Utc::now();

        let first = store.create_job("a", "1", now).await.unwrap();
        let second = store.create_job("a", "2", now).await.unwrap();

        let reserved = store
            .find_and_reserve(now + Duration::seconds(5))
            .await
            .unwrap();
        assert_eq!(reserved.id, first);
        assert_eq!(reserved.attempts, 1);

        let reserved = store
            .find_and_reserve(now + Duration::seconds(5))
            .await
            .unwrap();
        assert_eq!(reserved.id, second);
    }

    #[tokio::test]
    async fn reserved_job_is_invisible_until_lease_expires() {
        let store = InMemoryStore::new();
        let now = Utc::now();

        store.create_job("a", "1", now).await.unwrap();
        store
            .find_and_reserve(now + Duration::seconds(30))
            .await
            .unwrap();

        assert!(matches!(
            store.find_and_reserve(now + Duration::seconds(30)).await,
            Err(JobStoreError::NoJobs)
        ));
    }

    #[tokio::test]
    async fn expired_lease_makes_job_claimable_again() {
        let store = InMemoryStore::new();
        let now = Utc::now();

        let id = store.create_job("a", "1", now).await.unwrap();
        store
            .find_and_reserve(now - Duration::seconds(1))
            .await
            .unwrap();

        let reclaimed = store
            .find_and_reserve(now + Duration::seconds(30))
            .await
            .unwrap();
        assert_eq!(reclaimed.id, id);
        assert_eq!(reclaimed.attempts, 2);
    }

    #[tokio::test]
    async fn future_available_at_defers_the_job() {
        let store = InMemoryStore::new();
        let now = Utc::now();

        store
            .create_job("a", "1", now + Duration::seconds(60))
            .await
            .unwrap();

        assert!(matches!(
            store.find_and_reserve(now + Duration::seconds(5)).await,
            Err(JobStoreError::NoJobs)
        ));
    }

    #[tokio::test]
    async fn pending_problems_require_a_manager_visible_message() {
        let store = InMemoryStore::new();

        let chat = store.ensure_chat(UserId::new()).await.unwrap();
        let problem = store.create_if_not_exists(chat).await.unwrap();

        assert!(store.list_pending().await.unwrap().is_empty());

        let msg = store
            .create_client_visible(RequestId::new(), problem, chat, UserId::new(), "help")
            .await
            .unwrap();
        assert!(store.list_pending().await.unwrap().is_empty());

        store.mark_visible_for_manager(msg.id).await.unwrap();
        let pending = store.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, problem);
    }

    #[tokio::test]
    async fn assigned_or_resolved_problems_are_not_pending() {
        let store = InMemoryStore::new();

        let chat = store.ensure_chat(UserId::new()).await.unwrap();
        let problem = store.create_if_not_exists(chat).await.unwrap();
        let msg = store
            .create_client_visible(RequestId::new(), problem, chat, UserId::new(), "help")
            .await
            .unwrap();
        store.mark_visible_for_manager(msg.id).await.unwrap();

        store.set_manager(problem, UserId::new()).await.unwrap();
        assert!(store.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn open_problem_count_follows_assignment_and_resolution() {
        let store = InMemoryStore::new();
        let manager = UserId::new();

        let chat = store.ensure_chat(UserId::new()).await.unwrap();
        let problem = store.create_if_not_exists(chat).await.unwrap();
        assert_eq!(store.manager_open_problems_count(manager).await.unwrap(), 0);

        store.set_manager(problem, manager).await.unwrap();
        assert_eq!(store.manager_open_problems_count(manager).await.unwrap(), 1);

        store.resolve(problem).await.unwrap();
        assert_eq!(store.manager_open_problems_count(manager).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn client_visible_create_is_idempotent_on_request_id() {
        let store = InMemoryStore::new();
        let request = RequestId::new();

        let chat = store.ensure_chat(UserId::new()).await.unwrap();
        let problem = store.create_if_not_exists(chat).await.unwrap();

        let a = store
            .create_client_visible(request, problem, chat, UserId::new(), "hi")
            .await
            .unwrap();
        let b = store
            .create_client_visible(request, problem, chat, UserId::new(), "hi again")
            .await
            .unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(store.messages_in_chat(chat).len(), 1);
    }

    #[tokio::test]
    async fn in_memory_transactor_runs_the_unit() {
        let store = InMemoryStore::arc();

        let jobs = store.clone();
        store
            .run_in_tx(Box::new(move || {
                async move {
                    jobs.create_failed_job("j", "p", "why").await?;
                    Ok(())
                }
                .boxed()
            }))
            .await
            .unwrap();

        assert_eq!(store.failed_jobs().len(), 1);
    }
}
