//! Manager capacity check.

use std::sync::Arc;

use async_trait::async_trait;

use chatdesk_core::UserId;
use chatdesk_store::{ProblemsStore, ProblemsStoreError};

use crate::error::SchedulerError;

/// Capability consumed by the manager-facing use-cases.
#[async_trait]
pub trait ManagerLoad: Send + Sync {
    async fn can_manager_take_problem(
        &self,
        manager_id: UserId,
    ) -> Result<bool, ProblemsStoreError>;
}

#[async_trait]
impl<T> ManagerLoad for Arc<T>
where
    T: ManagerLoad + ?Sized,
{
    async fn can_manager_take_problem(
        &self,
        manager_id: UserId,
    ) -> Result<bool, ProblemsStoreError> {
        (**self).can_manager_take_problem(manager_id).await
    }
}

#[derive(Debug, Clone)]
pub struct ManagerLoadConfig {
    /// How many open problems one manager may hold at a time.
    pub max_problems_at_time: usize,
}

impl Default for ManagerLoadConfig {
    fn default() -> Self {
        Self {
            max_problems_at_time: 5,
        }
    }
}

impl ManagerLoadConfig {
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if !(1..=30).contains(&self.max_problems_at_time) {
            return Err(SchedulerError::Config(format!(
                "max_problems_at_time must be in 1..=30, got {}",
                self.max_problems_at_time
            )));
        }
        Ok(())
    }
}

/// Read-through capacity check against the problems store. No mutation.
pub struct ManagerLoadService<P> {
    problems: P,
    max_problems_at_time: usize,
}

impl<P> ManagerLoadService<P>
where
    P: ProblemsStore,
{
    pub fn new(problems: P, config: ManagerLoadConfig) -> Result<Self, SchedulerError> {
        config.validate()?;
        Ok(Self {
            problems,
            max_problems_at_time: config.max_problems_at_time,
        })
    }
}

#[async_trait]
impl<P> ManagerLoad for ManagerLoadService<P>
where
    P: ProblemsStore,
{
    async fn can_manager_take_problem(
        &self,
        manager_id: UserId,
    ) -> Result<bool, ProblemsStoreError> {
        let count = self
            .problems
            .manager_open_problems_count(manager_id)
            .await?;
        Ok(count < self.max_problems_at_time)
    }
}

#[cfg(test)]
mod tests {
    use chatdesk_store::{ChatsStore, InMemoryStore};

    use super::*;

    #[tokio::test]
    async fn manager_below_the_limit_can_take_problems() {
        let store = InMemoryStore::arc();
        let service = ManagerLoadService::new(
            store.clone(),
            ManagerLoadConfig {
                max_problems_at_time: 2,
            },
        )
        .unwrap();

        let manager = UserId::new();
        assert!(service.can_manager_take_problem(manager).await.unwrap());

        let chat = store.ensure_chat(UserId::new()).await.unwrap();
        let problem = store.create_if_not_exists(chat).await.unwrap();
        store.set_manager(problem, manager).await.unwrap();
        assert!(service.can_manager_take_problem(manager).await.unwrap());

        let chat = store.ensure_chat(UserId::new()).await.unwrap();
        let problem = store.create_if_not_exists(chat).await.unwrap();
        store.set_manager(problem, manager).await.unwrap();
        assert!(!service.can_manager_take_problem(manager).await.unwrap());
    }

    #[tokio::test]
    async fn resolved_problems_free_capacity() {
        let store = InMemoryStore::arc();
        let service = ManagerLoadService::new(
            store.clone(),
            ManagerLoadConfig {
                max_problems_at_time: 1,
            },
        )
        .unwrap();

        let manager = UserId::new();
        let chat = store.ensure_chat(UserId::new()).await.unwrap();
        let problem = store.create_if_not_exists(chat).await.unwrap();
        store.set_manager(problem, manager).await.unwrap();
        assert!(!service.can_manager_take_problem(manager).await.unwrap());

        store.resolve(problem).await.unwrap();
        assert!(service.can_manager_take_problem(manager).await.unwrap());
    }

    #[test]
    fn config_bounds_are_enforced() {
        assert!(ManagerLoadConfig {
            max_problems_at_time: 0
        }
        .validate()
        .is_err());
        assert!(ManagerLoadConfig {
            max_problems_at_time: 31
        }
        .validate()
        .is_err());
        assert!(ManagerLoadConfig::default().validate().is_ok());
    }
}
