//! Job handler contract and the handler registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::OutboxError;

pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// A unit of deferred work, registered under a unique name.
///
/// Delivery is at-least-once: the same payload may be handled again after a
/// worker crash or a missed delete, so the side effect must be safe to
/// repeat or detectable as already done.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Registry key. Must be stable; it is persisted with every job row.
    fn name(&self) -> &'static str;

    async fn handle(&self, payload: &str) -> anyhow::Result<()>;

    /// Deadline for a single `handle` call. Exceeding it fails the attempt.
    fn execution_timeout(&self) -> Duration {
        DEFAULT_EXECUTION_TIMEOUT
    }

    /// Attempt budget; a job claimed more often than this is dead-lettered.
    fn max_attempts(&self) -> u32 {
        DEFAULT_MAX_ATTEMPTS
    }
}

/// Immutable name → handler table, built once at startup.
#[derive(Default)]
pub struct JobRegistry {
    handlers: HashMap<&'static str, Arc<dyn JobHandler>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a handler under its declared name.
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) -> Result<(), OutboxError> {
        let name = handler.name();
        if self.handlers.contains_key(name) {
            return Err(OutboxError::JobAlreadyRegistered(name.to_string()));
        }
        self.handlers.insert(name, handler);
        Ok(())
    }

    pub(crate) fn get(&self, name: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopJob;

    #[async_trait]
    impl JobHandler for NoopJob {
        fn name(&self) -> &'static str {
            "noop"
        }

        async fn handle(&self, _payload: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = JobRegistry::new();
        registry.register(Arc::new(NoopJob)).unwrap();

        assert!(matches!(
            registry.register(Arc::new(NoopJob)),
            Err(OutboxError::JobAlreadyRegistered(name)) if name == "noop"
        ));
    }

    #[test]
    fn lookup_by_name() {
        let mut registry = JobRegistry::new();
        registry.register(Arc::new(NoopJob)).unwrap();

        assert!(registry.get("noop").is_some());
        assert!(registry.get("other").is_none());
    }

    #[test]
    fn contract_defaults_apply() {
        let job = NoopJob;
        assert_eq!(job.execution_timeout(), DEFAULT_EXECUTION_TIMEOUT);
        assert_eq!(job.max_attempts(), DEFAULT_MAX_ATTEMPTS);
    }
}
