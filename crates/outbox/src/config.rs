//! Engine knobs.

use std::time::Duration;

use crate::error::OutboxError;

/// Outbox engine configuration.
#[derive(Debug, Clone)]
pub struct OutboxConfig {
    /// Number of concurrent worker tasks.
    pub workers: usize,
    /// Sleep between polls when the queue is empty (backpressure knob).
    pub idle_time: Duration,
    /// Length of the lease taken on a claimed job.
    pub reserve_for: Duration,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            idle_time: Duration::from_secs(1),
            reserve_for: Duration::from_secs(30),
        }
    }
}

impl OutboxConfig {
    pub fn validate(&self) -> Result<(), OutboxError> {
        if !(1..=32).contains(&self.workers) {
            return Err(OutboxError::Config(format!(
                "workers must be in 1..=32, got {}",
                self.workers
            )));
        }
        if self.idle_time < Duration::from_millis(100) || self.idle_time > Duration::from_secs(10) {
            return Err(OutboxError::Config(format!(
                "idle_time must be in 100ms..=10s, got {:?}",
                self.idle_time
            )));
        }
        if self.reserve_for < Duration::from_secs(1) || self.reserve_for > Duration::from_secs(600)
        {
            return Err(OutboxError::Config(format!(
                "reserve_for must be in 1s..=10m, got {:?}",
                self.reserve_for
            )));
        }
        Ok(())
    }
}
