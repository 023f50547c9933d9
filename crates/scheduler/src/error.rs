//! Scheduler error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Invalid configuration. Startup error, never runtime.
    #[error("invalid scheduler config: {0}")]
    Config(String),
}
