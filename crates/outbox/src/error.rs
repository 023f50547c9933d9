//! Outbox error taxonomy.

use thiserror::Error;

use chatdesk_store::JobStoreError;

#[derive(Debug, Error)]
pub enum OutboxError {
    /// A handler name was bound twice. Startup configuration error.
    #[error("job already registered: {0}")]
    JobAlreadyRegistered(String),

    /// Invalid engine configuration.
    #[error("invalid outbox config: {0}")]
    Config(String),

    /// Storage failure surfaced by `put` (workers retry theirs internally).
    #[error(transparent)]
    Store(#[from] JobStoreError),
}
