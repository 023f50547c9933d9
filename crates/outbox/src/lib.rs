//! Outbox: durable, retryable deferred work.
//!
//! Use-cases enqueue a named job with an opaque payload instead of performing
//! side effects inline; the engine's workers claim jobs under a storage
//! lease, route them to registered handlers and retire them. A job survives
//! crashes, is retried up to its handler's attempt budget and ends up either
//! deleted (success) or dead-lettered, never silently dropped.

pub mod config;
pub mod engine;
pub mod error;
pub mod handler;
pub mod jobs;


pub use config::OutboxConfig;
pub use engine::{EnqueueJob, OutboxEngine};
pub use error::OutboxError;
pub use handler::{JobHandler, JobRegistry, DEFAULT_EXECUTION_TIMEOUT, DEFAULT_MAX_ATTEMPTS};
