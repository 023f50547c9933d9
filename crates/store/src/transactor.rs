//! Atomic unit-of-work abstraction.
//!
//! Both the outbox dead-lettering path and the scheduler assignment path
//! need "all-or-nothing" across two store writes. They express the unit as a
//! boxed async closure and hand it to a [`Transactor`]; the production
//! implementation opens a database transaction around it, the in-memory one
//! simply executes it.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

/// Future produced by a unit of work.
pub type TxFuture<'a> = BoxFuture<'a, anyhow::Result<()>>;

/// A unit of work to run atomically.
pub type TxUnit = Box<dyn FnOnce() -> TxFuture<'static> + Send>;

/// Runs a unit of work atomically.
#[async_trait]
pub trait Transactor: Send + Sync {
    async fn run_in_tx(&self, unit: TxUnit) -> anyhow::Result<()>;
}

#[async_trait]
impl<T> Transactor for Arc<T>
where
    T: Transactor + ?Sized,
{
    async fn run_in_tx(&self, unit: TxUnit) -> anyhow::Result<()> {
        (**self).run_in_tx(unit).await
    }
}
