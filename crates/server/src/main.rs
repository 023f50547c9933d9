//! Service wiring and lifecycle.
//!
//! Builds the core services over the in-memory reference backend (the
//! production deployment swaps in the SQL-backed stores and the real broker
//! writer) and runs the outbox engine and the manager scheduler until
//! SIGINT.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use chatdesk_events::InMemoryEventStream;
use chatdesk_outbox::jobs::{
    client_message_blocked::ClientMessageBlockedJob, client_message_sent::ClientMessageSentJob,
    manager_assigned_to_problem::ManagerAssignedToProblemJob,
    send_client_message::SendClientMessageJob,
};
use chatdesk_outbox::{JobRegistry, OutboxEngine};
use chatdesk_producer::{InMemoryBrokerWriter, Producer};
use chatdesk_scheduler::{ManagerLoadService, ManagerPool, ManagerScheduler};
use chatdesk_store::InMemoryStore;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("CHATDESK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("chatdesk.toml"));
    let cfg = Config::load(&config_path)?;

    chatdesk_observability::init_with_level(&cfg.log.level);
    info!(config = %config_path.display(), "starting chatdesk");

    let store = InMemoryStore::arc();
    let event_stream = Arc::new(InMemoryEventStream::new());
    let pool = Arc::new(ManagerPool::new());

    warn!("using in-memory reference stores; state will not survive a restart");
    let writer = Arc::new(InMemoryBrokerWriter::new());
    let producer = Arc::new(
        Producer::new(writer, cfg.services.msg_producer.encrypt_key())
            .context("build message producer")?,
    );

    let mut registry = JobRegistry::new();
    registry.register(Arc::new(SendClientMessageJob::new(
        store.clone(),
        producer.clone(),
    )))?;
    registry.register(Arc::new(ClientMessageSentJob::new(
        store.clone(),
        event_stream.clone(),
    )))?;
    registry.register(Arc::new(ClientMessageBlockedJob::new(
        store.clone(),
        event_stream.clone(),
    )))?;
    registry.register(Arc::new(ManagerAssignedToProblemJob::new(
        store.clone(),
        store.clone(),
        producer.clone(),
        event_stream.clone(),
    )))?;

    let engine = Arc::new(OutboxEngine::new(
        store.clone(),
        store.clone(),
        registry,
        (&cfg.services.outbox).into(),
    )?);

    // The load service gates the (externally owned) manager HTTP surface;
    // constructing it here validates its knobs at startup.
    let _manager_load =
        ManagerLoadService::new(store.clone(), (&cfg.services.manager_load).into())?;

    let scheduler = Arc::new(ManagerScheduler::new(
        pool,
        store.clone(),
        store.clone(),
        engine.clone(),
        (&cfg.services.scheduler).into(),
    )?);

    let cancel = CancellationToken::new();

    let engine_cancel = cancel.clone();
    let engine_task = tokio::spawn(async move { engine.run(engine_cancel).await });

    let scheduler_cancel = cancel.clone();
    let scheduler_task = tokio::spawn(async move { scheduler.run(scheduler_cancel).await });

    tokio::signal::ctrl_c().await.context("listen for SIGINT")?;
    info!("shutdown signal received");
    cancel.cancel();

    engine_task.await.context("join outbox engine")??;
    scheduler_task.await.context("join manager scheduler")??;

    info!("chatdesk stopped");
    Ok(())
}
