//! Event publishing/subscription abstraction.
//!
//! The stream is addressed per user: publishing targets one user id, and a
//! subscription yields that user's events in publication order over a
//! bounded channel. The bus carries no history: events are born from
//! durable state (outbox jobs), so a reconnecting consumer re-reads state
//! instead of replaying the stream.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::Receiver;

use chatdesk_core::{DomainError, UserId};

use crate::event::Event;

#[derive(Debug, Error)]
pub enum EventStreamError {
    #[error("invalid event: {0}")]
    InvalidEvent(#[from] DomainError),

    #[error("stream closed")]
    Closed,
}

/// A bounded, ordered stream of one user's events.
#[derive(Debug)]
pub struct EventSubscription {
    receiver: Receiver<Event>,
}

impl EventSubscription {
    pub fn new(receiver: Receiver<Event>) -> Self {
        Self { receiver }
    }

    /// Next event, or `None` once the stream is closed.
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Result<Event, tokio::sync::mpsc::error::TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Per-user event fan-out.
#[async_trait]
pub trait EventStream: Send + Sync {
    /// Deliver `event` to every live subscription of `user_id`.
    ///
    /// Publishing to a user with no subscribers is a successful no-op.
    async fn publish(&self, user_id: UserId, event: Event) -> Result<(), EventStreamError>;

    async fn subscribe(&self, user_id: UserId) -> Result<EventSubscription, EventStreamError>;
}

#[async_trait]
impl<T> EventStream for Arc<T>
where
    T: EventStream + ?Sized,
{
    async fn publish(&self, user_id: UserId, event: Event) -> Result<(), EventStreamError> {
        (**self).publish(user_id, event).await
    }

    async fn subscribe(&self, user_id: UserId) -> Result<EventSubscription, EventStreamError> {
        (**self).subscribe(user_id).await
    }
}
