//! In-memory event stream for tests/dev.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use chatdesk_core::UserId;

use crate::event::Event;
use crate::stream::{EventStream, EventStreamError, EventSubscription};

const DEFAULT_BUFFER: usize = 128;

/// In-memory per-user fan-out.
///
/// Dead subscriptions are pruned on publish. The subscriber lock is never
/// held across a channel send.
#[derive(Debug)]
pub struct InMemoryEventStream {
    subscribers: Mutex<HashMap<UserId, Vec<mpsc::Sender<Event>>>>,
    buffer: usize,
}

impl InMemoryEventStream {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_BUFFER)
    }

    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            buffer,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, Vec<mpsc::Sender<Event>>>> {
        self.subscribers.lock().expect("subscriber mutex poisoned")
    }
}

impl Default for InMemoryEventStream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStream for InMemoryEventStream {
    async fn publish(&self, user_id: UserId, event: Event) -> Result<(), EventStreamError> {
        event.validate()?;

        let senders = self.lock().get(&user_id).cloned().unwrap_or_default();
        if senders.is_empty() {
            return Ok(());
        }

        let mut saw_dead = false;
        for sender in &senders {
            if sender.send(event.clone()).await.is_err() {
                saw_dead = true;
            }
        }

        if saw_dead {
            let mut subs = self.lock();
            if let Some(list) = subs.get_mut(&user_id) {
                list.retain(|tx| !tx.is_closed());
                if list.is_empty() {
                    subs.remove(&user_id);
                }
            }
        }

        Ok(())
    }

    async fn subscribe(&self, user_id: UserId) -> Result<EventSubscription, EventStreamError> {
        let (tx, rx) = mpsc::channel(self.buffer);
        self.lock().entry(user_id).or_default().push(tx);
        Ok(EventSubscription::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use chatdesk_core::{EventId, MessageId, RequestId};

    use super::*;

    fn sent_event() -> Event {
        Event::MessageSent {
            event_id: EventId::new(),
            request_id: RequestId::new(),
            message_id: MessageId::new(),
        }
    }

    #[tokio::test]
    async fn events_arrive_in_publication_order() {
        let stream = InMemoryEventStream::new();
        let user = UserId::new();
        let mut sub = stream.subscribe(user).await.unwrap();

        let first = sent_event();
        let second = sent_event();
        stream.publish(user, first.clone()).await.unwrap();
        stream.publish(user, second.clone()).await.unwrap();

        assert_eq!(sub.recv().await.unwrap(), first);
        assert_eq!(sub.recv().await.unwrap(), second);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_a_no_op() {
        let stream = InMemoryEventStream::new();
        stream.publish(UserId::new(), sent_event()).await.unwrap();
    }

    #[tokio::test]
    async fn users_only_see_their_own_events() {
        let stream = InMemoryEventStream::new();
        let alice = UserId::new();
        let bob = UserId::new();

        let mut alice_sub = stream.subscribe(alice).await.unwrap();
        let mut bob_sub = stream.subscribe(bob).await.unwrap();

        stream.publish(alice, sent_event()).await.unwrap();

        assert!(alice_sub.recv().await.is_some());
        assert!(bob_sub.try_recv().is_err());
    }

    #[tokio::test]
    async fn invalid_events_are_rejected_before_delivery() {
        let stream = InMemoryEventStream::new();
        let user = UserId::new();
        let mut sub = stream.subscribe(user).await.unwrap();

        let bad = Event::MessageSent {
            event_id: EventId::from_uuid(uuid::Uuid::nil()),
            request_id: RequestId::new(),
            message_id: MessageId::new(),
        };
        assert!(stream.publish(user, bad).await.is_err());
        assert!(sub.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_subscriptions_are_pruned_on_publish() {
        let stream = InMemoryEventStream::new();
        let user = UserId::new();

        let sub = stream.subscribe(user).await.unwrap();
        drop(sub);

        stream.publish(user, sent_event()).await.unwrap();
        assert!(stream.lock().get(&user).is_none());
    }
}
