//! Deliver a client message to the broker.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::debug;

use chatdesk_core::{DomainError, MessageId};
use chatdesk_producer::{MessageProducer, OutboundMessage};
use chatdesk_store::MessagesStore;

use crate::handler::JobHandler;

pub const NAME: &str = "send-client-message";

pub fn marshal_payload(message_id: MessageId) -> Result<String, DomainError> {
    if message_id.is_nil() {
        return Err(DomainError::invalid_id("message id is nil"));
    }
    Ok(message_id.to_string())
}

fn unmarshal_payload(payload: &str) -> Result<MessageId, DomainError> {
    let id: MessageId = payload.parse()?;
    if id.is_nil() {
        return Err(DomainError::invalid_id("message id is nil"));
    }
    Ok(id)
}

pub struct SendClientMessageJob {
    messages: Arc<dyn MessagesStore>,
    producer: Arc<dyn MessageProducer>,
}

impl SendClientMessageJob {
    pub fn new(messages: Arc<dyn MessagesStore>, producer: Arc<dyn MessageProducer>) -> Self {
        Self { messages, producer }
    }
}

#[async_trait]
impl JobHandler for SendClientMessageJob {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn handle(&self, payload: &str) -> anyhow::Result<()> {
        let msg_id = unmarshal_payload(payload)
            .with_context(|| format!("unmarshal payload in <{NAME}> job"))?;

        let msg = self
            .messages
            .get_message(msg_id)
            .await
            .with_context(|| format!("get message in <{NAME}> job"))?;

        let outbound = OutboundMessage {
            id: msg.id,
            chat_id: msg.chat_id,
            body: msg.body,
            from_client: msg.is_visible_for_client
                && !msg.is_service
                && !msg.is_blocked
                && !msg.is_visible_for_manager,
        };

        self.producer
            .produce(outbound)
            .await
            .with_context(|| format!("produce message in <{NAME}> job"))?;

        debug!(message_id = %msg_id, "client message produced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chatdesk_core::{RequestId, UserId};
    use chatdesk_producer::{InMemoryBrokerWriter, Producer};
    use chatdesk_store::{ChatsStore, InMemoryStore, ProblemsStore};

    use super::*;

    #[tokio::test]
    async fn produces_the_message_keyed_by_chat() {
        let store = InMemoryStore::arc();
        let writer = Arc::new(InMemoryBrokerWriter::new());
        let producer = Arc::new(Producer::new(writer.clone(), None).unwrap());

        let client = UserId::new();
        let chat = store.ensure_chat(client).await.unwrap();
        let problem = store.create_if_not_exists(chat).await.unwrap();
        let msg = store
            .create_client_visible(RequestId::new(), problem, chat, client, "hi")
            .await
            .unwrap();

        let job = SendClientMessageJob::new(store.clone(), producer);
        job.handle(&marshal_payload(msg.id).unwrap()).await.unwrap();

        let written = writer.written();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, chat.to_string().into_bytes());

        let json: serde_json::Value = serde_json::from_slice(&written[0].1).unwrap();
        assert_eq!(json["fromClient"], true);
    }

    #[tokio::test]
    async fn service_messages_are_not_from_client() {
        let store = InMemoryStore::arc();
        let writer = Arc::new(InMemoryBrokerWriter::new());
        let producer = Arc::new(Producer::new(writer.clone(), None).unwrap());

        let chat = store.ensure_chat(UserId::new()).await.unwrap();
        let problem = store.create_if_not_exists(chat).await.unwrap();
        let msg = store
            .create_service_message(RequestId::new(), problem, chat, "Manager will answer you")
            .await
            .unwrap();

        let job = SendClientMessageJob::new(store.clone(), producer);
        job.handle(&marshal_payload(msg.id).unwrap()).await.unwrap();

        let json: serde_json::Value = serde_json::from_slice(&writer.written()[0].1).unwrap();
        assert_eq!(json["fromClient"], false);
    }

    #[tokio::test]
    async fn unknown_message_fails_the_attempt() {
        let store = InMemoryStore::arc();
        let writer = Arc::new(InMemoryBrokerWriter::new());
        let producer = Arc::new(Producer::new(writer, None).unwrap());

        let job = SendClientMessageJob::new(store, producer);
        let payload = marshal_payload(MessageId::new()).unwrap();
        assert!(job.handle(&payload).await.is_err());
    }

    #[test]
    fn nil_and_garbage_payloads_are_rejected() {
        assert!(marshal_payload(MessageId::from_uuid(uuid::Uuid::nil())).is_err());
        assert!(unmarshal_payload("garbage").is_err());
    }
}
