//! React to a client message being rejected by the fraud check.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tracing::debug;

use chatdesk_core::{DomainError, EventId, MessageId};
use chatdesk_events::{Event, EventStream};
use chatdesk_store::MessagesStore;

use crate::handler::JobHandler;

pub const NAME: &str = "client-message-blocked";

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

/// Blocks the message and tells its author.
pub struct ClientMessageBlockedJob {
    messages: Arc<dyn MessagesStore>,
    event_stream: Arc<dyn EventStream>,
}

impl ClientMessageBlockedJob {
    pub fn new(messages: Arc<dyn MessagesStore>, event_stream: Arc<dyn EventStream>) -> Self {
        Self {
            messages,
            event_stream,
        }
    }
}

#[async_trait]
impl JobHandler for ClientMessageBlockedJob {
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

        let author = msg
            .author_id
            .ok_or_else(|| anyhow::anyhow!("message {msg_id} has no author"))?;

        self.messages
            .block_message(msg_id)
            .await
            .with_context(|| format!("block message in <{NAME}> job"))?;

        self.event_stream
            .publish(
                author,
                Event::MessageBlocked {
                    event_id: EventId::new(),
                    request_id: msg.request_id,
                    message_id: msg.id,
                },
            )
            .await
            .with_context(|| format!("publish event in <{NAME}> job"))?;

        debug!(message_id = %msg_id, "client message blocked");
        Ok(())
    }
}
