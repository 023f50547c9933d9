//! Outbound message shape and its wire encoding.

use serde::{Deserialize, Serialize};

use chatdesk_core::{ChatId, MessageId};

/// A chat message on its way to the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub body: String,
    /// True for fresh client input that still has to pass the fraud check.
    pub from_client: bool,
}

/// Wire encoding (camelCase JSON).
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransportMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub body: String,
    pub from_client: bool,
}

impl From<OutboundMessage> for TransportMessage {
    fn from(m: OutboundMessage) -> Self {
        Self {
            id: m.id,
            chat_id: m.chat_id,
            body: m.body,
            from_client: m.from_client,
        }
    }
}

impl std::fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Message{{id: {}, chat_id: {}, from_client: {}}}",
            self.id, self.chat_id, self.from_client
        )
    }
}
