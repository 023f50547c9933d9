//! Event shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chatdesk_core::{ChatId, DomainError, EventId, MessageId, RequestId, UserId};

/// A realtime event addressed to a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "camelCase")]
pub enum Event {
    /// A message appeared in one of the user's chats.
    #[serde(rename_all = "camelCase")]
    NewMessage {
        event_id: EventId,
        request_id: RequestId,
        chat_id: ChatId,
        message_id: MessageId,
        /// None for service messages.
        author_id: Option<UserId>,
        created_at: DateTime<Utc>,
        body: String,
        is_service: bool,
    },

    /// The fraud check cleared the user's message; a manager can now see it.
    #[serde(rename_all = "camelCase")]
    MessageSent {
        event_id: EventId,
        request_id: RequestId,
        message_id: MessageId,
    },

    /// The fraud check rejected the user's message.
    #[serde(rename_all = "camelCase")]
    MessageBlocked {
        event_id: EventId,
        request_id: RequestId,
        message_id: MessageId,
    },

    /// A new chat was routed to the manager.
    #[serde(rename_all = "camelCase")]
    NewChat {
        event_id: EventId,
        chat_id: ChatId,
        client_id: UserId,
        request_id: RequestId,
    },
}

impl Event {
    pub fn event_id(&self) -> EventId {
        match self {
            Event::NewMessage { event_id, .. }
            | Event::MessageSent { event_id, .. }
            | Event::MessageBlocked { event_id, .. }
            | Event::NewChat { event_id, .. } => *event_id,
        }
    }

    /// Reject structurally invalid events before they reach a subscriber.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.event_id().is_nil() {
            return Err(DomainError::invalid_id("event id is nil"));
        }

        match self {
            Event::NewMessage {
                request_id,
                chat_id,
                message_id,
                author_id,
                body,
                is_service,
                ..
            } => {
                if request_id.is_nil() || chat_id.is_nil() || message_id.is_nil() {
                    return Err(DomainError::invalid_id("new-message event id is nil"));
                }
                if body.is_empty() {
                    return Err(DomainError::validation("message body is empty"));
                }
                if author_id.is_none() && !is_service {
                    return Err(DomainError::validation(
                        "non-service message without an author",
                    ));
                }
                Ok(())
            }
            Event::MessageSent {
                request_id,
                message_id,
                ..
            }
            | Event::MessageBlocked {
                request_id,
                message_id,
                ..
            } => {
                if request_id.is_nil() || message_id.is_nil() {
                    return Err(DomainError::invalid_id("message event id is nil"));
                }
                Ok(())
            }
            Event::NewChat {
                chat_id,
                client_id,
                request_id,
                ..
            } => {
                if chat_id.is_nil() || client_id.is_nil() || request_id.is_nil() {
                    return Err(DomainError::invalid_id("new-chat event id is nil"));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_events_pass_validation() {
        let event = Event::MessageSent {
            event_id: EventId::new(),
            request_id: RequestId::new(),
            message_id: MessageId::new(),
        };
        assert!(event.validate().is_ok());
    }

    #[test]
    fn nil_ids_are_rejected() {
        let event = Event::MessageSent {
            event_id: EventId::from_uuid(uuid::Uuid::nil()),
            request_id: RequestId::new(),
            message_id: MessageId::new(),
        };
        assert!(event.validate().is_err());
    }

    #[test]
    fn service_messages_need_no_author() {
        let event = Event::NewMessage {
            event_id: EventId::new(),
            request_id: RequestId::new(),
            chat_id: ChatId::new(),
            message_id: MessageId::new(),
            author_id: None,
            created_at: Utc::now(),
            body: "Manager will answer you".to_string(),
            is_service: true,
        };
        assert!(event.validate().is_ok());
    }

    #[test]
    fn authorless_client_messages_are_rejected() {
        let event = Event::NewMessage {
            event_id: EventId::new(),
            request_id: RequestId::new(),
            chat_id: ChatId::new(),
            message_id: MessageId::new(),
            author_id: None,
            created_at: Utc::now(),
            body: "hello".to_string(),
            is_service: false,
        };
        assert!(event.validate().is_err());
    }

    #[test]
    fn events_serialize_with_a_type_tag() {
        let event = Event::NewChat {
            event_id: EventId::new(),
            chat_id: ChatId::new(),
            client_id: UserId::new(),
            request_id: RequestId::new(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["eventType"], "newChat");
        assert!(json["clientId"].is_string());
    }
}
