//! Messages storage seam.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use chatdesk_core::{ChatId, MessageId, ProblemId, RequestId, UserId};

/// A chat message with its moderation/visibility flags.
///
/// Service messages (`is_service`) are emitted by the system itself and have
/// no author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub problem_id: ProblemId,
    pub author_id: Option<UserId>,
    pub request_id: RequestId,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub is_visible_for_client: bool,
    pub is_visible_for_manager: bool,
    pub is_blocked: bool,
    pub is_service: bool,
}

#[derive(Debug, Clone, Error)]
pub enum MessagesStoreError {
    #[error("message not found: {0}")]
    NotFound(MessageId),

    #[error("storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait MessagesStore: Send + Sync {
    async fn get_message(&self, id: MessageId) -> Result<Message, MessagesStoreError>;

    /// Flip the message to manager-visible (fraud check passed).
    async fn mark_visible_for_manager(&self, id: MessageId) -> Result<(), MessagesStoreError>;

    /// Mark the message blocked (fraud check rejected it).
    async fn block_message(&self, id: MessageId) -> Result<(), MessagesStoreError>;

    /// Create a client-authored message, visible to the client only until
    /// the fraud check clears it. Idempotent on `request_id`.
    async fn create_client_visible(
        &self,
        request_id: RequestId,
        problem_id: ProblemId,
        chat_id: ChatId,
        author_id: UserId,
        body: &str,
    ) -> Result<Message, MessagesStoreError>;

    /// Create an authorless service message in the chat. Idempotent on
    /// `request_id`.
    async fn create_service_message(
        &self,
        request_id: RequestId,
        problem_id: ProblemId,
        chat_id: ChatId,
        body: &str,
    ) -> Result<Message, MessagesStoreError>;
}

#[async_trait]
impl<T> MessagesStore for Arc<T>
where
    T: MessagesStore + ?Sized,
{
    async fn get_message(&self, id: MessageId) -> Result<Message, MessagesStoreError> {
        (**self).get_message(id).await
    }

    async fn mark_visible_for_manager(&self, id: MessageId) -> Result<(), MessagesStoreError> {
        (**self).mark_visible_for_manager(id).await
    }

    async fn block_message(&self, id: MessageId) -> Result<(), MessagesStoreError> {
        (**self).block_message(id).await
    }

    async fn create_client_visible(
        &self,
        request_id: RequestId,
        problem_id: ProblemId,
        chat_id: ChatId,
        author_id: UserId,
        body: &str,
    ) -> Result<Message, MessagesStoreError> {
        (**self)
            .create_client_visible(request_id, problem_id, chat_id, author_id, body)
            .await
    }

    async fn create_service_message(
        &self,
        request_id: RequestId,
        problem_id: ProblemId,
        chat_id: ChatId,
        body: &str,
    ) -> Result<Message, MessagesStoreError> {
        (**self)
            .create_service_message(request_id, problem_id, chat_id, body)
            .await
    }
}
