//! Chats storage seam.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use chatdesk_core::{ChatId, UserId};

/// A chat: one per client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub client_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Error)]
pub enum ChatsStoreError {
    #[error("storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait ChatsStore: Send + Sync {
    /// Return the client's chat, creating it if none exists.
    async fn ensure_chat(&self, client_id: UserId) -> Result<ChatId, ChatsStoreError>;
}

#[async_trait]
impl<T> ChatsStore for Arc<T>
where
    T: ChatsStore + ?Sized,
{
    async fn ensure_chat(&self, client_id: UserId) -> Result<ChatId, ChatsStoreError> {
        (**self).ensure_chat(client_id).await
    }
}
