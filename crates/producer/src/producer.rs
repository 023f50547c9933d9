//! Producer service: encode, seal, write.

use std::sync::Arc;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::Aes256Gcm;
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::message::{OutboundMessage, TransportMessage};

#[derive(Debug, Error)]
pub enum ProducerError {
    /// The encryption key is not valid hex for a 256-bit key.
    #[error("invalid encrypt key: {0}")]
    InvalidKey(String),

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to seal message")]
    Seal,

    #[error("failed to write message: {0}")]
    Write(String),
}

/// Writer seam towards the externally-owned broker.
///
/// `key` routes all messages of one chat to the same partition.
#[async_trait]
pub trait BrokerWriter: Send + Sync {
    async fn write(&self, key: &[u8], payload: Vec<u8>) -> Result<(), ProducerError>;
}

#[async_trait]
impl<W> BrokerWriter for Arc<W>
where
    W: BrokerWriter + ?Sized,
{
    async fn write(&self, key: &[u8], payload: Vec<u8>) -> Result<(), ProducerError> {
        (**self).write(key, payload).await
    }
}

/// Capability consumed by job handlers.
#[async_trait]
pub trait MessageProducer: Send + Sync {
    async fn produce(&self, message: OutboundMessage) -> Result<(), ProducerError>;
}

#[async_trait]
impl<P> MessageProducer for Arc<P>
where
    P: MessageProducer + ?Sized,
{
    async fn produce(&self, message: OutboundMessage) -> Result<(), ProducerError> {
        (**self).produce(message).await
    }
}

/// JSON-encodes messages, optionally seals them, and writes keyed by chat id.
pub struct Producer<W> {
    writer: W,
    cipher: Option<Aes256Gcm>,
}

impl<W> Producer<W> {
    /// `encrypt_key`: hex-encoded 256-bit key; `None` sends plaintext.
    pub fn new(writer: W, encrypt_key: Option<&str>) -> Result<Self, ProducerError> {
        let cipher = match encrypt_key {
            None => None,
            Some(key_hex) => {
                let key = hex::decode(key_hex)
                    .map_err(|e| ProducerError::InvalidKey(e.to_string()))?;
                let cipher = Aes256Gcm::new_from_slice(&key)
                    .map_err(|e| ProducerError::InvalidKey(e.to_string()))?;
                Some(cipher)
            }
        };

        Ok(Self { writer, cipher })
    }

    /// Seal `plaintext`, prepending the random nonce to the ciphertext.
    fn seal(&self, plaintext: Vec<u8>) -> Result<Vec<u8>, ProducerError> {
        match &self.cipher {
            None => Ok(plaintext),
            Some(cipher) => {
                let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
                let ciphertext = cipher
                    .encrypt(&nonce, plaintext.as_ref())
                    .map_err(|_| ProducerError::Seal)?;

                let mut sealed = nonce.to_vec();
                sealed.extend_from_slice(&ciphertext);
                Ok(sealed)
            }
        }
    }
}

#[async_trait]
impl<W> MessageProducer for Producer<W>
where
    W: BrokerWriter,
{
    async fn produce(&self, message: OutboundMessage) -> Result<(), ProducerError> {
        let key = message.chat_id.to_string();
        let encoded = serde_json::to_vec(&TransportMessage::from(message.clone()))?;
        let payload = self.seal(encoded)?;

        self.writer.write(key.as_bytes(), payload).await?;
        debug!(message = %message, "message produced");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use aes_gcm::Nonce;

    use chatdesk_core::{ChatId, MessageId};

    use crate::in_memory::InMemoryBrokerWriter;

    use super::*;

    const KEY_HEX: &str = "51655468576d5a7134743777217a25432a462d4a614e645267556b5870327335";

    fn message() -> OutboundMessage {
        OutboundMessage {
            id: MessageId::new(),
            chat_id: ChatId::new(),
            body: "hello there".to_string(),
            from_client: true,
        }
    }

    #[tokio::test]
    async fn plaintext_messages_are_camel_case_json() {
        let writer = Arc::new(InMemoryBrokerWriter::new());
        let producer = Producer::new(writer.clone(), None).unwrap();

        let msg = message();
        producer.produce(msg.clone()).await.unwrap();

        let written = writer.written();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, msg.chat_id.to_string().into_bytes());

        let json: serde_json::Value = serde_json::from_slice(&written[0].1).unwrap();
        assert_eq!(json["chatId"], msg.chat_id.to_string());
        assert_eq!(json["body"], "hello there");
        assert_eq!(json["fromClient"], true);
    }

    #[tokio::test]
    async fn sealed_messages_decrypt_with_the_same_key() {
        let writer = Arc::new(InMemoryBrokerWriter::new());
        let producer = Producer::new(writer.clone(), Some(KEY_HEX)).unwrap();

        let msg = message();
        producer.produce(msg.clone()).await.unwrap();

        let payload = &writer.written()[0].1;
        let (nonce, ciphertext) = payload.split_at(12);

        let cipher = Aes256Gcm::new_from_slice(&hex::decode(KEY_HEX).unwrap()).unwrap();
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .unwrap();

        let json: serde_json::Value = serde_json::from_slice(&plaintext).unwrap();
        assert_eq!(json["id"], msg.id.to_string());
    }

    #[test]
    fn bad_keys_are_rejected_at_construction() {
        let writer = InMemoryBrokerWriter::new();
        assert!(matches!(
            Producer::new(writer, Some("not-hex")),
            Err(ProducerError::InvalidKey(_))
        ));

        let writer = InMemoryBrokerWriter::new();
        assert!(matches!(
            Producer::new(writer, Some("deadbeef")), // too short
            Err(ProducerError::InvalidKey(_))
        ));
    }
}
