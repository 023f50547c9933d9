//! Outbound chat-message producer.
//!
//! Serializes chat messages for the downstream pipeline (fraud check and
//! beyond), optionally seals them with AES-256-GCM, and hands the bytes to a
//! broker writer. The broker itself is externally owned; only the writer
//! seam lives here.

pub mod in_memory;
pub mod message;
pub mod producer;

pub use in_memory::InMemoryBrokerWriter;
pub use message::OutboundMessage;
pub use producer::{BrokerWriter, MessageProducer, Producer, ProducerError};
