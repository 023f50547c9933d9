//! Storage seams of the chat backend.
//!
//! Every store is a narrow async trait; the production implementations live
//! behind these seams (a relational database, externally owned). This crate
//! ships [`InMemoryStore`], a single structure implementing all of them over
//! one mutex, as the reference/dev/test backend.

pub mod chats;
pub mod jobs;
pub mod memory;
pub mod messages;
pub mod problems;
pub mod transactor;

pub use chats::{Chat, ChatsStore, ChatsStoreError};
pub use jobs::{FailedJob, JobStore, JobStoreError, ReservedJob};
pub use memory::InMemoryStore;
pub use messages::{Message, MessagesStore, MessagesStoreError};
pub use problems::{Problem, ProblemsStore, ProblemsStoreError};
pub use transactor::{Transactor, TxFuture, TxUnit};
