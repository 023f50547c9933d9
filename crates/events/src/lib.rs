//! Realtime events pushed to connected clients and managers.
//!
//! Events are produced by outbox job handlers after a state change has been
//! made durable; the websocket transport (out of scope here) drains
//! per-user subscriptions. Delivery is at-least-once from the consumer's
//! point of view: handlers that publish may be retried.

pub mod event;
pub mod in_memory;
pub mod stream;

pub use event::Event;
pub use in_memory::InMemoryEventStream;
pub use stream::{EventStream, EventStreamError, EventSubscription};
