//! Concrete outbox jobs.
//!
//! Each module owns one handler plus the (un)marshalling of its payload;
//! the store never learns the payload shape.

pub mod client_message_blocked;
pub mod client_message_sent;
pub mod manager_assigned_to_problem;
pub mod send_client_message;
