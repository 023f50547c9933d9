//! Manager-facing use-cases over the pool and the load check.

pub mod can_receive_problems;
pub mod free_hands;
