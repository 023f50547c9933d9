//! Manager-side scheduling.
//!
//! Managers announce themselves through the pool; a single periodic
//! scheduler matches waiting problems against waiting managers, oldest to
//! oldest, and hands the announcement off to the outbox.

pub mod error;
pub mod load;
pub mod pool;
pub mod scheduler;
pub mod usecases;

pub use error::SchedulerError;
pub use load::{ManagerLoad, ManagerLoadConfig, ManagerLoadService};
pub use pool::{ManagerPool, PoolError};
pub use scheduler::{ManagerScheduler, SchedulerConfig};
pub use usecases::can_receive_problems::CanReceiveProblemsUseCase;
pub use usecases::free_hands::{FreeHandsError, FreeHandsUseCase};
