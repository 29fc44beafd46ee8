//! fairlane — a fair, admission-controlled executor pool.
//!
//! A fixed set of executor slots consumes work from per-tenant FIFO
//! queues under strict round-robin fairness. Admission control decides
//! per submission whether a task starts immediately, waits in its
//! tenant's queue, or is rejected outright — rejection, not unbounded
//! queueing, is the backpressure mechanism.
//!
//! The payload is opaque: plug in a [`TaskExecutor`] and submit work
//! through [`Pool::submit`], which hands back an awaitable
//! [`TaskHandle`].

pub mod config;
pub mod executor;
pub mod pool;
pub mod queues;
pub mod slots;
pub mod stats;

pub use config::PoolConfig;
pub use executor::TaskExecutor;
pub use pool::Pool;
pub use stats::PoolStatus;

pub use fairlane_core::{
    FairlaneError, TaskFailure, TaskHandle, TaskId, TaskResult, TenantId,
};
