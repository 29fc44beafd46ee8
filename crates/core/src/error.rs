use thiserror::Error;

use crate::task::TenantId;

/// Errors surfaced synchronously by the pool's submission and config paths.
///
/// Failures of the task payload itself travel through the result handle
/// instead — see [`crate::outcome::TaskFailure`].
#[derive(Debug, Error)]
pub enum FairlaneError {
    /// Capacity exhausted at submission time: no idle slot and the global
    /// queue is full. The task was never enqueued and never runs.
    #[error("submission rejected: {queued} tasks queued, capacity {capacity}")]
    RejectedAdmission { queued: usize, capacity: usize },

    /// The submitted tenant is not part of the pool's fixed tenant order.
    #[error("unknown tenant: {0}")]
    UnknownTenant(TenantId),

    /// The pool no longer accepts submissions.
    #[error("pool is shutting down")]
    ShuttingDown,

    #[error("config error: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),
}
