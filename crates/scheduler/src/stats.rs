//! Submission counters and the read-only status snapshot.

use std::collections::BTreeMap;

use serde::Serialize;

/// Monotonic counters, bumped under the coordinator lock. Every
/// submission increments `submitted` plus exactly one of
/// `dispatched_immediately`, `enqueued`, or `rejected`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Counters {
    pub submitted: u64,
    pub dispatched_immediately: u64,
    pub enqueued: u64,
    pub rejected: u64,
    /// Settled tasks, successes and failures alike.
    pub completed: u64,
    /// Subset of `completed` that settled with a failure.
    pub failed: u64,
}

/// Point-in-time snapshot returned by `Pool::status`.
///
/// Strictly read-only: monitoring and visualization consume this, they
/// never mutate scheduler state.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    pub pool_size: usize,
    /// Slots currently running a task.
    pub active_executors: usize,
    /// Admitted tasks waiting across all tenant queues.
    pub total_queued: usize,
    pub queue_lengths_by_tenant: BTreeMap<String, usize>,
    pub total_submitted: u64,
    pub total_dispatched_immediately: u64,
    pub total_enqueued: u64,
    pub total_rejected: u64,
    pub total_completed: u64,
    pub total_failed: u64,
    /// True once shutdown has been requested.
    pub shutting_down: bool,
}
