use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::outcome::ResultSink;

/// Unique identifier assigned to every submitted task.
pub type TaskId = Uuid;

/// Fairness partition key: a named share of the pool's capacity.
///
/// Each tenant gets its own FIFO queue and one turn per round-robin cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One admitted unit of work, owned by exactly one place at a time:
/// a tenant queue (between admission and dispatch) or the executor slot
/// running it. Consumed when its outcome is delivered.
///
/// Lifecycle: `Submitted → Rejected` (terminal), or
/// `Submitted → [Queued →] Running → Completed` with either a success or
/// a failure outcome. A task never returns to the queue once it has
/// started running.
pub struct Task<P, T> {
    pub id: TaskId,
    pub tenant: TenantId,
    pub payload: P,
    /// When the submission was accepted.
    pub enqueued_at: DateTime<Utc>,
    /// Write-once completion target for this task's outcome.
    pub sink: ResultSink<T>,
}

impl<P, T> Task<P, T> {
    pub fn new(tenant: TenantId, payload: P, sink: ResultSink<T>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant,
            payload,
            enqueued_at: Utc::now(),
            sink,
        }
    }
}

impl<P, T> fmt::Debug for Task<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("tenant", &self.tenant)
            .field("enqueued_at", &self.enqueued_at)
            .finish_non_exhaustive()
    }
}
