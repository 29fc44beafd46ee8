//! Write-once completion plumbing between the pool and submitters.
//!
//! A task's outcome is a three-state value: pending while the `oneshot`
//! channel is unresolved, then settled exactly once as either a success
//! value or a [`TaskFailure`]. The sender side is consumed on delivery,
//! so double delivery is unrepresentable.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::task::TaskId;

/// Why a task finished without a success value.
///
/// Rejections never reach this type — they are reported synchronously at
/// submission as [`crate::error::FairlaneError::RejectedAdmission`].
#[derive(Debug, Error)]
pub enum TaskFailure {
    /// The executor's `execute` returned an error. The pool and its other
    /// slots are unaffected.
    #[error("task execution failed: {0}")]
    Execution(anyhow::Error),

    /// The executor panicked while running the payload. The panic is
    /// contained; the slot returns to service.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task was discarded before producing a result (non-drain
    /// shutdown or forced termination). Not requeued, not retried.
    #[error("task aborted before completion")]
    Aborted,
}

/// Settled outcome of one task.
pub type TaskResult<T> = Result<T, TaskFailure>;

/// The pool-side half of a completion channel. Delivering consumes the
/// sink, making a second delivery a compile-time impossibility.
pub struct ResultSink<T>(oneshot::Sender<TaskResult<T>>);

impl<T> ResultSink<T> {
    /// Settle the outcome. If the submitter dropped its handle the value
    /// is discarded silently.
    pub fn deliver(self, result: TaskResult<T>) {
        let _ = self.0.send(result);
    }
}

/// The submitter-side half: the task id plus an awaitable outcome.
#[derive(Debug)]
pub struct TaskHandle<T> {
    pub id: TaskId,
    rx: oneshot::Receiver<TaskResult<T>>,
}

impl<T> TaskHandle<T> {
    pub fn new(id: TaskId, rx: oneshot::Receiver<TaskResult<T>>) -> Self {
        Self { id, rx }
    }

    /// Wait for the task to settle.
    ///
    /// A sink dropped without delivery (aborted slot, pool torn down)
    /// surfaces as [`TaskFailure::Aborted`].
    pub async fn outcome(self) -> TaskResult<T> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(TaskFailure::Aborted),
        }
    }
}

/// Create a linked sink/receiver pair for one task.
pub fn completion_channel<T>() -> (ResultSink<T>, oneshot::Receiver<TaskResult<T>>) {
    let (tx, rx) = oneshot::channel();
    (ResultSink(tx), rx)
}
