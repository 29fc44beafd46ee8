//! The pluggable execution seam between the pool and the work it runs.

use async_trait::async_trait;

/// Runs task payloads on behalf of the pool.
///
/// The pool is indifferent to what the payload means — hashing a string,
/// filtering an image, a training step. Implementations must run to
/// completion and report the outcome through the return value:
///
/// - `Ok(output)` is delivered to the submitter as a success.
/// - `Err(e)` is delivered as a failure; the pool and its other slots
///   are unaffected.
/// - A panic inside `execute` is contained by the pool, reported as a
///   failure, and the slot returns to service.
///
/// `execute` may take unboundedly long; it is the only part of the system
/// that genuinely runs in parallel. One executor instance is shared by
/// all slots, so implementations must be safe to call concurrently.
#[async_trait]
pub trait TaskExecutor: Send + Sync + 'static {
    /// Opaque work descriptor, interpreted entirely by the implementation.
    type Payload: Send + 'static;

    /// Success value delivered back to the submitter.
    type Output: Send + 'static;

    async fn execute(&self, payload: Self::Payload) -> anyhow::Result<Self::Output>;
}
