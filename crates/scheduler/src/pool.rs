//! The pool coordinator: admission control, dispatch, completion
//! notification, and shutdown.
//!
//! All scheduling state — tenant queues, round-robin cursor, slot table,
//! counters — lives in one [`Inner`] behind a single mutex. Every
//! mutation goes through the methods here; the containers are never
//! handed out. Payload execution is the only thing that happens outside
//! the lock.

use std::sync::Arc;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use fairlane_core::{completion_channel, FairlaneError, Task, TaskFailure, TaskHandle, TenantId};

use crate::config::PoolConfig;
use crate::executor::TaskExecutor;
use crate::queues::TenantQueues;
use crate::slots::{SlotId, SlotTable};
use crate::stats::{Counters, PoolStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Running,
    /// No new submissions; queued and in-flight tasks run to completion.
    Draining,
    Stopped,
}

struct Inner<P, T> {
    queues: TenantQueues<P, T>,
    slots: SlotTable,
    counters: Counters,
    lifecycle: Lifecycle,
}

/// A fixed-size executor pool with per-tenant FIFO queues, round-robin
/// fairness, and capacity-based admission control.
///
/// `submit` is the only entry point for work; it is non-blocking and
/// returns a [`TaskHandle`] whose outcome resolves asynchronously.
/// Cloning is cheap and shares the same pool.
pub struct Pool<E: TaskExecutor> {
    executor: Arc<E>,
    inner: Arc<Mutex<Inner<E::Payload, E::Output>>>,
    /// Notified whenever the pool may have gone fully idle (drain wakeup).
    idle: Arc<Notify>,
    config: PoolConfig,
}

impl<E: TaskExecutor> Clone for Pool<E> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
            inner: self.inner.clone(),
            idle: self.idle.clone(),
            config: self.config.clone(),
        }
    }
}

impl<E: TaskExecutor> Pool<E> {
    /// Build a pool from a validated config and an executor shared by all
    /// slots. Sizes and tenant order are fixed for the pool's lifetime.
    pub fn new(config: PoolConfig, executor: E) -> Result<Self, FairlaneError> {
        config.validate()?;
        let tenant_order: Vec<TenantId> = config
            .tenants
            .iter()
            .map(|t| TenantId::from(t.as_str()))
            .collect();

        info!(
            pool_size = config.pool_size,
            queue_capacity = config.queue_capacity,
            tenants = ?config.tenants,
            "pool created"
        );

        Ok(Self {
            executor: Arc::new(executor),
            inner: Arc::new(Mutex::new(Inner {
                queues: TenantQueues::new(tenant_order),
                slots: SlotTable::new(config.pool_size),
                counters: Counters::default(),
                lifecycle: Lifecycle::Running,
            })),
            idle: Arc::new(Notify::new()),
            config,
        })
    }

    /// Number of executor slots.
    pub fn size(&self) -> usize {
        self.config.pool_size
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Slots currently running a task.
    pub async fn active_count(&self) -> usize {
        self.inner.lock().await.slots.active_count()
    }

    /// Submit one unit of work under a tenant.
    ///
    /// The admission decision is atomic per submission:
    /// 1. idle slot available → dispatched immediately;
    /// 2. global queue has room → appended to the tenant's FIFO queue;
    /// 3. otherwise → [`FairlaneError::RejectedAdmission`], the task is
    ///    discarded and never runs. No internal retry — rejection is the
    ///    backpressure signal, and resubmission is the caller's call.
    ///
    /// Returns quickly in all cases; the outcome arrives later through
    /// the returned handle.
    pub async fn submit(
        &self,
        tenant: impl Into<TenantId>,
        payload: E::Payload,
    ) -> Result<TaskHandle<E::Output>, FairlaneError> {
        let tenant = tenant.into();
        let mut inner = self.inner.lock().await;

        if inner.lifecycle != Lifecycle::Running {
            return Err(FairlaneError::ShuttingDown);
        }
        if !inner.queues.contains_tenant(&tenant) {
            return Err(FairlaneError::UnknownTenant(tenant));
        }

        inner.counters.submitted += 1;

        if let Some(slot) = inner.slots.acquire() {
            inner.counters.dispatched_immediately += 1;
            let (sink, rx) = completion_channel();
            let task = Task::new(tenant, payload, sink);
            let handle = TaskHandle::new(task.id, rx);
            debug!(task = %task.id, tenant = %task.tenant, slot, "dispatching immediately");
            // Route even the immediate path through the fair scheduler so
            // the cursor advances past the dispatched tenant. An idle slot
            // implies empty queues, so the picked task is the one pushed.
            inner.queues.push(task);
            let next = inner
                .queues
                .pick_next()
                .expect("task was enqueued under the same lock");
            self.start_slot_worker(&mut inner, slot, next);
            return Ok(handle);
        }

        let queued = inner.queues.total_queued();
        if queued < self.config.queue_capacity {
            inner.counters.enqueued += 1;
            let (sink, rx) = completion_channel();
            let task = Task::new(tenant, payload, sink);
            let handle = TaskHandle::new(task.id, rx);
            debug!(task = %task.id, tenant = %task.tenant, depth = queued + 1, "enqueued");
            inner.queues.push(task);
            return Ok(handle);
        }

        inner.counters.rejected += 1;
        warn!(
            tenant = %tenant,
            queued,
            capacity = self.config.queue_capacity,
            "submission rejected"
        );
        Err(FairlaneError::RejectedAdmission {
            queued,
            capacity: self.config.queue_capacity,
        })
    }

    /// Read-only snapshot for monitoring.
    pub async fn status(&self) -> PoolStatus {
        let inner = self.inner.lock().await;
        PoolStatus {
            pool_size: inner.slots.size(),
            active_executors: inner.slots.active_count(),
            total_queued: inner.queues.total_queued(),
            queue_lengths_by_tenant: inner.queues.lengths_by_tenant(),
            total_submitted: inner.counters.submitted,
            total_dispatched_immediately: inner.counters.dispatched_immediately,
            total_enqueued: inner.counters.enqueued,
            total_rejected: inner.counters.rejected,
            total_completed: inner.counters.completed,
            total_failed: inner.counters.failed,
            shutting_down: inner.lifecycle != Lifecycle::Running,
        }
    }

    /// Stop accepting submissions. Idempotent.
    ///
    /// With `drain = true`, in-flight and queued tasks run to completion
    /// (bounded by the configured drain timeout, after which the
    /// remainder is aborted). With `drain = false`, in-flight tasks are
    /// aborted and queued tasks are discarded; affected waiters observe
    /// [`TaskFailure::Aborted`]. Nothing is requeued or retried.
    pub async fn shutdown(&self, drain: bool) {
        if drain {
            self.shutdown_drain().await;
        } else {
            self.abort_remaining().await;
        }
    }

    async fn shutdown_drain(&self) {
        {
            let mut inner = self.inner.lock().await;
            match inner.lifecycle {
                Lifecycle::Running => {
                    inner.lifecycle = Lifecycle::Draining;
                    info!("pool draining, no new submissions accepted");
                }
                // A drain is already underway; wait alongside it.
                Lifecycle::Draining => {}
                Lifecycle::Stopped => return,
            }
        }

        let deadline = self.config.drain_timeout();
        match tokio::time::timeout(deadline, self.wait_idle()).await {
            Ok(()) => {
                let mut inner = self.inner.lock().await;
                // A concurrent non-drain shutdown may have stopped the
                // pool while we waited; the remainder was aborted then,
                // not drained.
                if inner.lifecycle == Lifecycle::Stopped {
                    return;
                }
                inner.lifecycle = Lifecycle::Stopped;
                info!(
                    completed = inner.counters.completed,
                    "pool drained and stopped"
                );
            }
            Err(_) => {
                warn!(timeout = ?deadline, "drain timed out, aborting remaining tasks");
                self.abort_remaining().await;
            }
        }
    }

    /// Wait until no slot is busy and no task is queued.
    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            // Register for wakeups before checking, so a notify between
            // the check and the await is not lost.
            notified.as_mut().enable();

            {
                let inner = self.inner.lock().await;
                if inner.slots.active_count() == 0 && inner.queues.total_queued() == 0 {
                    return;
                }
            }

            notified.await;
        }
    }

    /// Abort in-flight work and discard the queues, delivering `Aborted`
    /// to every queued task's waiter.
    async fn abort_remaining(&self) {
        let mut inner = self.inner.lock().await;
        if inner.lifecycle == Lifecycle::Stopped {
            return;
        }
        inner.lifecycle = Lifecycle::Stopped;
        inner.slots.abort_all();

        let discarded = inner.queues.drain_all();
        let discarded_count = discarded.len();
        for task in discarded {
            task.sink.deliver(Err(TaskFailure::Aborted));
        }
        drop(inner);

        self.idle.notify_waiters();
        info!(discarded = discarded_count, "pool stopped without draining");
    }

    /// Mark the slot busy and spawn its worker loop. Caller holds the
    /// coordinator lock.
    fn start_slot_worker(
        &self,
        inner: &mut Inner<E::Payload, E::Output>,
        slot: SlotId,
        task: Task<E::Payload, E::Output>,
    ) {
        inner.slots.occupy(slot, task.id);
        let handle = tokio::spawn(slot_worker(
            self.executor.clone(),
            self.inner.clone(),
            self.idle.clone(),
            slot,
            task,
        ));
        inner.slots.set_handle(slot, handle);
    }
}

/// Worker loop for one slot: run the dispatched task, deliver its
/// outcome, then keep pulling queued tasks back-to-back until the fair
/// scheduler has nothing left for this slot.
async fn slot_worker<E: TaskExecutor>(
    executor: Arc<E>,
    inner: Arc<Mutex<Inner<E::Payload, E::Output>>>,
    idle: Arc<Notify>,
    slot: SlotId,
    first: Task<E::Payload, E::Output>,
) {
    let mut current = Some(first);

    while let Some(task) = current.take() {
        let Task {
            id, tenant, payload, sink, ..
        } = task;

        let result = run_payload(&executor, payload).await;
        let failed = result.is_err();
        match &result {
            Ok(_) => debug!(task = %id, tenant = %tenant, slot, "task completed"),
            Err(e) => warn!(task = %id, tenant = %tenant, slot, error = %e, "task failed"),
        }

        // Completion frees the slot and immediately consults the fair
        // scheduler, so the pool stays saturated without any external
        // prompting while queued work exists. This happens before the
        // outcome is delivered: a waiter that observes completion sees
        // the slot already freed.
        {
            let mut guard = inner.lock().await;
            guard.counters.completed += 1;
            if failed {
                guard.counters.failed += 1;
            }
            guard.slots.release(slot);

            if guard.lifecycle != Lifecycle::Stopped {
                if let Some(next) = guard.queues.pick_next() {
                    let waited_ms = (chrono::Utc::now() - next.enqueued_at).num_milliseconds();
                    debug!(task = %next.id, tenant = %next.tenant, slot, waited_ms, "dispatching from queue");
                    guard.slots.occupy(slot, next.id);
                    current = Some(next);
                }
            }

            if current.is_none() {
                guard.slots.clear_handle(slot);
                if guard.slots.active_count() == 0 && guard.queues.total_queued() == 0 {
                    idle.notify_waiters();
                }
            }
        }

        // Exactly-once outcome delivery: the sink is consumed here.
        sink.deliver(result);
    }
}

/// Run one payload on its own task so a panic surfaces as a `JoinError`
/// instead of unwinding the slot worker. Dropping the guard aborts the
/// payload, which is how a shutdown abort of the worker reaches the
/// payload itself.
async fn run_payload<E: TaskExecutor>(
    executor: &Arc<E>,
    payload: E::Payload,
) -> Result<E::Output, TaskFailure> {
    let exec = executor.clone();
    let mut guard = AbortOnDrop(tokio::spawn(async move { exec.execute(payload).await }));

    match (&mut guard.0).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(err)) => Err(TaskFailure::Execution(err)),
        Err(join_err) if join_err.is_panic() => {
            let panic = join_err.into_panic();
            let msg = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "opaque panic payload".to_string());
            Err(TaskFailure::Panicked(msg))
        }
        Err(_) => Err(TaskFailure::Aborted),
    }
}

struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl TaskExecutor for Echo {
        type Payload = u32;
        type Output = u32;

        async fn execute(&self, payload: u32) -> anyhow::Result<u32> {
            Ok(payload)
        }
    }

    fn pool(pool_size: usize, queue_capacity: usize) -> Pool<Echo> {
        Pool::new(
            PoolConfig::new(pool_size, queue_capacity, ["a", "b"]),
            Echo,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn submit_unknown_tenant_is_refused() {
        let pool = pool(1, 4);
        let err = pool.submit("nope", 1).await.unwrap_err();
        assert!(matches!(err, FairlaneError::UnknownTenant(_)));

        // Refused submissions are not counted as submitted.
        assert_eq!(pool.status().await.total_submitted, 0);
    }

    #[tokio::test]
    async fn submit_after_shutdown_is_refused() {
        let pool = pool(1, 4);
        pool.shutdown(true).await;
        let err = pool.submit("a", 1).await.unwrap_err();
        assert!(matches!(err, FairlaneError::ShuttingDown));
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_at_construction() {
        let config = PoolConfig::new(0, 4, ["a"]);
        assert!(Pool::new(config, Echo).is_err());
    }

    #[tokio::test]
    async fn immediate_dispatch_completes() {
        let pool = pool(2, 4);
        let handle = pool.submit("a", 41).await.unwrap();
        assert_eq!(handle.outcome().await.unwrap(), 41);

        let status = pool.status().await;
        assert_eq!(status.total_dispatched_immediately, 1);
        assert_eq!(status.total_completed, 1);
        assert_eq!(status.total_failed, 0);
    }

    #[tokio::test]
    async fn execution_error_is_a_failed_outcome() {
        struct Failing;

        #[async_trait]
        impl TaskExecutor for Failing {
            type Payload = ();
            type Output = ();

            async fn execute(&self, _payload: ()) -> anyhow::Result<()> {
                anyhow::bail!("bad payload")
            }
        }

        let pool = Pool::new(PoolConfig::new(1, 0, ["a"]), Failing).unwrap();
        let handle = pool.submit("a", ()).await.unwrap();
        match handle.outcome().await {
            Err(TaskFailure::Execution(e)) => assert_eq!(e.to_string(), "bad payload"),
            other => panic!("unexpected outcome: {other:?}"),
        }

        // The slot is freed and the pool keeps working.
        let handle = pool.submit("a", ()).await.unwrap();
        assert!(handle.outcome().await.is_err());
        let status = pool.status().await;
        assert_eq!(status.total_completed, 2);
        assert_eq!(status.total_failed, 2);
    }

    #[tokio::test]
    async fn panicking_payload_frees_the_slot() {
        struct Panicky;

        #[async_trait]
        impl TaskExecutor for Panicky {
            type Payload = bool;
            type Output = u32;

            async fn execute(&self, explode: bool) -> anyhow::Result<u32> {
                if explode {
                    panic!("kaboom");
                }
                Ok(7)
            }
        }

        let pool = Pool::new(PoolConfig::new(1, 0, ["a"]), Panicky).unwrap();

        let handle = pool.submit("a", true).await.unwrap();
        match handle.outcome().await {
            Err(TaskFailure::Panicked(msg)) => assert_eq!(msg, "kaboom"),
            other => panic!("unexpected outcome: {other:?}"),
        }

        // Policy: the slot returns to service after a crash.
        let handle = pool.submit("a", false).await.unwrap();
        assert_eq!(handle.outcome().await.unwrap(), 7);
    }
}
