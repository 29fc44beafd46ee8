//! Per-tenant FIFO queues plus the round-robin cursor.
//!
//! This is the fairness core: one `VecDeque` per tenant in a fixed order,
//! and a cursor that advances once per tenant considered. No tenant is
//! served twice before every other tenant with pending work is served
//! once, and a tenant with a persistently non-empty queue is served at
//! least once per full cycle.

use std::collections::{BTreeMap, HashMap, VecDeque};

use fairlane_core::{Task, TenantId};

/// The tenant queue set and scheduler cursor, owned by the pool's
/// coordinator. Never exposed to callers directly.
pub struct TenantQueues<P, T> {
    /// Fixed round-robin order, set at construction.
    tenant_order: Vec<TenantId>,
    queues: HashMap<TenantId, VecDeque<Task<P, T>>>,
    /// Next position in `tenant_order` to consider. Always a valid index.
    next_index: usize,
    /// Tasks across all queues; bounded by the pool's queue capacity.
    total_queued: usize,
}

impl<P, T> TenantQueues<P, T> {
    pub fn new(tenant_order: Vec<TenantId>) -> Self {
        let queues = tenant_order
            .iter()
            .cloned()
            .map(|t| (t, VecDeque::new()))
            .collect();
        Self {
            tenant_order,
            queues,
            next_index: 0,
            total_queued: 0,
        }
    }

    pub fn contains_tenant(&self, tenant: &TenantId) -> bool {
        self.queues.contains_key(tenant)
    }

    pub fn total_queued(&self) -> usize {
        self.total_queued
    }

    /// Append to the task's tenant queue. Capacity is the caller's
    /// responsibility (checked at admission, under the same lock).
    pub fn push(&mut self, task: Task<P, T>) {
        let queue = self
            .queues
            .get_mut(&task.tenant)
            .expect("tenant validated at admission");
        queue.push_back(task);
        self.total_queued += 1;
    }

    /// Round-robin selection of the next task to dispatch.
    ///
    /// Starting at the cursor, scans at most one full cycle of tenants,
    /// advancing the cursor past each tenant considered *before* looking
    /// at the next one. The first non-empty queue yields its head and the
    /// scan stops there. A full empty cycle returns `None` — the cursor
    /// has still moved, so the next dispatch does not restart at a fixed
    /// position.
    pub fn pick_next(&mut self) -> Option<Task<P, T>> {
        for _ in 0..self.tenant_order.len() {
            let tenant = self.tenant_order[self.next_index].clone();
            self.next_index = (self.next_index + 1) % self.tenant_order.len();

            if let Some(task) = self.queues.get_mut(&tenant).and_then(VecDeque::pop_front) {
                self.total_queued -= 1;
                return Some(task);
            }
        }
        None
    }

    /// Current queue depth per tenant, in a stable order for status output.
    pub fn lengths_by_tenant(&self) -> BTreeMap<String, usize> {
        self.tenant_order
            .iter()
            .map(|t| (t.to_string(), self.queues[t].len()))
            .collect()
    }

    /// Remove and return every queued task (abort-style shutdown).
    pub fn drain_all(&mut self) -> Vec<Task<P, T>> {
        let mut drained = Vec::with_capacity(self.total_queued);
        for tenant in &self.tenant_order {
            if let Some(queue) = self.queues.get_mut(tenant) {
                drained.extend(queue.drain(..));
            }
        }
        self.total_queued = 0;
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairlane_core::completion_channel;

    fn order(names: &[&str]) -> Vec<TenantId> {
        names.iter().map(|n| TenantId::from(*n)).collect()
    }

    fn task(tenant: &str, payload: u32) -> Task<u32, ()> {
        let (sink, _rx) = completion_channel();
        Task::new(TenantId::from(tenant), payload, sink)
    }

    #[test]
    fn fifo_within_one_tenant() {
        let mut queues = TenantQueues::new(order(&["a"]));
        queues.push(task("a", 1));
        queues.push(task("a", 2));
        queues.push(task("a", 3));

        assert_eq!(queues.pick_next().unwrap().payload, 1);
        assert_eq!(queues.pick_next().unwrap().payload, 2);
        assert_eq!(queues.pick_next().unwrap().payload, 3);
        assert!(queues.pick_next().is_none());
    }

    #[test]
    fn strict_round_robin_across_tenants() {
        let mut queues = TenantQueues::new(order(&["a", "b", "c"]));
        // Two tasks per tenant, pushed tenant-by-tenant.
        for tenant in ["a", "b", "c"] {
            queues.push(task(tenant, 1));
            queues.push(task(tenant, 2));
        }

        let picked: Vec<String> = (0..6)
            .map(|_| queues.pick_next().unwrap().tenant.to_string())
            .collect();
        assert_eq!(picked, ["a", "b", "c", "a", "b", "c"]);
    }

    #[test]
    fn cursor_resumes_after_served_tenant() {
        let mut queues = TenantQueues::new(order(&["a", "b", "c"]));
        queues.push(task("a", 1));
        assert_eq!(queues.pick_next().unwrap().tenant.to_string(), "a");

        // Cursor now sits at "b": with both a and b pending, b goes first.
        queues.push(task("a", 2));
        queues.push(task("b", 1));
        assert_eq!(queues.pick_next().unwrap().tenant.to_string(), "b");
        assert_eq!(queues.pick_next().unwrap().tenant.to_string(), "a");
    }

    #[test]
    fn skips_empty_tenants_in_cycle_order() {
        let mut queues = TenantQueues::new(order(&["a", "b", "c"]));
        queues.push(task("c", 1));
        assert_eq!(queues.pick_next().unwrap().tenant.to_string(), "c");
        assert!(queues.pick_next().is_none());
    }

    #[test]
    fn queue_length_does_not_bias_selection() {
        let mut queues = TenantQueues::new(order(&["a", "b"]));
        for i in 0..10 {
            queues.push(task("a", i));
        }
        queues.push(task("b", 0));

        // Fairness is per-tenant-turn: b still gets its turn second,
        // regardless of a's backlog.
        assert_eq!(queues.pick_next().unwrap().tenant.to_string(), "a");
        assert_eq!(queues.pick_next().unwrap().tenant.to_string(), "b");
        assert_eq!(queues.pick_next().unwrap().tenant.to_string(), "a");
    }

    #[test]
    fn total_queued_tracks_push_and_pop() {
        let mut queues = TenantQueues::new(order(&["a", "b"]));
        assert_eq!(queues.total_queued(), 0);
        queues.push(task("a", 1));
        queues.push(task("b", 2));
        assert_eq!(queues.total_queued(), 2);
        queues.pick_next();
        assert_eq!(queues.total_queued(), 1);
    }

    #[test]
    fn lengths_by_tenant_reports_all_tenants() {
        let mut queues = TenantQueues::new(order(&["a", "b"]));
        queues.push(task("a", 1));
        let lengths = queues.lengths_by_tenant();
        assert_eq!(lengths["a"], 1);
        assert_eq!(lengths["b"], 0);
    }

    #[test]
    fn drain_all_empties_every_queue() {
        let mut queues = TenantQueues::new(order(&["a", "b"]));
        queues.push(task("a", 1));
        queues.push(task("b", 2));
        queues.push(task("a", 3));

        let drained = queues.drain_all();
        assert_eq!(drained.len(), 3);
        assert_eq!(queues.total_queued(), 0);
        assert!(queues.pick_next().is_none());
    }
}
