//! The executor slot table: fixed-size occupancy bookkeeping.

use fairlane_core::TaskId;
use tokio::task::JoinHandle;

/// Index of one executor slot, `0..pool_size`.
pub type SlotId = usize;

#[derive(Debug, Default)]
struct Slot {
    /// Task currently running on this slot, if any.
    current: Option<TaskId>,
    /// Join handle of the slot's worker task, kept so a non-drain
    /// shutdown can abort in-flight work.
    handle: Option<JoinHandle<()>>,
}

/// Fixed-size table of executor slots, owned by the pool's coordinator.
///
/// A slot runs at most one task at a time; `current` is set on dispatch
/// and cleared on completion, always under the coordinator's lock.
pub struct SlotTable {
    slots: Vec<Slot>,
}

impl SlotTable {
    pub fn new(size: usize) -> Self {
        let mut slots = Vec::with_capacity(size);
        slots.resize_with(size, Slot::default);
        Self { slots }
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots currently running a task.
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|s| s.current.is_some()).count()
    }

    /// First idle slot, if any. Does not mark it busy — callers follow up
    /// with [`SlotTable::occupy`] inside the same critical section.
    pub fn acquire(&self) -> Option<SlotId> {
        self.slots.iter().position(|s| s.current.is_none())
    }

    /// Mark a slot busy with the given task.
    pub fn occupy(&mut self, slot: SlotId, task: TaskId) {
        debug_assert!(self.slots[slot].current.is_none(), "slot already busy");
        self.slots[slot].current = Some(task);
    }

    /// Attach the worker join handle after spawning. The handle survives
    /// across back-to-back tasks on the same slot.
    pub fn set_handle(&mut self, slot: SlotId, handle: JoinHandle<()>) {
        self.slots[slot].handle = Some(handle);
    }

    /// Clear a slot's running task after completion.
    pub fn release(&mut self, slot: SlotId) {
        self.slots[slot].current = None;
    }

    /// Drop the worker handle once the slot's worker loop has exited.
    pub fn clear_handle(&mut self, slot: SlotId) {
        self.slots[slot].handle = None;
    }

    /// Abort every live worker task and mark all slots idle.
    pub fn abort_all(&mut self) {
        for slot in &mut self.slots {
            if let Some(handle) = slot.handle.take() {
                handle.abort();
            }
            slot.current = None;
        }
    }
}
