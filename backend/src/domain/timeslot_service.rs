//! Time slot registry.
//!
//! An injected, session-owned registry (deliberately not process-global
//! state). Ids come from a monotonically increasing counter starting at
//! 0 and are unique for the life of the registry. Slots are templates:
//! a todo embeds a copy at creation, so removing a slot here never
//! touches existing todos.

use std::sync::Mutex;

use tracing::info;

use shared::TimeSlot;

#[derive(Default)]
struct Inner {
    next_id: i32,
    slots: Vec<TimeSlot>,
}

#[derive(Default)]
pub struct TimeSlotRegistry {
    inner: Mutex<Inner>,
}

impl TimeSlotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new slot. Start/end ordering is not validated here.
    pub fn add(&self, start_time: &str, end_time: &str, display_name: &str) -> TimeSlot {
        let mut inner = self.inner.lock().unwrap();
        let slot = TimeSlot {
            id: inner.next_id,
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
            display_name: display_name.to_string(),
        };
        inner.next_id += 1;
        inner.slots.push(slot.clone());

        info!("Registered time slot {} ('{}')", slot.id, slot.display_name);
        slot
    }

    pub fn list(&self) -> Vec<TimeSlot> {
        self.inner.lock().unwrap().slots.clone()
    }

    pub fn get(&self, id: i32) -> Option<TimeSlot> {
        self.inner.lock().unwrap().slots.iter().find(|s| s.id == id).cloned()
    }

    /// Remove a slot by id. Returns whether anything was removed. Never
    /// cascades into todos that embedded a copy of this slot.
    pub fn remove(&self, id: i32) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.slots.len();
        inner.slots.retain(|s| s.id != id);
        let removed = inner.slots.len() != before;
        if removed {
            info!("Removed time slot {}", id);
        }
        removed
    }
}
