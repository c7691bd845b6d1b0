//! In-flight balance refreshes of stored rows.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

/// Counts running refreshes per row id.
///
/// Two refreshes of the same row may overlap; the row reads as idle only
/// after both have finished.
#[derive(Debug, Clone, Default)]
pub struct RefreshTracker {
    in_flight: Arc<Mutex<HashMap<String, usize>>>,
}

impl RefreshTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as refreshing until the returned guard is dropped.
    pub fn begin(&self, id: &str) -> RefreshGuard {
        *self.in_flight.lock().entry(id.to_string()).or_insert(0) += 1;
        RefreshGuard {
            tracker: self.clone(),
            id: id.to_string(),
        }
    }

    pub fn state(&self, id: &str) -> RefreshState {
        if self.in_flight.lock().contains_key(id) {
            RefreshState::Refreshing
        } else {
            RefreshState::Idle
        }
    }

    pub fn is_refreshing(&self, id: &str) -> bool {
        self.state(id) == RefreshState::Refreshing
    }

    fn finish(&self, id: &str) {
        let mut in_flight = self.in_flight.lock();
        if let Some(count) = in_flight.get_mut(id) {
            *count -= 1;
            if *count == 0 {
                in_flight.remove(id);
            }
        }
    }
}

pub struct RefreshGuard {
    tracker: RefreshTracker,
    id: String,
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.tracker.finish(&self.id);
    }
}
