//! Per-app queue of scheduled callbacks

use chrono::NaiveDateTime;
use ha_apps::TimerHandle;
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

/// Pending timers ordered by due time, then by scheduling order
pub struct TimerQueue<T> {
    queue: BTreeMap<(NaiveDateTime, u64), T>,
    /// Due time of every pending handle
    index: HashMap<u64, NaiveDateTime>,
    next_id: u64,
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            queue: BTreeMap::new(),
            index: HashMap::new(),
            next_id: 0,
        }
    }

    pub fn schedule(&mut self, due: NaiveDateTime, payload: T) -> TimerHandle {
        self.next_id += 1;
        let id = self.next_id;
        self.queue.insert((due, id), payload);
        self.index.insert(id, due);
        trace!(timer = id, due = %due, "Scheduled timer");
        TimerHandle::new(id)
    }

    /// Remove a pending timer; returns false if it already fired or was cancelled
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.index.remove(&handle.id()) {
            Some(due) => {
                self.queue.remove(&(due, handle.id()));
                trace!(timer = handle.id(), "Cancelled timer");
                true
            }
            None => false,
        }
    }

    pub fn next_due(&self) -> Option<NaiveDateTime> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    /// Take the earliest timer if it is due at `now`
    pub fn pop_due(&mut self, now: NaiveDateTime) -> Option<(TimerHandle, T)> {
        let (&(due, id), _) = self.queue.first_key_value()?;
        if due > now {
            return None;
        }
        let payload = self.queue.remove(&(due, id))?;
        self.index.remove(&id);
        Some((TimerHandle::new(id), payload))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
