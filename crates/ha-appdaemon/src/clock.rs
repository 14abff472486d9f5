//! Virtual wall clock
//!
//! The host never reads the system clock. Time only moves when the runtime
//! advances it, which makes scenario replay deterministic.

use chrono::NaiveDateTime;
use std::sync::{Arc, PoisonError, RwLock};

/// A settable clock shared between the runtime and the service handlers
#[derive(Debug, Clone)]
pub struct VirtualClock {
    current: Arc<RwLock<NaiveDateTime>>,
}

impl VirtualClock {
    pub fn at(time: NaiveDateTime) -> Self {
        Self {
            current: Arc::new(RwLock::new(time)),
        }
    }

    pub fn now(&self) -> NaiveDateTime {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move to `time`; the clock never goes backwards
    pub fn set(&self, time: NaiveDateTime) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if time > *current {
            *current = time;
        }
    }
}
