//! Event History Implementation

use crate::StorageError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, info};

/// Default number of events kept
pub const DEFAULT_CAPACITY: usize = 20;

/// A received alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: String,
    pub event: String,
    pub location: String,
    /// Snapshot file name under the snapshot directory, if one was stored
    pub filename: Option<String>,
}

/// Bounded event history, newest first.
///
/// Insert and truncate happen under one lock, so concurrent submissions
/// never lose updates or overshoot the capacity.
pub struct EventStore {
    events: Mutex<VecDeque<EventRecord>>,
    capacity: usize,
}

impl EventStore {
    /// Create an empty store holding at most `capacity` events
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        info!("Creating event store (capacity {})", capacity);
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity + 1)),
            capacity,
        }
    }

    /// Insert at the front, evicting the oldest entries beyond capacity
    pub fn insert(&self, record: EventRecord) -> Result<(), StorageError> {
        let mut events = self
            .events
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;

        events.push_front(record);
        events.truncate(self.capacity);
        debug!("Event stored ({} held)", events.len());
        Ok(())
    }

    /// Snapshot of the history, newest first
    pub fn list(&self) -> Result<Vec<EventRecord>, StorageError> {
        let events = self
            .events
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;

        Ok(events.iter().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
