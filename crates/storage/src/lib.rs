//! Storage Layer
//!
//! Keeps the collector's recent event history in memory and writes
//! alert snapshots to disk.

mod repository;
mod snapshots;

pub use repository::{EventRecord, EventStore, DEFAULT_CAPACITY};
pub use snapshots::{sanitize_event_kind, snapshot_name, SnapshotStore};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Event store lock poisoned: {0}")]
    Lock(String),
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
}
