//! Alerting System
//!
//! Packages drowsiness events for the remote event collector:
//! wire payload, snapshot throttling, best-effort geolocation and
//! fire-and-forget HTTP delivery.

mod dispatcher;
mod geolocation;
mod payload;
mod throttle;

pub use dispatcher::{
    AlertDispatcher, AlertTransport, DispatchConfig, DrainReport, HttpTransport, SendFuture,
};
pub use geolocation::{
    format_location, location_or_unknown, resolve_location, IpInfo, UNKNOWN_LOCATION,
};
pub use payload::{AlertPayload, DEFAULT_LOCATION, DROWSY_EVENT};
pub use throttle::SnapshotThrottle;

use thiserror::Error;

/// Alerting errors
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Collector rejected alert with status {status}")]
    Rejected { status: u16 },

    #[error("Geolocation failed: {0}")]
    Geolocation(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}
