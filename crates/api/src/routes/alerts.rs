//! Alert Routes

use alerting::AlertPayload;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{ApiError, AppState};
use storage::EventRecord;

/// Submission acknowledgment
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    pub status: String,
}

impl Ack {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Receive an alert and its optional snapshot
pub async fn submit_alert(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AlertPayload>, JsonRejection>,
) -> Result<Json<Ack>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::InvalidPayload(e.body_text()))?;

    if payload.timestamp.trim().is_empty() {
        return Err(ApiError::MissingField("timestamp"));
    }
    if payload.event.trim().is_empty() {
        return Err(ApiError::MissingField("event"));
    }

    info!("[{}] ALERT: {} from {}", payload.timestamp, payload.event, payload.location);

    let filename = store_snapshot(&state, &payload).await;

    state.events.insert(EventRecord {
        timestamp: payload.timestamp,
        event: payload.event,
        location: payload.location,
        filename,
    })?;

    Ok(Json(Ack::ok()))
}

/// Decode and write the snapshot. The file name is returned only after a
/// successful write; failures leave the event without an image.
async fn store_snapshot(state: &AppState, payload: &AlertPayload) -> Option<String> {
    let bytes = match payload.decode_image()? {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Discarding undecodable image for '{}': {}", payload.event, e);
            return None;
        }
    };

    let received = chrono::Local::now();
    match state.snapshots.save(&payload.event, &received, &bytes).await {
        Ok(filename) => Some(filename),
        Err(e) => {
            warn!("Failed to store image for '{}': {}", payload.event, e);
            None
        }
    }
}

/// Recent events, newest first
pub async fn list_events(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<EventRecord>>, ApiError> {
    Ok(Json(state.events.list()?))
}
