//! Detector to collector wire format

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

use crate::AlertError;

/// Event kind sent when the eye-closure alarm fires
pub const DROWSY_EVENT: &str = "drowsy";

/// Location recorded when the sender omits one
pub const DEFAULT_LOCATION: &str = "Unknown";

fn default_location() -> String {
    DEFAULT_LOCATION.to_string()
}

/// One alert, as posted to the collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub timestamp: String,
    pub event: String,
    #[serde(default = "default_location")]
    pub location: String,
    /// Base64-encoded JPEG
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl AlertPayload {
    pub fn new(
        timestamp: impl Into<String>,
        event: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            event: event.into(),
            location: location.into(),
            image: None,
        }
    }

    /// Attach a JPEG snapshot
    pub fn with_image(mut self, jpeg: &[u8]) -> Self {
        self.image = Some(BASE64.encode(jpeg));
        self
    }

    /// Decoded snapshot bytes; `None` when no image was attached
    pub fn decode_image(&self) -> Option<Result<Vec<u8>, AlertError>> {
        let encoded = self.image.as_deref().filter(|s| !s.is_empty())?;
        Some(
            BASE64
                .decode(encoded.trim())
                .map_err(|e| AlertError::Snapshot(e.to_string())),
        )
    }
}
