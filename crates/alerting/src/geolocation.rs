//! Best-effort location lookup
//!
//! Resolved once at startup from an ipinfo-style JSON endpoint.

use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::AlertError;

/// Sentinel used whenever the location cannot be determined
pub const UNKNOWN_LOCATION: &str = "Unknown Location";

/// Subset of an ipinfo response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IpInfo {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
}

/// "City, Region, Country", skipping empty parts
pub fn format_location(info: &IpInfo) -> String {
    let parts: Vec<&str> = [&info.city, &info.region, &info.country]
        .into_iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    if parts.is_empty() {
        UNKNOWN_LOCATION.to_string()
    } else {
        parts.join(", ")
    }
}

/// Look up the location label
pub async fn resolve_location(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<String, AlertError> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| AlertError::Geolocation(e.to_string()))?;

    if !response.status().is_success() {
        return Err(AlertError::Geolocation(format!("status {}", response.status())));
    }

    let info: IpInfo = response
        .json()
        .await
        .map_err(|e| AlertError::Geolocation(e.to_string()))?;
    Ok(format_location(&info))
}

/// [`resolve_location`], falling back to [`UNKNOWN_LOCATION`]
pub async fn location_or_unknown(client: &reqwest::Client, url: &str, timeout: Duration) -> String {
    match resolve_location(client, url, timeout).await {
        Ok(location) => {
            info!("Location resolved: {}", location);
            location
        }
        Err(e) => {
            warn!("{}; using \"{}\"", e, UNKNOWN_LOCATION);
            UNKNOWN_LOCATION.to_string()
        }
    }
}
