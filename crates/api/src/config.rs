//! Collector configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Collector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Listen address
    pub bind_addr: String,
    /// Root of the static tree; snapshots live in `<static_dir>/snapshots`
    pub static_dir: PathBuf,
    /// Number of recent events kept
    pub history_capacity: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            static_dir: PathBuf::from("static"),
            history_capacity: storage::DEFAULT_CAPACITY,
        }
    }
}

impl CollectorConfig {
    /// Snapshot directory under the static tree
    pub fn snapshot_dir(&self) -> PathBuf {
        self.static_dir.join("snapshots")
    }

    /// Layer defaults, an optional TOML file and `COLLECTOR_*` environment
    /// variables (e.g. `COLLECTOR_BIND_ADDR`).
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let defaults = config::Config::try_from(&CollectorConfig::default())?;
        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder
            .add_source(
                config::Environment::with_prefix("COLLECTOR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
