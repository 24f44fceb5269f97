//! DMS configuration

use alerting::DispatchConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::DmsError;

/// Detection engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DmsConfig {
    /// Smoothed EAR below this counts as closed
    pub ear_threshold: f32,

    /// Number of EAR samples in the rolling mean
    pub smooth_window: usize,

    /// Continuous closure before the alarm fires (milliseconds)
    pub eyes_closed_alert_ms: u64,

    /// MAR above this counts as an open mouth
    pub mar_threshold: f32,

    /// Sustained mouth opening that counts as a yawn (milliseconds)
    pub yawn_duration_ms: u64,

    /// Phrase spoken when the alarm fires
    pub alarm_message: String,
}

impl Default for DmsConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.22,
            smooth_window: 6,
            eyes_closed_alert_ms: 2000,
            mar_threshold: 0.60,
            yawn_duration_ms: 1500,
            alarm_message: "Wake up! Please open your eyes.".to_string(),
        }
    }
}

impl DmsConfig {
    /// Create strict config (alarm sooner)
    pub fn strict() -> Self {
        Self {
            ear_threshold: 0.25,
            eyes_closed_alert_ms: 1000,
            ..Default::default()
        }
    }

    /// Create lenient config (alarm later)
    pub fn lenient() -> Self {
        Self {
            ear_threshold: 0.20,
            eyes_closed_alert_ms: 3000,
            ..Default::default()
        }
    }

    pub fn eyes_closed_alert(&self) -> Duration {
        Duration::from_millis(self.eyes_closed_alert_ms)
    }

    pub fn yawn_duration(&self) -> Duration {
        Duration::from_millis(self.yawn_duration_ms)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<(), DmsError> {
        if !(self.ear_threshold > 0.0) {
            return Err(DmsError::Config(format!(
                "ear_threshold must be positive, got {}",
                self.ear_threshold
            )));
        }
        if self.smooth_window == 0 {
            return Err(DmsError::Config("smooth_window must be at least 1".into()));
        }
        if !(self.mar_threshold > 0.0) {
            return Err(DmsError::Config(format!(
                "mar_threshold must be positive, got {}",
                self.mar_threshold
            )));
        }
        Ok(())
    }
}

/// Frame source selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Capture device index
    pub index: u32,
    /// Landmark recording to replay instead of a live device
    pub replay: Option<PathBuf>,
}

/// Looping alarm player, e.g. `mpg123 --loop -1 alarm.mp3`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            command: "mpg123".to_string(),
            args: vec!["--quiet".into(), "--loop".into(), "-1".into(), "alarm.mp3".into()],
        }
    }
}

/// Speech synthesis command, invoked as `<command> -s <rate> <text>`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    /// Empty disables speech
    pub command: String,
    /// Words per minute
    pub rate: u32,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            command: "espeak".to_string(),
            rate: 160,
        }
    }
}

/// Complete configuration of the `drowsy-monitor` binary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub camera: CameraSettings,
    pub dms: DmsConfig,
    pub audio: AudioSettings,
    pub speech: SpeechSettings,
    pub alert: DispatchConfig,
}

impl MonitorConfig {
    /// Layer defaults, an optional TOML file and `DROWSY_*` environment
    /// variables (nested keys separated by `__`, e.g. `DROWSY_DMS__EAR_THRESHOLD`).
    pub fn load(path: Option<&Path>) -> Result<Self, DmsError> {
        let defaults = config::Config::try_from(&MonitorConfig::default())
            .map_err(|e| DmsError::Config(e.to_string()))?;

        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("DROWSY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: MonitorConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| DmsError::Config(e.to_string()))?;
        config.dms.validate()?;
        Ok(config)
    }
}
