//! Driver Monitoring System (DMS)
//!
//! Real-time drowsiness detection from facial landmarks:
//! - Eye and mouth aspect ratios per frame
//! - Rolling-mean smoothing of the eye signal
//! - Eye-closure state machine with a sustained-duration debounce
//! - Alarm lifecycle (voice prompt + looping audio)
//! - Yawn tracking (reported, does not raise the alarm)

pub mod alarm;
pub mod analysis;
pub mod config;
pub mod landmarks;
pub mod monitor;
pub mod replay;
pub mod signals;
pub mod smoother;
pub mod speech;
pub mod state;

pub use alarm::{AlarmOrchestrator, AudioSink, CommandAudio};
pub use analysis::FrameAnalysis;
pub use config::{DmsConfig, MonitorConfig};
pub use landmarks::{LandmarkSet, Point};
pub use monitor::{LandmarkProvider, Monitor, MonitorSummary};
pub use signals::FrameSignals;
pub use smoother::EarSmoother;
pub use speech::{CommandSpeech, SpeechEngine, SpeechWorker};
pub use state::{AlarmTransition, ClosureState, ClosureStateMachine, YawnTracker};

use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// DMS error types
#[derive(Error, Debug)]
pub enum DmsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Keypoints missing for feature calculation")]
    KeypointsMissing,

    #[error("Speech error: {0}")]
    Speech(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Replay line {line}: {message}")]
    Replay { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Per-session drowsiness detection state
pub struct DrowsinessEngine {
    smoother: EarSmoother,
    closure: ClosureStateMachine,
    yawn: YawnTracker,
    face_absent_frames: u32,
}

impl DrowsinessEngine {
    /// Create a new engine with configuration
    pub fn new(config: &DmsConfig) -> Result<Self, DmsError> {
        config.validate()?;
        info!(
            "Drowsiness engine: ear<{} for {:?}, window={}",
            config.ear_threshold,
            config.eyes_closed_alert(),
            config.smooth_window
        );
        Ok(Self {
            smoother: EarSmoother::new(config.smooth_window),
            closure: ClosureStateMachine::new(config.ear_threshold, config.eyes_closed_alert()),
            yawn: YawnTracker::new(config.mar_threshold, config.yawn_duration()),
            face_absent_frames: 0,
        })
    }

    /// Analyze one frame's landmarks observed at `at`.
    ///
    /// Without landmarks (or with an incomplete set) nothing is updated;
    /// a running closure keeps its start time.
    pub fn process(
        &mut self,
        at: Duration,
        landmarks: Option<&LandmarkSet>,
        width: u32,
        height: u32,
    ) -> FrameAnalysis {
        let signals = match landmarks.map(|l| FrameSignals::extract(l, width, height)) {
            Some(Ok(signals)) => signals,
            Some(Err(e)) => {
                debug!("Unusable landmarks at {:?}: {}", at, e);
                return self.no_face(at);
            }
            None => return self.no_face(at),
        };
        self.face_absent_frames = 0;

        let smoothed = self.smoother.push(signals.avg_ear);
        let transition = self.closure.update(smoothed, at);

        let yawn_detected = self.yawn.update(signals.mar, at);
        if yawn_detected {
            info!("Yawn detected (mar={:.2}, total={})", signals.mar, self.yawn.yawn_count());
        }

        FrameAnalysis {
            at,
            face_detected: true,
            signals: Some(signals),
            smoothed_ear: Some(smoothed),
            state: self.closure.state(),
            transition,
            yawning: self.yawn.is_yawning(),
            yawn_detected,
        }
    }

    fn no_face(&mut self, at: Duration) -> FrameAnalysis {
        self.face_absent_frames = self.face_absent_frames.saturating_add(1);
        FrameAnalysis::no_face(
            at,
            self.closure.state(),
            self.smoother.mean(),
            self.yawn.is_yawning(),
        )
    }

    /// Consecutive frames without a usable face
    pub fn face_absent_frames(&self) -> u32 {
        self.face_absent_frames
    }

    pub fn state(&self) -> ClosureState {
        self.closure.state()
    }

    /// Reset all tracked state (new session)
    pub fn reset_state(&mut self) {
        self.smoother.clear();
        self.closure.reset();
        self.yawn.reset();
        self.face_absent_frames = 0;
    }
}
