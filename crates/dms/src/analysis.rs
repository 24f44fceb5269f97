//! Per-frame analysis results

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::signals::FrameSignals;
use crate::state::{AlarmTransition, ClosureState};

/// Result of running one frame through the engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameAnalysis {
    /// Frame time
    pub at: Duration,

    /// Whether usable landmarks were present
    pub face_detected: bool,

    /// Raw EAR / MAR (if a face was detected)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signals: Option<FrameSignals>,

    /// Rolling-mean EAR after this frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smoothed_ear: Option<f32>,

    /// Closure state after this frame
    pub state: ClosureState,

    /// Alarm edge produced by this frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<AlarmTransition>,

    /// Mouth has been open long enough to count as a yawn
    pub yawning: bool,

    /// This frame completed a new yawn
    pub yawn_detected: bool,
}

impl FrameAnalysis {
    /// Analysis of a frame with no usable face; state carried over unchanged
    pub fn no_face(
        at: Duration,
        state: ClosureState,
        smoothed_ear: Option<f32>,
        yawning: bool,
    ) -> Self {
        Self {
            at,
            face_detected: false,
            smoothed_ear,
            state,
            yawning,
            ..Default::default()
        }
    }

    pub fn alarm_active(&self) -> bool {
        self.state.is_alarm_active()
    }
}
