//! Eye-closure and yawn state tracking

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Eye-closure state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClosureState {
    /// Smoothed EAR at or above threshold
    #[default]
    Open,
    /// Eyes below threshold since `since`, alarm not yet raised
    Closing { since: Duration },
    /// Eyes below threshold since `since`, alarm raised
    AlarmActive { since: Duration },
}

impl ClosureState {
    /// Start of the current closure, if any
    pub fn closed_since(&self) -> Option<Duration> {
        match *self {
            ClosureState::Open => None,
            ClosureState::Closing { since } | ClosureState::AlarmActive { since } => Some(since),
        }
    }

    pub fn is_alarm_active(&self) -> bool {
        matches!(self, ClosureState::AlarmActive { .. })
    }
}

/// Alarm edge emitted by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmTransition {
    Activate,
    Deactivate,
}

/// Closure state machine with a sustained-duration debounce
#[derive(Debug, Clone)]
pub struct ClosureStateMachine {
    threshold: f32,
    alert_after: Duration,
    state: ClosureState,
}

impl ClosureStateMachine {
    pub fn new(threshold: f32, alert_after: Duration) -> Self {
        Self {
            threshold,
            alert_after,
            state: ClosureState::Open,
        }
    }

    pub fn state(&self) -> ClosureState {
        self.state
    }

    /// How long the eyes have been continuously closed at `at`
    pub fn closed_for(&self, at: Duration) -> Option<Duration> {
        self.state.closed_since().map(|since| at.saturating_sub(since))
    }

    /// Feed the smoothed EAR observed at `at`.
    ///
    /// Returns an edge only when the alarm changes: at most one `Activate`
    /// per closure and one `Deactivate` per activation.
    pub fn update(&mut self, smoothed_ear: f32, at: Duration) -> Option<AlarmTransition> {
        let closed = smoothed_ear < self.threshold;

        if !closed {
            let was_active = self.state.is_alarm_active();
            if self.state != ClosureState::Open {
                debug!("Eyes reopened (ear={:.3})", smoothed_ear);
            }
            self.state = ClosureState::Open;
            return was_active.then_some(AlarmTransition::Deactivate);
        }

        if self.state == ClosureState::Open {
            debug!("Eye closure started at {:?} (ear={:.3})", at, smoothed_ear);
            self.state = ClosureState::Closing { since: at };
        }

        if let ClosureState::Closing { since } = self.state {
            if at.saturating_sub(since) >= self.alert_after {
                info!("Eyes closed for {:?}, raising alarm", at.saturating_sub(since));
                self.state = ClosureState::AlarmActive { since };
                return Some(AlarmTransition::Activate);
            }
        }

        None
    }

    pub fn reset(&mut self) {
        self.state = ClosureState::Open;
    }
}

/// Tracks sustained mouth opening
#[derive(Debug, Clone)]
pub struct YawnTracker {
    mar_threshold: f32,
    min_duration: Duration,
    open_since: Option<Duration>,
    reported: bool,
    yawn_count: u32,
}

impl YawnTracker {
    pub fn new(mar_threshold: f32, min_duration: Duration) -> Self {
        Self {
            mar_threshold,
            min_duration,
            open_since: None,
            reported: false,
            yawn_count: 0,
        }
    }

    /// Feed the raw MAR observed at `at`. Returns true on the frame where
    /// an opening first reaches the minimum duration.
    pub fn update(&mut self, mar: f32, at: Duration) -> bool {
        if mar <= self.mar_threshold {
            self.open_since = None;
            self.reported = false;
            return false;
        }

        let since = *self.open_since.get_or_insert(at);
        if !self.reported && at.saturating_sub(since) >= self.min_duration {
            self.reported = true;
            self.yawn_count += 1;
            return true;
        }
        false
    }

    /// Whether the current opening has lasted long enough to count
    pub fn is_yawning(&self) -> bool {
        self.reported
    }

    /// Yawns counted this session
    pub fn yawn_count(&self) -> u32 {
        self.yawn_count
    }

    pub fn reset(&mut self) {
        self.open_since = None;
        self.reported = false;
        self.yawn_count = 0;
    }
}
