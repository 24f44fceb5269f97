//! Snapshot rate limiting

use std::time::Duration;

/// Allows at most one snapshot per `min_interval` of stream time
#[derive(Debug, Clone)]
pub struct SnapshotThrottle {
    min_interval: Duration,
    last: Option<Duration>,
}

impl SnapshotThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    /// Whether a snapshot may be taken at `at`. A `true` answer counts as taken.
    pub fn ready(&mut self, at: Duration) -> bool {
        match self.last {
            Some(last) if at.saturating_sub(last) < self.min_interval => false,
            _ => {
                self.last = Some(at);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_interval() {
        let mut throttle = SnapshotThrottle::new(Duration::from_secs(1));

        assert!(throttle.ready(Duration::from_millis(0)));
        assert!(!throttle.ready(Duration::from_millis(500)));
        assert!(!throttle.ready(Duration::from_millis(999)));
        assert!(throttle.ready(Duration::from_millis(1000)));
        assert!(!throttle.ready(Duration::from_millis(1500)));
    }

    #[test]
    fn test_zero_interval_always_ready() {
        let mut throttle = SnapshotThrottle::new(Duration::ZERO);
        assert!(throttle.ready(Duration::from_millis(5)));
        assert!(throttle.ready(Duration::from_millis(5)));
    }
}
