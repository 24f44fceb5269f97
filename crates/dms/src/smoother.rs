//! Rolling-mean smoothing of the eye aspect ratio

use std::collections::VecDeque;

/// Fixed-capacity FIFO of recent EAR samples
#[derive(Debug, Clone)]
pub struct EarSmoother {
    window: VecDeque<f32>,
    capacity: usize,
}

impl EarSmoother {
    /// Create a smoother over the last `capacity` samples (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a sample, evicting the oldest at capacity, and return the new mean
    pub fn push(&mut self, sample: f32) -> f32 {
        if self.window.len() >= self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(sample);
        self.window.iter().sum::<f32>() / self.window.len() as f32
    }

    /// Current mean, `None` while empty
    pub fn mean(&self) -> Option<f32> {
        if self.window.is_empty() {
            return None;
        }
        Some(self.window.iter().sum::<f32>() / self.window.len() as f32)
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }
}
