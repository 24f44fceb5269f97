//! Camera Capture Library for the Drowsiness Monitor
//!
//! Defines the frame type handed to the detection loop and the
//! [`FrameSource`] seam behind which a capture device lives.
//! Supports:
//! - Cabin camera frames (RGB24) for the drowsiness engine
//! - JPEG encoding of frames for remote alert snapshots

pub mod frame;

pub use frame::VideoFrame;

use thiserror::Error;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Invalid format: {0}")]
    Format(String),

    #[error("Streaming error: {0}")]
    Stream(String),

    #[error("Snapshot encoding failed: {0}")]
    Encode(String),
}

/// Camera configuration
#[derive(Debug, Clone, Default)]
pub struct CameraConfig {
    /// Device index (0 = first camera)
    pub index: u32,
}

impl CameraConfig {
    /// Device path for this index on V4L2 systems
    pub fn device_path(&self) -> String {
        format!("/dev/video{}", self.index)
    }
}

/// A source of video frames, pulled one at a time by the detection loop.
pub trait FrameSource {
    /// Pull the next frame.
    ///
    /// `Ok(None)` marks a clean end of stream. An `Err` is a per-frame
    /// capture failure; the caller treats both as end of stream.
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;

    /// Release the underlying device. Called exactly once when the loop exits.
    fn release(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_path() {
        let config = CameraConfig { index: 2 };
        assert_eq!(config.device_path(), "/dev/video2");
    }
}
