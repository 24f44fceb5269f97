//! Video frame types and snapshot encoding

use crate::CameraError;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::time::Duration;

/// JPEG quality used for alert snapshots
pub const SNAPSHOT_JPEG_QUALITY: u8 = 80;

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds, monotonic within one stream)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Frame carrying only geometry and timing, for sources that have
    /// landmarks but no pixels (recordings).
    pub fn without_pixels(width: u32, height: u32, timestamp_ns: u64, sequence: u32) -> Self {
        Self::new(Vec::new(), width, height, timestamp_ns, sequence)
    }

    /// Whether the frame holds image data
    pub fn has_pixels(&self) -> bool {
        !self.data.is_empty()
    }

    /// Capture time as a duration since the start of the stream
    pub fn timestamp(&self) -> Duration {
        Duration::from_nanos(self.timestamp_ns)
    }

    /// Encode the frame as a JPEG image
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, CameraError> {
        let img = RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or_else(|| {
            CameraError::Format(format!(
                "buffer of {} bytes does not match {}x{} RGB",
                self.data.len(),
                self.width,
                self.height
            ))
        })?;

        let mut out = Vec::new();
        img.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))
            .map_err(|e| CameraError::Encode(e.to_string()))?;
        Ok(out)
    }

    /// Encode with the default snapshot quality
    pub fn snapshot(&self) -> Result<Vec<u8>, CameraError> {
        self.encode_jpeg(SNAPSHOT_JPEG_QUALITY)
    }
}
