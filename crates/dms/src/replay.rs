//! Landmark recordings
//!
//! A recording is a JSON-lines file written by an external face-mesh
//! pipeline, one frame per line:
//!
//! ```json
//! {"t_ms": 33, "width": 640, "height": 480, "landmarks": [[0.41, 0.37], ...]}
//! ```
//!
//! `landmarks` is `null` (or absent) when no face was found. Frames are
//! replayed without pixel data, carrying only the recorded geometry and
//! timestamps; the landmarks are served back by sequence number.

use camera_capture::{CameraError, FrameSource, VideoFrame};
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

use crate::landmarks::LandmarkSet;
use crate::monitor::LandmarkProvider;
use crate::DmsError;

#[derive(Debug, Deserialize)]
struct ReplayRecord {
    t_ms: u64,
    width: u32,
    height: u32,
    #[serde(default)]
    landmarks: Option<LandmarkSet>,
}

#[derive(Debug, Clone, Copy)]
struct FrameMeta {
    timestamp_ns: u64,
    width: u32,
    height: u32,
    sequence: u32,
}

/// Frame half of a recording
#[derive(Debug)]
pub struct ReplayFrames {
    frames: VecDeque<FrameMeta>,
}

impl ReplayFrames {
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for ReplayFrames {
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        Ok(self
            .frames
            .pop_front()
            .map(|m| VideoFrame::without_pixels(m.width, m.height, m.timestamp_ns, m.sequence)))
    }

    fn release(&mut self) {
        self.frames.clear();
    }
}

/// Landmark half of a recording
#[derive(Debug, Default)]
pub struct ReplayLandmarks {
    by_sequence: HashMap<u32, LandmarkSet>,
}

impl LandmarkProvider for ReplayLandmarks {
    fn landmarks(&mut self, frame: &VideoFrame) -> Result<Option<LandmarkSet>, DmsError> {
        Ok(self.by_sequence.remove(&frame.sequence))
    }
}

/// Parse a recording
pub fn read_replay(reader: impl BufRead) -> Result<(ReplayFrames, ReplayLandmarks), DmsError> {
    let mut frames = VecDeque::new();
    let mut landmarks = ReplayLandmarks::default();
    let mut last_ms = 0;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let lineno = idx + 1;
        if line.trim().is_empty() {
            continue;
        }

        let record: ReplayRecord = serde_json::from_str(&line).map_err(|e| DmsError::Replay {
            line: lineno,
            message: e.to_string(),
        })?;
        if record.t_ms < last_ms {
            return Err(DmsError::Replay {
                line: lineno,
                message: format!(
                    "timestamp {} ms goes backwards (previous {} ms)",
                    record.t_ms, last_ms
                ),
            });
        }
        last_ms = record.t_ms;

        let timestamp_ns = record
            .t_ms
            .checked_mul(1_000_000)
            .ok_or_else(|| DmsError::Replay {
                line: lineno,
                message: format!("timestamp {} ms out of range", record.t_ms),
            })?;

        let sequence = frames.len() as u32;
        frames.push_back(FrameMeta {
            timestamp_ns,
            width: record.width,
            height: record.height,
            sequence,
        });
        if let Some(set) = record.landmarks {
            landmarks.by_sequence.insert(sequence, set);
        }
    }

    Ok((ReplayFrames { frames }, landmarks))
}

/// Open a recording file. A missing or unreadable file is a capture
/// device failure.
pub fn open_replay(path: &Path) -> Result<(ReplayFrames, ReplayLandmarks), CameraError> {
    let file = File::open(path)
        .map_err(|e| CameraError::Open(format!("{}: {}", path.display(), e)))?;
    let (frames, landmarks) = read_replay(BufReader::new(file))
        .map_err(|e| CameraError::Open(format!("{}: {}", path.display(), e)))?;
    info!("Loaded {} frames from {}", frames.remaining(), path.display());
    Ok((frames, landmarks))
}
