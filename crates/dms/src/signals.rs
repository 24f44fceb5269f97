//! Per-frame signal extraction (EAR / MAR)

use serde::{Deserialize, Serialize};

use crate::landmarks::{
    LandmarkSet, Point, LEFT_EYE, MOUTH_BOTTOM, MOUTH_LEFT, MOUTH_RIGHT, MOUTH_TOP, RIGHT_EYE,
};
use crate::DmsError;

/// Signals derived from one frame's landmarks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSignals {
    pub left_ear: f32,
    pub right_ear: f32,
    /// Mean of both eyes, fed to the smoother
    pub avg_ear: f32,
    /// Mouth aspect ratio (unsmoothed)
    pub mar: f32,
}

impl FrameSignals {
    /// Extract EAR and MAR from a landmark set in a `width` x `height` frame
    pub fn extract(landmarks: &LandmarkSet, width: u32, height: u32) -> Result<Self, DmsError> {
        let left_ear = eye_aspect_ratio(&eye_points(landmarks, &LEFT_EYE, width, height)?);
        let right_ear = eye_aspect_ratio(&eye_points(landmarks, &RIGHT_EYE, width, height)?);

        let px = |i| landmarks.pixel(i, width, height).ok_or(DmsError::KeypointsMissing);
        let mar = mouth_aspect_ratio(
            px(MOUTH_TOP)?,
            px(MOUTH_BOTTOM)?,
            px(MOUTH_LEFT)?,
            px(MOUTH_RIGHT)?,
        );

        Ok(Self {
            left_ear,
            right_ear,
            avg_ear: (left_ear + right_ear) / 2.0,
            mar,
        })
    }
}

fn eye_points(
    landmarks: &LandmarkSet,
    indices: &[usize; 6],
    width: u32,
    height: u32,
) -> Result<[Point; 6], DmsError> {
    let mut pts = [Point::default(); 6];
    for (slot, &idx) in pts.iter_mut().zip(indices) {
        *slot = landmarks.pixel(idx, width, height).ok_or(DmsError::KeypointsMissing)?;
    }
    Ok(pts)
}

/// Eye aspect ratio of a six-point eye contour in pixel space.
///
/// `(|p1-p5| + |p2-p4|) / (2 * |p0-p3|)`, or 0.0 when the corners coincide.
pub fn eye_aspect_ratio(p: &[Point; 6]) -> f32 {
    let horizontal = p[0].distance(&p[3]);
    if horizontal <= 0.0 {
        return 0.0;
    }
    (p[1].distance(&p[5]) + p[2].distance(&p[4])) / (2.0 * horizontal)
}

/// Mouth opening over mouth width, or 0.0 when the corners coincide.
pub fn mouth_aspect_ratio(top: Point, bottom: Point, left: Point, right: Point) -> f32 {
    let width = left.distance(&right);
    if width <= 0.0 {
        return 0.0;
    }
    top.distance(&bottom) / width
}
