//! Facial landmark types
//!
//! Landmarks arrive from the external face-mesh provider normalized to
//! `[0, 1]` in both axes. Indices follow the 478-point refined face mesh.

use serde::{Deserialize, Serialize};

/// Six-point contour of the left eye: outer corner, two upper lid points,
/// inner corner, two lower lid points.
pub const LEFT_EYE: [usize; 6] = [33, 160, 158, 133, 153, 144];

/// Six-point contour of the right eye, same ordering as [`LEFT_EYE`].
pub const RIGHT_EYE: [usize; 6] = [362, 385, 387, 263, 373, 380];

/// Inner upper lip
pub const MOUTH_TOP: usize = 13;
/// Inner lower lip
pub const MOUTH_BOTTOM: usize = 14;
/// Left mouth corner
pub const MOUTH_LEFT: usize = 61;
/// Right mouth corner
pub const MOUTH_RIGHT: usize = 291;

/// Point count of a refined face mesh
pub const FACE_MESH_POINTS: usize = 478;

/// 2D point
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 2]", into = "[f32; 2]")]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance
    pub fn distance(&self, other: &Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Scale a normalized point into pixel space
    pub fn to_pixels(self, width: u32, height: u32) -> Point {
        Point::new(self.x * width as f32, self.y * height as f32)
    }
}

impl From<[f32; 2]> for Point {
    fn from([x, y]: [f32; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f32; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// Landmarks of a single face for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: Vec<Point>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Normalized point at `index`
    pub fn get(&self, index: usize) -> Option<Point> {
        self.points.get(index).copied()
    }

    /// Point at `index` scaled to a `width` x `height` frame
    pub fn pixel(&self, index: usize, width: u32, height: u32) -> Option<Point> {
        self.get(index).map(|p| p.to_pixels(width, height))
    }
}

/// Face mesh whose eyes both have the given aspect ratio when rendered
/// into a 1000x1000 frame. Mouth corners and lips collapse to the origin.
#[cfg(test)]
pub(crate) fn synthetic_face(ear: f32) -> LandmarkSet {
    synthetic_face_with_mouth(ear, 0.0)
}

/// Same as [`synthetic_face`] with a mouth of the given aspect ratio.
#[cfg(test)]
pub(crate) fn synthetic_face_with_mouth(ear: f32, mar: f32) -> LandmarkSet {
    let mut points = vec![Point::default(); FACE_MESH_POINTS];

    // Horizontal span 0.1, so EAR = 2 * (2d) / (2 * 0.1) = 20d.
    let d = ear / 20.0;
    for (eye, cx) in [(LEFT_EYE, 0.35_f32), (RIGHT_EYE, 0.65_f32)] {
        points[eye[0]] = Point::new(cx - 0.05, 0.4);
        points[eye[1]] = Point::new(cx - 0.02, 0.4 - d);
        points[eye[2]] = Point::new(cx + 0.02, 0.4 - d);
        points[eye[3]] = Point::new(cx + 0.05, 0.4);
        points[eye[4]] = Point::new(cx + 0.02, 0.4 + d);
        points[eye[5]] = Point::new(cx - 0.02, 0.4 + d);
    }

    if mar > 0.0 {
        // Width 0.2, opening 0.2 * mar.
        points[MOUTH_LEFT] = Point::new(0.4, 0.75);
        points[MOUTH_RIGHT] = Point::new(0.6, 0.75);
        points[MOUTH_TOP] = Point::new(0.5, 0.75 - 0.1 * mar);
        points[MOUTH_BOTTOM] = Point::new(0.5, 0.75 + 0.1 * mar);
    }

    LandmarkSet::new(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_scaling() {
        let set = LandmarkSet::new(vec![Point::new(0.5, 0.25)]);
        assert_eq!(set.pixel(0, 640, 480), Some(Point::new(320.0, 120.0)));
        assert_eq!(set.pixel(1, 640, 480), None);
    }

    #[test]
    fn test_deserialize_from_pairs() {
        let set: LandmarkSet = serde_json::from_str("[[0.1, 0.2], [0.3, 0.4]]").unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(1), Some(Point::new(0.3, 0.4)));
    }
}
