//! Landmark set for one detected face.
//!
//! Coordinates are normalized: `x` and `y` are fractions of the frame width
//! and height, `z` is depth relative to the face center on the same scale
//! as `x` (smaller is closer to the camera).

/// Number of points produced by the face landmark model.
pub const FACE_MESH_LANDMARKS: usize = 468;

/// Number of points when the model also refines the irises.
pub const FACE_MESH_LANDMARKS_WITH_IRISES: usize = 478;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Whether the point falls inside the frame.
    pub fn is_in_frame(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }
}

/// Ordered landmarks of one face. Index `i` always names the same
/// anatomical point, which is what mesh topologies rely on.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    points: Vec<Landmark>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }

    /// Normalized `[x1, y1, x2, y2]` bounds of all points, or `None` when empty.
    pub fn bounds(&self) -> Option<[f64; 4]> {
        let first = self.points.first()?;
        let init = [first.x, first.y, first.x, first.y];
        Some(self.points.iter().fold(init, |b, p| {
            [b[0].min(p.x), b[1].min(p.y), b[2].max(p.x), b[3].max(p.y)]
        }))
    }
}
