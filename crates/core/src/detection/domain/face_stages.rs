//! The two stages a face mesh detector is built from: locating faces, then
//! regressing dense landmarks inside a square region around each face.

use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::frame::Frame;

/// How much larger than the face box the landmark crop is.
pub const ROI_SCALE: f64 = 1.5;

/// Mesh indices of the outer eye corners, used to level tracked regions.
const RIGHT_EYE_CORNER: usize = 33;
const LEFT_EYE_CORNER: usize = 263;

/// Axis-aligned face box in frame pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub score: f64,
    /// Right then left eye center in frame pixels, when the detector reports them.
    pub eyes: Option<[[f64; 2]; 2]>,
}

impl FaceBox {
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }
}

/// Square crop, in frame pixels, fed to the landmark stage.
/// May extend past the frame edges.
///
/// `rotation` (radians, clockwise in image coordinates) turns the crop so
/// the eye line comes out horizontal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Roi {
    pub center_x: f64,
    pub center_y: f64,
    pub size: f64,
    pub rotation: f64,
}

impl Roi {
    pub fn from_face_box(face: &FaceBox) -> Self {
        Self {
            center_x: (face.x1 + face.x2) / 2.0,
            center_y: (face.y1 + face.y2) / 2.0,
            size: face.width().max(face.height()) * ROI_SCALE,
            rotation: face.eyes.map_or(0.0, |[right, left]| eye_line_angle(right, left)),
        }
    }

    /// Region enclosing a previous frame's landmarks, used in tracking mode.
    pub fn from_landmarks(
        landmarks: &FaceLandmarks,
        frame_width: u32,
        frame_height: u32,
    ) -> Option<Self> {
        let [x1, y1, x2, y2] = landmarks.bounds()?;
        let fw = frame_width as f64;
        let fh = frame_height as f64;
        let w = (x2 - x1) * fw;
        let h = (y2 - y1) * fh;
        let size = w.max(h) * ROI_SCALE;
        if size <= 0.0 {
            return None;
        }
        let corner = |i: usize| landmarks.get(i).map(|p| [p.x * fw, p.y * fh]);
        let rotation = match (corner(RIGHT_EYE_CORNER), corner(LEFT_EYE_CORNER)) {
            (Some(right), Some(left)) => eye_line_angle(right, left),
            _ => 0.0,
        };
        Some(Self {
            center_x: (x1 + x2) / 2.0 * fw,
            center_y: (y1 + y2) / 2.0 * fh,
            size,
            rotation,
        })
    }

    pub fn left(&self) -> f64 {
        self.center_x - self.size / 2.0
    }

    pub fn top(&self) -> f64 {
        self.center_y - self.size / 2.0
    }

    /// `[x1, y1, x2, y2]` of the unrotated square, in frame pixels.
    pub fn bbox(&self) -> [f64; 4] {
        [
            self.left(),
            self.top(),
            self.left() + self.size,
            self.top() + self.size,
        ]
    }

    /// Maps a point given relative to the crop (`[0, 1]` on both axes) to frame pixels.
    pub fn to_frame(&self, u: f64, v: f64) -> [f64; 2] {
        let dx = (u - 0.5) * self.size;
        let dy = (v - 0.5) * self.size;
        let (sin, cos) = self.rotation.sin_cos();
        [
            self.center_x + dx * cos - dy * sin,
            self.center_y + dx * sin + dy * cos,
        ]
    }
}

/// Angle of the line from the right eye to the left eye, normalized to `(-π, π]`.
fn eye_line_angle(right: [f64; 2], left: [f64; 2]) -> f64 {
    let angle = (left[1] - right[1]).atan2(left[0] - right[0]);
    if angle <= -std::f64::consts::PI {
        angle + 2.0 * std::f64::consts::PI
    } else {
        angle
    }
}

/// Landmark stage output for one region.
#[derive(Clone, Debug, PartialEq)]
pub struct RegressedFace {
    pub landmarks: FaceLandmarks,
    /// Probability in `[0, 1]` that the region actually contains a face.
    pub presence: f64,
}

/// First stage: coarse face boxes.
pub trait FaceBoxDetector {
    fn detect_faces(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>>;
}

/// Second stage: dense landmarks inside one region, in normalized frame coordinates.
pub trait LandmarkRegressor {
    fn regress(
        &mut self,
        frame: &Frame,
        roi: &Roi,
    ) -> Result<RegressedFace, Box<dyn std::error::Error>>;
}
