use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::shared::frame::Frame;

/// Domain interface for facial landmark detection.
///
/// Takes an RGB frame and returns one landmark set per detected face,
/// possibly none. Implementations may keep state between frames when
/// configured for tracking, hence `&mut self`.
pub trait LandmarkDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceLandmarks>, Box<dyn std::error::Error>>;
}
