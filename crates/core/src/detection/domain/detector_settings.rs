use serde::{Deserialize, Serialize};

use crate::shared::constants::{
    DEFAULT_MAX_FACES, DEFAULT_MIN_DETECTION_CONFIDENCE, DEFAULT_MIN_TRACKING_CONFIDENCE,
};

/// How the detector relates consecutive frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Every frame is an independent image; face detection runs on each one
    /// and `min_tracking_confidence` is never consulted.
    StaticImage,
    /// The face region found on the previous frame seeds the next one. Face
    /// detection reruns only while fewer than `max_faces` faces are tracked;
    /// a tracked face scoring below `min_tracking_confidence` is dropped.
    Tracking,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorSettings {
    pub mode: DetectionMode,
    pub min_detection_confidence: f64,
    pub min_tracking_confidence: f64,
    pub max_faces: usize,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            mode: DetectionMode::StaticImage,
            min_detection_confidence: DEFAULT_MIN_DETECTION_CONFIDENCE,
            min_tracking_confidence: DEFAULT_MIN_TRACKING_CONFIDENCE,
            max_faces: DEFAULT_MAX_FACES,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_treat_frames_as_static_images() {
        let settings = DetectorSettings::default();
        assert_eq!(settings.mode, DetectionMode::StaticImage);
        assert_eq!(settings.min_detection_confidence, 0.6);
        assert_eq!(settings.min_tracking_confidence, 0.6);
        assert_eq!(settings.max_faces, 1);
    }

    #[test]
    fn test_mode_serializes_snake_case() {
        let json = serde_json::to_string(&DetectionMode::StaticImage).unwrap();
        assert_eq!(json, "\"static_image\"");
        let mode: DetectionMode = serde_json::from_str("\"tracking\"").unwrap();
        assert_eq!(mode, DetectionMode::Tracking);
    }
}
