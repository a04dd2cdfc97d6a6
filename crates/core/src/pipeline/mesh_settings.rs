use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::domain::detector_settings::DetectorSettings;
use crate::rendering::domain::drawing_style::DrawingStyle;
use crate::shared::constants::{
    DEFAULT_EXIT_KEY, DEFAULT_POLL_MS, DEFAULT_WINDOW_TITLE, MAX_POLL_MS,
};

#[derive(Error, Debug, PartialEq)]
pub enum SettingsError {
    #[error("{name} must be within [0, 1], got {value}")]
    ConfidenceOutOfRange { name: &'static str, value: f64 },
    #[error("max faces must be at least 1")]
    NoFaces,
    #[error("poll timeout must be within 1..={max} ms, got {0}", max = MAX_POLL_MS)]
    PollOutOfRange(u32),
    #[error("exit key must be within 0..=255, got {0}")]
    ExitKeyOutOfRange(i32),
    #[error("window title must not be empty")]
    EmptyTitle,
}

/// Everything the live loop needs besides its devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshSettings {
    pub detector: DetectorSettings,
    pub style: DrawingStyle,
    pub window_title: String,
    /// Key code, compared against the low byte of what the window reports.
    pub exit_key: i32,
    pub poll_ms: u32,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            detector: DetectorSettings::default(),
            style: DrawingStyle::default(),
            window_title: DEFAULT_WINDOW_TITLE.to_string(),
            exit_key: DEFAULT_EXIT_KEY,
            poll_ms: DEFAULT_POLL_MS,
        }
    }
}

impl MeshSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        let confidences = [
            (
                "min detection confidence",
                self.detector.min_detection_confidence,
            ),
            (
                "min tracking confidence",
                self.detector.min_tracking_confidence,
            ),
        ];
        for (name, value) in confidences {
            if !(0.0..=1.0).contains(&value) {
                return Err(SettingsError::ConfidenceOutOfRange { name, value });
            }
        }
        if self.detector.max_faces == 0 {
            return Err(SettingsError::NoFaces);
        }
        if !(1..=MAX_POLL_MS).contains(&self.poll_ms) {
            return Err(SettingsError::PollOutOfRange(self.poll_ms));
        }
        if !(0..=255).contains(&self.exit_key) {
            return Err(SettingsError::ExitKeyOutOfRange(self.exit_key));
        }
        if self.window_title.is_empty() {
            return Err(SettingsError::EmptyTitle);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults_are_valid() {
        let settings = MeshSettings::default();
        assert_eq!(settings.window_title, "window");
        assert_eq!(settings.exit_key, 27);
        assert_eq!(settings.poll_ms, 1);
        assert_eq!(settings.validate(), Ok(()));
    }

    #[rstest]
    #[case::detection_negative(-0.1, 0.5)]
    #[case::detection_above_one(1.01, 0.5)]
    #[case::tracking_above_one(0.5, 2.0)]
    #[case::nan(f64::NAN, 0.5)]
    fn test_confidence_out_of_range(#[case] detection: f64, #[case] tracking: f64) {
        let mut settings = MeshSettings::default();
        settings.detector.min_detection_confidence = detection;
        settings.detector.min_tracking_confidence = tracking;
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::ConfidenceOutOfRange { .. })
        ));
    }

    #[rstest]
    #[case(0.0)]
    #[case(1.0)]
    fn test_confidence_bounds_inclusive(#[case] value: f64) {
        let mut settings = MeshSettings::default();
        settings.detector.min_detection_confidence = value;
        settings.detector.min_tracking_confidence = value;
        assert_eq!(settings.validate(), Ok(()));
    }

    #[test]
    fn test_zero_max_faces_rejected() {
        let mut settings = MeshSettings::default();
        settings.detector.max_faces = 0;
        assert_eq!(settings.validate(), Err(SettingsError::NoFaces));
    }

    #[rstest]
    #[case::zero(0)]
    #[case::above_max(MAX_POLL_MS + 1)]
    #[case::would_wrap_negative(i32::MAX as u32 + 1)]
    fn test_poll_out_of_range(#[case] poll_ms: u32) {
        let settings = MeshSettings {
            poll_ms,
            ..MeshSettings::default()
        };
        assert_eq!(settings.validate(), Err(SettingsError::PollOutOfRange(poll_ms)));
    }

    #[test]
    fn test_max_poll_accepted() {
        let settings = MeshSettings {
            poll_ms: MAX_POLL_MS,
            ..MeshSettings::default()
        };
        assert_eq!(settings.validate(), Ok(()));
    }

    #[rstest]
    #[case(-1)]
    #[case(256)]
    fn test_exit_key_out_of_range(#[case] key: i32) {
        let settings = MeshSettings {
            exit_key: key,
            ..MeshSettings::default()
        };
        assert_eq!(settings.validate(), Err(SettingsError::ExitKeyOutOfRange(key)));
    }

    #[test]
    fn test_empty_title_rejected() {
        let settings = MeshSettings {
            window_title: String::new(),
            ..MeshSettings::default()
        };
        assert_eq!(settings.validate(), Err(SettingsError::EmptyTitle));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: MeshSettings =
            serde_json::from_str(r#"{"window_title": "mesh", "exit_key": 113}"#).unwrap();
        assert_eq!(settings.window_title, "mesh");
        assert_eq!(settings.exit_key, 113);
        assert_eq!(settings.poll_ms, 1);
        assert_eq!(settings.detector, DetectorSettings::default());
    }
}
