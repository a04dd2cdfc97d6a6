pub mod detector_settings;
pub mod face_landmarks;
pub mod face_stages;
pub mod landmark_detector;
