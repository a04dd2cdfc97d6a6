pub const FACE_DETECTOR_MODEL_NAME: &str = "face_detection_short_range.onnx";
pub const FACE_LANDMARK_MODEL_NAME: &str = "face_landmark.onnx";

/// JSON list of `[start, end]` pairs for the full face mesh, kept next to the models.
pub const TESSELLATION_FILE_NAME: &str = "face_mesh_tessellation.json";

/// Camera opened when none is configured.
pub const DEFAULT_CAMERA_INDEX: u32 = 0;

pub const DEFAULT_WINDOW_TITLE: &str = "window";

/// Esc.
pub const DEFAULT_EXIT_KEY: i32 = 27;

/// Per-frame key poll, which also paces the loop.
pub const DEFAULT_POLL_MS: u32 = 1;

/// Longest accepted key poll.
pub const MAX_POLL_MS: u32 = 10_000;

pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f64 = 0.6;
pub const DEFAULT_MIN_TRACKING_CONFIDENCE: f64 = 0.6;
pub const DEFAULT_MAX_FACES: usize = 1;

pub const CAPTURE_FAILURE_MESSAGE: &str = "Failed to capture frame. Exiting...";
