pub const DETECTOR_MODEL_NAME: &str = "blazeface_short_range.onnx";
pub const EMOTION_MODEL_NAME: &str = "emotion_recognition.onnx";

/// Side length of the square patch the emotion classifier consumes.
pub const PATCH_SIZE: u32 = 48;

pub const DEFAULT_SCALE_FACTOR: f64 = 1.3;
pub const DEFAULT_MIN_NEIGHBORS: usize = 5;

pub const FIRST_WEEK_DAYS: i64 = 7;
pub const ACCESS_WINDOW_DAYS: i64 = 30;

pub const DEFAULT_TRUSTED_ORIGIN: &str = "http://localhost:63342";
