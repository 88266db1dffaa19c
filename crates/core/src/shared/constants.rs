use std::time::Duration;

pub const LANDMARK_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const LANDMARK_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Frame-delivery channel capacity. A newer frame replaces an undelivered
/// older one, so detection never works against a backlog.
pub const FRAME_CHANNEL_CAPACITY: usize = 1;

/// Linear transition applied to the nose-image rotation each frame.
pub const OVERLAY_TRANSITION: Duration = Duration::from_millis(100);
