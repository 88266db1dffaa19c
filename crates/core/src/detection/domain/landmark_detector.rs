use crate::detection::domain::face_observation::FaceObservation;
use crate::shared::frame::Frame;

/// Domain interface for face-landmark detection.
///
/// Implementations may be stateful (e.g., warm inference sessions),
/// hence `&mut self`. A failed invocation is non-fatal: callers log it
/// and skip the overlay update for that frame.
pub trait LandmarkDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceObservation>, Box<dyn std::error::Error>>;
}
