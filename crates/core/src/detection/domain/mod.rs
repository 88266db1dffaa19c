pub mod face_observation;
pub mod landmark_detector;
