use crate::shared::geometry::{NormPoint, NormRect};

/// A named facial feature located by the detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LandmarkKind {
    LeftEye,
    RightEye,
    Nose,
    MouthLeft,
    MouthRight,
}

/// An ordered set of points locating one facial feature.
///
/// Points are normalized within the observation's bounding box, not the
/// whole frame: (0,0) is the box origin, (1,1) the opposite corner.
#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkGroup {
    pub kind: LandmarkKind,
    pub points: Vec<NormPoint>,
}

/// One detected face for a single frame.
///
/// Produced fresh each frame and consumed transiently by the overlay
/// renderer; nothing here survives across frames.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceObservation {
    /// Face bounding box in frame-normalized coordinates.
    pub bounding_box: NormRect,
    /// Roll of the face around the axis perpendicular to the image
    /// plane, in radians. `None` when the detector could not see both
    /// eyes well enough to measure it.
    pub roll: Option<f64>,
    pub landmarks: Vec<LandmarkGroup>,
}

impl FaceObservation {
    pub fn new(bounding_box: NormRect, roll: Option<f64>, landmarks: Vec<LandmarkGroup>) -> Self {
        Self {
            bounding_box,
            roll,
            landmarks,
        }
    }

    /// Points of the named landmark group, if the detector produced one.
    pub fn landmark(&self, kind: LandmarkKind) -> Option<&[NormPoint]> {
        self.landmarks
            .iter()
            .find(|g| g.kind == kind)
            .map(|g| g.points.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation_with(kinds: &[LandmarkKind]) -> FaceObservation {
        let landmarks = kinds
            .iter()
            .map(|&kind| LandmarkGroup {
                kind,
                points: vec![NormPoint { x: 0.5, y: 0.5 }],
            })
            .collect();
        FaceObservation::new(NormRect::FULL, None, landmarks)
    }

    #[test]
    fn test_landmark_lookup_finds_group() {
        let obs = observation_with(&[LandmarkKind::LeftEye, LandmarkKind::Nose]);
        let nose = obs.landmark(LandmarkKind::Nose).unwrap();
        assert_eq!(nose.len(), 1);
    }

    #[test]
    fn test_landmark_lookup_missing_group() {
        let obs = observation_with(&[LandmarkKind::LeftEye]);
        assert!(obs.landmark(LandmarkKind::Nose).is_none());
    }

    #[test]
    fn test_landmark_lookup_empty() {
        let obs = observation_with(&[]);
        assert!(obs.landmark(LandmarkKind::Nose).is_none());
    }
}
