use crate::capture::domain::frame_source::FrameSource;

/// Which way the active camera points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Facing {
    Front,
    Back,
}

impl Facing {
    pub fn opposite(self) -> Facing {
        match self {
            Facing::Front => Facing::Back,
            Facing::Back => Facing::Front,
        }
    }

    /// Front-facing capture delivers a horizontally flipped picture.
    pub fn mirrored(self) -> bool {
        matches!(self, Facing::Front)
    }

    pub fn label(self) -> &'static str {
        match self {
            Facing::Front => "Front",
            Facing::Back => "Back",
        }
    }
}

/// Domain interface for acquiring capture devices.
///
/// Opening enumerates the wide-angle-style devices for the requested
/// facing and fails cleanly when none exists; the session decides what
/// that failure means (feature disabled at startup, rollback on toggle).
pub trait CameraProvider: Send {
    fn open(&self, facing: Facing) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opposite_round_trips() {
        assert_eq!(Facing::Front.opposite(), Facing::Back);
        assert_eq!(Facing::Back.opposite(), Facing::Front);
        assert_eq!(Facing::Front.opposite().opposite(), Facing::Front);
    }

    #[test]
    fn test_only_front_is_mirrored() {
        assert!(Facing::Front.mirrored());
        assert!(!Facing::Back.mirrored());
    }
}
