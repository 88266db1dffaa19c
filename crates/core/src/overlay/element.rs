use std::time::Duration;

use crate::overlay::assets::AssetId;
use crate::shared::geometry::DisplayRect;

/// A renderable overlay composited on top of the live preview.
///
/// The element collection is fully replaced every frame; there is no
/// cross-frame identity. Consumers clear the previous frame's elements
/// before adding the new set, so nothing stale stays visible.
#[derive(Clone, Debug, PartialEq)]
pub enum OverlayElement {
    /// The face-region shape, rotated by this frame's roll delta.
    FaceBox { frame: DisplayRect, rotation: f64 },
    /// The nose-landmark outline with the selected image fitted into
    /// the face box and rotated to follow the head.
    NoseImage {
        /// Closed outline in display coordinates.
        path: Vec<(f64, f64)>,
        /// Face box the image is fitted into (aspect-preserving).
        frame: DisplayRect,
        /// Radians; the pre-rotated asset plus the animated roll term.
        rotation: f64,
        asset: AssetId,
        /// Linear transition applied when the rotation changes.
        transition: Duration,
    },
}

impl OverlayElement {
    pub fn frame(&self) -> DisplayRect {
        match self {
            OverlayElement::FaceBox { frame, .. } => *frame,
            OverlayElement::NoseImage { frame, .. } => *frame,
        }
    }

    pub fn rotation(&self) -> f64 {
        match self {
            OverlayElement::FaceBox { rotation, .. } => *rotation,
            OverlayElement::NoseImage { rotation, .. } => *rotation,
        }
    }

    pub fn is_face_box(&self) -> bool {
        matches!(self, OverlayElement::FaceBox { .. })
    }

    pub fn is_nose_image(&self) -> bool {
        matches!(self, OverlayElement::NoseImage { .. })
    }
}
