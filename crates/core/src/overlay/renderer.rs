//! Per-frame translation of detector observations into overlay elements.
//!
//! The renderer keeps exactly two pieces of state across frames: the
//! most recently observed roll angle and the selected overlay asset.
//! Everything else is rebuilt from scratch on every update, so the
//! element set always corresponds to the latest frame's observations.

use std::f64::consts::FRAC_PI_2;

use crate::detection::domain::face_observation::{FaceObservation, LandmarkKind};
use crate::overlay::assets::AssetId;
use crate::overlay::element::OverlayElement;
use crate::shared::constants::OVERLAY_TRANSITION;
use crate::shared::geometry::PreviewGeometry;

pub struct OverlayRenderer {
    roll_angle: f64,
    selected_asset: AssetId,
}

impl OverlayRenderer {
    pub fn new(default_asset: AssetId) -> Self {
        Self {
            roll_angle: 0.0,
            selected_asset: default_asset,
        }
    }

    /// The most recently observed roll angle, in radians.
    pub fn roll_angle(&self) -> f64 {
        self.roll_angle
    }

    pub fn selected_asset(&self) -> AssetId {
        self.selected_asset
    }

    /// Swap the overlay image for all subsequent frames.
    pub fn set_selected_asset(&mut self, asset: AssetId) {
        self.selected_asset = asset;
    }

    /// Replace the retained roll angle and return the increment.
    ///
    /// The state is replaced, never accumulated: after angles `a` then
    /// `b` the retained value is `b`. The returned delta is what a
    /// freshly created face shape must rotate by (negated) to stay
    /// aligned in the mirrored preview space.
    pub fn apply_roll_angle(&mut self, new_angle: f64) -> f64 {
        let delta = new_angle - self.roll_angle;
        self.roll_angle = new_angle;
        delta
    }

    /// Build the overlay element set for one frame's observations.
    ///
    /// Per observation (processed independently): the bounding box is
    /// mapped into display coordinates, the face shape rotated by the
    /// negated roll increment, and — when a nose landmark is present —
    /// a nose-image element attached along the landmark outline. An
    /// empty observation list yields an empty set; the previous frame's
    /// elements are retired by the consumer's clear-then-add discipline.
    pub fn update(
        &mut self,
        observations: &[FaceObservation],
        geometry: PreviewGeometry,
    ) -> Vec<OverlayElement> {
        let mut elements = Vec::with_capacity(observations.len() * 2);

        for obs in observations {
            let face_rect = geometry.map_rect(obs.bounding_box);

            // Missing roll: skip rotation, keep retained state unchanged.
            let rotation = match obs.roll {
                Some(roll) => -self.apply_roll_angle(roll),
                None => 0.0,
            };

            elements.push(OverlayElement::FaceBox {
                frame: face_rect,
                rotation,
            });

            if let Some(nose) = obs.landmark(LandmarkKind::Nose) {
                // Detector axes are swapped relative to the display
                // under mirrored capture: source x maps to display y
                // and vice versa.
                let path: Vec<(f64, f64)> = nose
                    .iter()
                    .map(|p| {
                        (
                            p.y * face_rect.height + face_rect.x,
                            p.x * face_rect.width + face_rect.y,
                        )
                    })
                    .collect();

                elements.push(OverlayElement::NoseImage {
                    path,
                    frame: face_rect,
                    // Asset art is pre-rotated a quarter turn; the roll
                    // term animates against the head tilt.
                    rotation: FRAC_PI_2 - self.roll_angle,
                    asset: self.selected_asset,
                    transition: OVERLAY_TRANSITION,
                });
            }
        }

        elements
    }
}
