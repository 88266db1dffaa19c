//! Capture session lifecycle and camera switching.
//!
//! The session owns the active frame source, the current facing, and
//! the preview geometry handed to the overlay renderer. Reconfiguration
//! is atomic: a replacement source is fully constructed before the old
//! one is released, so no frame is ever pulled from a half-configured
//! session.

use crate::capture::domain::camera_provider::{CameraProvider, Facing};
use crate::capture::domain::frame_source::FrameSource;
use crate::shared::frame::Frame;
use crate::shared::geometry::PreviewGeometry;

pub struct CaptureSession {
    provider: Box<dyn CameraProvider>,
    source: Option<Box<dyn FrameSource>>,
    facing: Facing,
    geometry: PreviewGeometry,
}

impl CaptureSession {
    /// Acquire the initial device.
    ///
    /// Acquisition failure is not an error: the session comes up
    /// inactive (no frames, no overlays) and the failure is logged,
    /// matching the quiet no-camera behavior of the preview feature.
    pub fn start(
        provider: Box<dyn CameraProvider>,
        facing: Facing,
        geometry: PreviewGeometry,
    ) -> Self {
        let source = match provider.open(facing) {
            Ok(source) => Some(source),
            Err(e) => {
                log::warn!("no {} camera available, preview disabled: {e}", facing.label());
                None
            }
        };
        Self {
            provider,
            source,
            facing,
            geometry,
        }
    }

    pub fn is_active(&self) -> bool {
        self.source.is_some()
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn geometry(&self) -> PreviewGeometry {
        self.geometry
    }

    pub fn set_display_size(&mut self, width: f64, height: f64) {
        self.geometry = PreviewGeometry::new(width, height);
    }

    /// Swap to the opposite-facing device.
    ///
    /// The replacement is constructed first; if construction fails the
    /// previous source stays installed and the session keeps its prior
    /// working configuration. Returns the facing in effect afterwards.
    pub fn toggle_facing(&mut self) -> Facing {
        let target = self.facing.opposite();
        match self.provider.open(target) {
            Ok(new_source) => {
                self.source = Some(new_source);
                self.facing = target;
            }
            Err(e) => {
                log::warn!(
                    "could not switch to {} camera, keeping {}: {e}",
                    target.label(),
                    self.facing.label()
                );
            }
        }
        self.facing
    }

    /// Pull the next frame from the active source.
    ///
    /// Returns `None` when the session is inactive or the source
    /// errored (logged); the capture loop treats both as "nothing to
    /// deliver right now".
    pub fn capture(&mut self) -> Option<Frame> {
        let source = self.source.as_mut()?;
        match source.next_frame() {
            Ok(frame) => Some(frame),
            Err(e) => {
                log::warn!("frame capture failed: {e}");
                None
            }
        }
    }
}
