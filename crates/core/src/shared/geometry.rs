//! Normalized-coordinate geometry and the preview mapping.
//!
//! Detector output lives in [0,1] coordinates relative to the frame;
//! overlay elements live in display pixels. `PreviewGeometry` is the
//! bridge, supplied by the capture session for the active preview size.

/// A rectangle in normalized [0,1] coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormRect {
    pub const FULL: NormRect = NormRect {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    /// Clamps origin and extent so the rectangle stays inside [0,1]².
    pub fn clamped(self) -> NormRect {
        let x = self.x.clamp(0.0, 1.0);
        let y = self.y.clamp(0.0, 1.0);
        NormRect {
            x,
            y,
            width: self.width.clamp(0.0, 1.0 - x),
            height: self.height.clamp(0.0, 1.0 - y),
        }
    }
}

/// A point in normalized [0,1] coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormPoint {
    pub x: f64,
    pub y: f64,
}

/// A rectangle in display pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DisplayRect {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Maps normalized detector coordinates into display pixels.
///
/// The session controller owns an instance sized to the active preview
/// surface and hands it to the overlay renderer each frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreviewGeometry {
    pub display_width: f64,
    pub display_height: f64,
}

impl PreviewGeometry {
    pub fn new(display_width: f64, display_height: f64) -> Self {
        Self {
            display_width,
            display_height,
        }
    }

    pub fn map_rect(&self, rect: NormRect) -> DisplayRect {
        DisplayRect {
            x: rect.x * self.display_width,
            y: rect.y * self.display_height,
            width: rect.width * self.display_width,
            height: rect.height * self.display_height,
        }
    }

    pub fn map_point(&self, point: NormPoint) -> (f64, f64) {
        (
            point.x * self.display_width,
            point.y * self.display_height,
        )
    }
}
