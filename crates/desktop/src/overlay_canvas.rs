//! Canvas layer drawing overlay elements on top of the live preview.
//!
//! The element set is replaced wholesale on every detection update; the
//! nose image additionally eases toward its new placement over the
//! element's transition window, so head tilts read as smooth motion
//! instead of per-frame jumps.

use std::time::Duration;

use iced::mouse;
use iced::widget::canvas::{self, Geometry, Path, Stroke};
use iced::widget::image::Handle;
use iced::{Color, Point, Rectangle, Renderer, Size, Theme, Vector};

use faceoverlay_core::overlay::element::OverlayElement;
use faceoverlay_core::shared::geometry::DisplayRect;

const FACE_BOX_COLOR: Color = Color::from_rgb(1.0, 0.25, 0.25);
const FACE_BOX_WIDTH: f32 = 2.0;

/// Decoded overlay images ready for canvas drawing, indexed by asset.
#[derive(Clone)]
pub struct AssetSprites {
    pub handles: Vec<Handle>,
    pub sizes: Vec<(f32, f32)>,
}

pub struct OverlayScene {
    pub elements: Vec<OverlayElement>,
    pub sprites: AssetSprites,
}

impl<Message> canvas::Program<Message> for OverlayScene {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        for element in &self.elements {
            match element {
                OverlayElement::FaceBox {
                    frame: rect,
                    rotation,
                } => {
                    let (cx, cy) = rect.center();
                    frame.with_save(|f| {
                        f.translate(Vector::new(cx as f32, cy as f32));
                        f.rotate(*rotation as f32);
                        let size = Size::new(rect.width as f32, rect.height as f32);
                        let top_left = Point::new(-size.width / 2.0, -size.height / 2.0);
                        f.stroke(
                            &Path::rectangle(top_left, size),
                            Stroke::default()
                                .with_color(FACE_BOX_COLOR)
                                .with_width(FACE_BOX_WIDTH),
                        );
                    });
                }
                OverlayElement::NoseImage {
                    path,
                    frame: rect,
                    rotation,
                    asset,
                    ..
                } => {
                    let index = asset.index() % self.sprites.handles.len().max(1);
                    let Some(handle) = self.sprites.handles.get(index) else {
                        continue;
                    };
                    let (img_w, img_h) = self.sprites.sizes[index];
                    let size = fitted_size(img_w, img_h, rect);
                    let (cx, cy) = anchor(path, rect);

                    frame.with_save(|f| {
                        f.translate(Vector::new(cx as f32, cy as f32));
                        f.rotate(*rotation as f32);
                        let top_left = Point::new(-size.width / 2.0, -size.height / 2.0);
                        f.draw_image(
                            Rectangle::new(top_left, size),
                            canvas::Image::new(handle.clone()),
                        );
                    });
                }
            }
        }

        vec![frame.into_geometry()]
    }
}

/// Aspect-preserving fit of an image into the face box.
fn fitted_size(img_w: f32, img_h: f32, rect: &DisplayRect) -> Size {
    if img_w <= 0.0 || img_h <= 0.0 {
        return Size::new(rect.width as f32, rect.height as f32);
    }
    let scale = ((rect.width as f32) / img_w).min((rect.height as f32) / img_h);
    Size::new(img_w * scale, img_h * scale)
}

/// Image anchor: the nose outline's centroid, or the box center when
/// the outline is empty.
fn anchor(path: &[(f64, f64)], rect: &DisplayRect) -> (f64, f64) {
    if path.is_empty() {
        return rect.center();
    }
    let n = path.len() as f64;
    let (sx, sy) = path
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.0, sy + p.1));
    (sx / n, sy / n)
}

/// Interpolate last frame's elements toward the current ones.
///
/// Only the nose image eases; its pace comes from the element's own
/// transition window. Face boxes and any unpaired element snap to their
/// current placement.
pub fn blend(
    previous: &[OverlayElement],
    current: &[OverlayElement],
    elapsed: Duration,
) -> Vec<OverlayElement> {
    current
        .iter()
        .enumerate()
        .map(|(i, cur)| match (previous.get(i), cur) {
            (
                Some(OverlayElement::NoseImage {
                    path: prev_path,
                    frame: prev_frame,
                    rotation: prev_rotation,
                    ..
                }),
                OverlayElement::NoseImage {
                    path,
                    frame,
                    rotation,
                    asset,
                    transition,
                },
            ) => {
                let t = progress(elapsed, *transition);
                if t >= 1.0 {
                    return cur.clone();
                }
                let blended_path = if prev_path.len() == path.len() {
                    prev_path
                        .iter()
                        .zip(path)
                        .map(|(a, b)| (lerp(a.0, b.0, t), lerp(a.1, b.1, t)))
                        .collect()
                } else {
                    path.clone()
                };
                OverlayElement::NoseImage {
                    path: blended_path,
                    frame: lerp_rect(prev_frame, frame, t),
                    rotation: lerp(*prev_rotation, *rotation, t),
                    asset: *asset,
                    transition: *transition,
                }
            }
            _ => cur.clone(),
        })
        .collect()
}

fn progress(elapsed: Duration, transition: Duration) -> f64 {
    if transition.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f64() / transition.as_secs_f64()).clamp(0.0, 1.0)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn lerp_rect(a: &DisplayRect, b: &DisplayRect, t: f64) -> DisplayRect {
    DisplayRect {
        x: lerp(a.x, b.x, t),
        y: lerp(a.y, b.y, t),
        width: lerp(a.width, b.width, t),
        height: lerp(a.height, b.height, t),
    }
}
