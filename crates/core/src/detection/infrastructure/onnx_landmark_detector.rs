/// Face-landmark detector using ONNX Runtime via `ort`.
///
/// Runs a YOLO-pose face model (box + 5 keypoints per detection),
/// handling letterbox preprocessing, inference, and NMS post-processing,
/// then converts raw detections into frame-normalized `FaceObservation`s
/// with a roll angle derived from the eye keypoints.
use std::path::Path;

use crate::detection::domain::face_observation::{FaceObservation, LandmarkGroup, LandmarkKind};
use crate::detection::domain::landmark_detector::LandmarkDetector;
use crate::detection::infrastructure::execution_provider::preferred_execution_providers;
use crate::shared::frame::Frame;
use crate::shared::geometry::{NormPoint, NormRect};

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default confidence threshold for face detection.
pub const DEFAULT_CONFIDENCE: f64 = 0.25;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Number of keypoint values per detection (5 landmarks × x, y, conf).
const NUM_KEYPOINT_VALUES: usize = 15;

/// Minimum keypoint confidence to treat a landmark as visible.
const KEYPOINT_CONF_THRESH: f64 = 0.5;

/// Keypoint slots in model output order.
const KP_LEFT_EYE: usize = 0;
const KP_RIGHT_EYE: usize = 1;
const KP_NOSE: usize = 2;
const KP_MOUTH_LEFT: usize = 3;
const KP_MOUTH_RIGHT: usize = 4;

pub struct OnnxLandmarkDetector {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxLandmarkDetector {
    /// Load the ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape
    /// (expecting NCHW). Falls back to 640 if the shape is dynamic or
    /// unreadable.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    // shape is [N, C, H, W] — use H (square input)
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl LandmarkDetector for OnnxLandmarkDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<FaceObservation>, Box<dyn std::error::Error>> {
        // 1. Preprocess: letterbox + normalize → NCHW float32
        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);

        // 2. Inference
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("landmark model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape();

        // YOLO output is [1, features, detections] (transposed) or
        // [1, detections, features]. Handle both.
        let (num_dets, num_feats) = if shape.len() == 3 {
            if shape[1] < shape[2] {
                (shape[2], shape[1])
            } else {
                (shape[1], shape[2])
            }
        } else {
            return Err(format!("Unexpected model output shape: {shape:?}").into());
        };

        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;
        let transposed = shape.len() == 3 && shape[1] < shape[2];

        // 3. Parse detections back into frame pixel coordinates
        let mut raw_dets = Vec::new();
        for i in 0..num_dets {
            let row = if transposed {
                (0..num_feats)
                    .map(|f| data[f * num_dets + i])
                    .collect::<Vec<f32>>()
            } else {
                data[i * num_feats..(i + 1) * num_feats].to_vec()
            };

            // row format: [cx, cy, w, h, conf, kp0_x, kp0_y, kp0_conf, ...]
            if row.len() < 5 {
                continue;
            }
            let conf = row[4] as f64;
            if conf < self.confidence {
                continue;
            }

            let cx = row[0] as f64;
            let cy = row[1] as f64;
            let w = row[2] as f64;
            let h = row[3] as f64;

            let x1 = ((cx - w / 2.0) - pad_x as f64) / scale;
            let y1 = ((cy - h / 2.0) - pad_y as f64) / scale;
            let x2 = ((cx + w / 2.0) - pad_x as f64) / scale;
            let y2 = ((cy + h / 2.0) - pad_y as f64) / scale;

            let keypoints = if row.len() >= 5 + NUM_KEYPOINT_VALUES {
                let mut pts = [(0.0f64, 0.0f64); 5];
                for k in 0..5 {
                    let kconf = row[5 + k * 3 + 2] as f64;
                    if kconf >= KEYPOINT_CONF_THRESH {
                        let kx = row[5 + k * 3] as f64;
                        let ky = row[5 + k * 3 + 1] as f64;
                        pts[k] = ((kx - pad_x as f64) / scale, (ky - pad_y as f64) / scale);
                    }
                    // else: pts[k] stays (0.0, 0.0), treated as invisible
                }
                Some(pts)
            } else {
                None
            };

            raw_dets.push(RawDetection {
                x1,
                y1,
                x2,
                y2,
                confidence: conf,
                keypoints,
            });
        }

        // 4. NMS, then express each survivor as a FaceObservation
        let filtered = nms(&mut raw_dets, NMS_IOU_THRESH);

        Ok(filtered
            .iter()
            .map(|d| to_observation(d, frame.width(), frame.height(), frame.mirrored()))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Observation building
// ---------------------------------------------------------------------------

/// Convert one pixel-space detection into a normalized observation.
fn to_observation(det: &RawDetection, fw: u32, fh: u32, mirrored: bool) -> FaceObservation {
    let fw = fw as f64;
    let fh = fh as f64;

    let bounding_box = NormRect {
        x: det.x1 / fw,
        y: det.y1 / fh,
        width: (det.x2 - det.x1) / fw,
        height: (det.y2 - det.y1) / fh,
    }
    .clamped();

    let (roll, landmarks) = match det.keypoints {
        None => (None, Vec::new()),
        Some(pts) => {
            let roll = roll_from_eyes(pts[KP_LEFT_EYE], pts[KP_RIGHT_EYE], mirrored);
            let mut groups = Vec::new();
            for (slot, kind) in [
                (KP_LEFT_EYE, LandmarkKind::LeftEye),
                (KP_RIGHT_EYE, LandmarkKind::RightEye),
                (KP_NOSE, LandmarkKind::Nose),
                (KP_MOUTH_LEFT, LandmarkKind::MouthLeft),
                (KP_MOUTH_RIGHT, LandmarkKind::MouthRight),
            ] {
                if let Some(point) = box_normalized(pts[slot], det) {
                    groups.push(LandmarkGroup {
                        kind,
                        points: vec![point],
                    });
                }
            }
            (roll, groups)
        }
    };

    FaceObservation::new(bounding_box, roll, landmarks)
}

/// Roll angle from the eye line, in radians.
///
/// Returns `None` when either eye is invisible (x <= 0) or the eyes
/// coincide. Mirrored capture flips the sign so the reported roll
/// matches the subject's actual head tilt.
fn roll_from_eyes(left: (f64, f64), right: (f64, f64), mirrored: bool) -> Option<f64> {
    if left.0 <= 0.0 || right.0 <= 0.0 {
        return None;
    }
    let dx = right.0 - left.0;
    let dy = right.1 - left.1;
    if dx == 0.0 && dy == 0.0 {
        return None;
    }
    let angle = dy.atan2(dx);
    Some(if mirrored { -angle } else { angle })
}

/// Re-express a frame-pixel keypoint in bounding-box-normalized
/// coordinates. Invisible keypoints (x <= 0) yield `None`.
fn box_normalized(pt: (f64, f64), det: &RawDetection) -> Option<NormPoint> {
    if pt.0 <= 0.0 {
        return None;
    }
    let w = det.x2 - det.x1;
    let h = det.y2 - det.y1;
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    Some(NormPoint {
        x: ((pt.0 - det.x1) / w).clamp(0.0, 1.0),
        y: ((pt.1 - det.y1) / h).clamp(0.0, 1.0),
    })
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padded with 114/255 gray, YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray(); // [H, W, C] u8
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbor resize + copy into padded region
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDetection {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
    keypoints: Option<[(f64, f64); 5]>,
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if suppressed[j] {
                continue;
            }
            let iou = bbox_iou(
                &[dets[i].x1, dets[i].y1, dets[i].x2, dets[i].y2],
                &[dets[j].x1, dets[j].y1, dets[j].x2, dets[j].y2],
            );
            if iou > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn det(x1: f64, y1: f64, x2: f64, y2: f64) -> RawDetection {
        RawDetection {
            x1,
            y1,
            x2,
            y2,
            confidence: 0.9,
            keypoints: None,
        }
    }

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // 200x100 frame → letterbox to 640x640
        // Scale = min(640/200, 640/100) = 3.2, new = 640x320, pad_y = 160
        let data = vec![128u8; 200 * 100 * 3];
        let frame = Frame::new(data, 200, 100, 3, 0, false);
        let (tensor, scale, pad_x, pad_y) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert!((scale - 3.2).abs() < 0.01);
        assert_eq!(pad_x, 0);
        assert_eq!(pad_y, 160);
    }

    #[test]
    fn test_letterbox_values_normalized() {
        let data = vec![255u8; 100 * 50 * 3];
        let frame = Frame::new(data, 100, 50, 3, 0, false);
        let (tensor, _, pad_x, pad_y) = letterbox(&frame, 640);

        assert_eq!(pad_x, 0);
        assert!(pad_y > 0);

        // Image-region pixel ~1.0, pad pixel ~114/255
        let y = pad_y as usize + 1;
        assert!((tensor[[0, 0, y, 1]] - 1.0).abs() < 0.01);
        assert!((tensor[[0, 0, 0, 0]] - 114.0 / 255.0).abs() < 0.01);
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let mut dets = vec![det(0.0, 0.0, 100.0, 100.0), det(5.0, 5.0, 105.0, 105.0)];
        dets[1].confidence = 0.8;
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_nms_keeps_non_overlapping() {
        let mut dets = vec![det(0.0, 0.0, 50.0, 50.0), det(200.0, 200.0, 250.0, 250.0)];
        let kept = nms(&mut dets, 0.3);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_bbox_iou_perfect() {
        let b = [0.0, 0.0, 10.0, 10.0];
        assert!((bbox_iou(&b, &b) - 1.0).abs() < 1e-9);
    }

    // ── roll_from_eyes ──────────────────────────────────────────────

    #[test]
    fn test_roll_level_eyes_is_zero() {
        let roll = roll_from_eyes((100.0, 200.0), (160.0, 200.0), false).unwrap();
        assert_relative_eq!(roll, 0.0);
    }

    #[test]
    fn test_roll_tilted_head() {
        // Right eye 60 lower than left over a 60px span → 45°
        let roll = roll_from_eyes((100.0, 200.0), (160.0, 260.0), false).unwrap();
        assert_relative_eq!(roll, std::f64::consts::FRAC_PI_4, epsilon = 1e-9);
    }

    #[test]
    fn test_roll_mirrored_flips_sign() {
        let plain = roll_from_eyes((100.0, 200.0), (160.0, 260.0), false).unwrap();
        let mirrored = roll_from_eyes((100.0, 200.0), (160.0, 260.0), true).unwrap();
        assert_relative_eq!(mirrored, -plain);
    }

    #[test]
    fn test_roll_missing_eye_is_none() {
        assert!(roll_from_eyes((0.0, 0.0), (160.0, 200.0), false).is_none());
        assert!(roll_from_eyes((100.0, 200.0), (0.0, 0.0), false).is_none());
    }

    // ── box_normalized ──────────────────────────────────────────────

    #[test]
    fn test_box_normalized_center() {
        let d = det(100.0, 100.0, 200.0, 300.0);
        let p = box_normalized((150.0, 200.0), &d).unwrap();
        assert_relative_eq!(p.x, 0.5);
        assert_relative_eq!(p.y, 0.5);
    }

    #[test]
    fn test_box_normalized_clamps_outliers() {
        let d = det(100.0, 100.0, 200.0, 200.0);
        let p = box_normalized((250.0, 50.0), &d).unwrap();
        assert_relative_eq!(p.x, 1.0);
        assert_relative_eq!(p.y, 0.0);
    }

    #[test]
    fn test_box_normalized_invisible_is_none() {
        let d = det(100.0, 100.0, 200.0, 200.0);
        assert!(box_normalized((0.0, 0.0), &d).is_none());
    }

    // ── to_observation ──────────────────────────────────────────────

    #[test]
    fn test_to_observation_normalizes_bbox() {
        let d = det(64.0, 48.0, 192.0, 144.0);
        let obs = to_observation(&d, 640, 480, false);
        assert_relative_eq!(obs.bounding_box.x, 0.1);
        assert_relative_eq!(obs.bounding_box.y, 0.1);
        assert_relative_eq!(obs.bounding_box.width, 0.2);
        assert_relative_eq!(obs.bounding_box.height, 0.2);
    }

    #[test]
    fn test_to_observation_builds_nose_group() {
        let mut d = det(100.0, 100.0, 200.0, 200.0);
        d.keypoints = Some([
            (120.0, 140.0), // left eye
            (180.0, 140.0), // right eye
            (150.0, 160.0), // nose
            (130.0, 180.0),
            (170.0, 180.0),
        ]);
        let obs = to_observation(&d, 640, 480, false);
        let nose = obs.landmark(LandmarkKind::Nose).unwrap();
        assert_eq!(nose.len(), 1);
        assert_relative_eq!(nose[0].x, 0.5);
        assert_relative_eq!(nose[0].y, 0.6);
        assert_relative_eq!(obs.roll.unwrap(), 0.0);
    }

    #[test]
    fn test_to_observation_no_keypoints_no_roll() {
        let d = det(100.0, 100.0, 200.0, 200.0);
        let obs = to_observation(&d, 640, 480, false);
        assert!(obs.roll.is_none());
        assert!(obs.landmarks.is_empty());
    }
}
