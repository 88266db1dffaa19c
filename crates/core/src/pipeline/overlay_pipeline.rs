//! Two-thread live overlay pipeline.
//!
//! A capture thread drives the [`CaptureSession`] and pushes frames into
//! a latest-wins channel; a detection thread runs the landmark detector
//! and the overlay renderer on whatever frame is freshest, publishing one
//! [`OverlayUpdate`] per processed frame. Commands from the UI are routed
//! to whichever thread owns the state they touch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::capture::domain::camera_provider::Facing;
use crate::capture::domain::session::CaptureSession;
use crate::detection::domain::landmark_detector::LandmarkDetector;
use crate::overlay::assets::{AssetId, AssetLibrary};
use crate::overlay::element::OverlayElement;
use crate::overlay::renderer::OverlayRenderer;
use crate::pipeline::frame_channel::{self, LatestReceiver, LatestSender};
use crate::shared::frame::Frame;
use crate::shared::geometry::PreviewGeometry;

/// Pause between capture attempts while the session has no source.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// One processed frame with the overlay that replaces the previous one.
pub struct OverlayUpdate {
    pub frame: Frame,
    pub elements: Vec<OverlayElement>,
}

pub enum PipelineEvent {
    Update(OverlayUpdate),
    FacingChanged(Facing),
    AssetChanged(AssetId),
}

enum CaptureCommand {
    ToggleFacing,
    SetDisplaySize(f64, f64),
}

enum RenderCommand {
    NextAsset,
}

struct FrameMessage {
    frame: Frame,
    geometry: PreviewGeometry,
}

/// Handle to a running pipeline. Dropping it does not stop the threads;
/// call [`PipelineHandle::shutdown`] first.
pub struct PipelineHandle {
    events: Receiver<PipelineEvent>,
    capture_tx: Sender<CaptureCommand>,
    render_tx: Sender<RenderCommand>,
    cancelled: Arc<AtomicBool>,
}

impl PipelineHandle {
    pub fn events(&self) -> &Receiver<PipelineEvent> {
        &self.events
    }

    /// Ask the capture thread to switch between front and back cameras.
    /// The result arrives as [`PipelineEvent::FacingChanged`].
    pub fn toggle_facing(&self) {
        let _ = self.capture_tx.send(CaptureCommand::ToggleFacing);
    }

    /// Cycle to the next overlay asset. The selection arrives back as
    /// [`PipelineEvent::AssetChanged`].
    pub fn next_asset(&self) {
        let _ = self.render_tx.send(RenderCommand::NextAsset);
    }

    pub fn set_display_size(&self, width: f64, height: f64) {
        let _ = self
            .capture_tx
            .send(CaptureCommand::SetDisplaySize(width, height));
    }

    pub fn shutdown(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

pub fn spawn(
    session: CaptureSession,
    detector: Box<dyn LandmarkDetector>,
    renderer: OverlayRenderer,
    assets: Arc<AssetLibrary>,
) -> PipelineHandle {
    let (event_tx, event_rx) = crossbeam_channel::unbounded::<PipelineEvent>();
    let (capture_tx, capture_rx) = crossbeam_channel::unbounded::<CaptureCommand>();
    let (render_tx, render_rx) = crossbeam_channel::unbounded::<RenderCommand>();
    let (frame_tx, frame_rx) = frame_channel::latest_wins::<FrameMessage>();
    let cancelled = Arc::new(AtomicBool::new(false));

    let capture_cancelled = cancelled.clone();
    let capture_events = event_tx.clone();
    thread::spawn(move || {
        run_capture(session, frame_tx, capture_rx, capture_events, &capture_cancelled);
    });

    let detect_cancelled = cancelled.clone();
    thread::spawn(move || {
        run_detection(
            detector,
            renderer,
            assets,
            frame_rx,
            render_rx,
            event_tx,
            &detect_cancelled,
        );
    });

    PipelineHandle {
        events: event_rx,
        capture_tx,
        render_tx,
        cancelled,
    }
}

fn run_capture(
    mut session: CaptureSession,
    frames: LatestSender<FrameMessage>,
    commands: Receiver<CaptureCommand>,
    events: Sender<PipelineEvent>,
    cancelled: &AtomicBool,
) {
    while !cancelled.load(Ordering::Relaxed) {
        while let Ok(cmd) = commands.try_recv() {
            match cmd {
                CaptureCommand::ToggleFacing => {
                    let facing = session.toggle_facing();
                    let _ = events.send(PipelineEvent::FacingChanged(facing));
                }
                CaptureCommand::SetDisplaySize(w, h) => session.set_display_size(w, h),
            }
        }

        match session.capture() {
            Some(frame) => {
                let msg = FrameMessage {
                    frame,
                    geometry: session.geometry(),
                };
                if frames.send(msg).is_err() {
                    break;
                }
            }
            None => thread::sleep(IDLE_POLL),
        }
    }
    log::debug!("capture thread stopping, {} frames dropped", frames.dropped());
}

fn run_detection(
    mut detector: Box<dyn LandmarkDetector>,
    mut renderer: OverlayRenderer,
    assets: Arc<AssetLibrary>,
    frames: LatestReceiver<FrameMessage>,
    commands: Receiver<RenderCommand>,
    events: Sender<PipelineEvent>,
    cancelled: &AtomicBool,
) {
    while !cancelled.load(Ordering::Relaxed) {
        let msg = match frames.recv() {
            Ok(msg) => msg,
            Err(_) => break,
        };

        while let Ok(cmd) = commands.try_recv() {
            match cmd {
                RenderCommand::NextAsset => {
                    let next = assets.next_after(renderer.selected_asset());
                    renderer.set_selected_asset(next);
                    let _ = events.send(PipelineEvent::AssetChanged(next));
                }
            }
        }

        // A detector failure clears the overlay rather than freezing
        // the last good one on screen.
        let elements = match detector.detect(&msg.frame) {
            Ok(observations) => renderer.update(&observations, msg.geometry),
            Err(e) => {
                log::error!("Landmark detection failed: {e}");
                Vec::new()
            }
        };

        let update = OverlayUpdate {
            frame: msg.frame,
            elements,
        };
        if events.send(PipelineEvent::Update(update)).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Instant;

    use crate::capture::domain::camera_provider::CameraProvider;
    use crate::capture::domain::frame_source::FrameSource;
    use crate::detection::domain::face_observation::{
        FaceObservation, LandmarkGroup, LandmarkKind,
    };
    use crate::shared::geometry::{NormPoint, NormRect};

    struct PacedSource {
        index: usize,
    }

    impl FrameSource for PacedSource {
        fn next_frame(&mut self) -> Result<Frame, Box<dyn std::error::Error>> {
            thread::sleep(Duration::from_millis(2));
            let frame = Frame::new(vec![0u8; 8 * 6 * 3], 8, 6, 3, self.index, false);
            self.index += 1;
            Ok(frame)
        }

        fn dimensions(&self) -> (u32, u32) {
            (8, 6)
        }
    }

    struct PacedProvider;

    impl CameraProvider for PacedProvider {
        fn open(
            &self,
            _facing: Facing,
        ) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
            Ok(Box::new(PacedSource { index: 0 }))
        }
    }

    struct OneFaceDetector;

    impl LandmarkDetector for OneFaceDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
        ) -> Result<Vec<FaceObservation>, Box<dyn std::error::Error>> {
            Ok(vec![FaceObservation {
                bounding_box: NormRect {
                    x: 0.25,
                    y: 0.25,
                    width: 0.5,
                    height: 0.5,
                },
                roll: Some(0.1),
                landmarks: vec![LandmarkGroup {
                    kind: LandmarkKind::Nose,
                    points: vec![NormPoint { x: 0.5, y: 0.5 }],
                }],
            }])
        }
    }

    struct FailingDetector;

    impl LandmarkDetector for FailingDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
        ) -> Result<Vec<FaceObservation>, Box<dyn std::error::Error>> {
            Err("inference backend gone".into())
        }
    }

    fn start_session() -> CaptureSession {
        CaptureSession::start(
            Box::new(PacedProvider),
            Facing::Front,
            PreviewGeometry::new(640.0, 480.0),
        )
    }

    fn recv_update(handle: &PipelineHandle) -> OverlayUpdate {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match handle.events().recv_timeout(remaining).unwrap() {
                PipelineEvent::Update(update) => return update,
                _ => continue,
            }
        }
    }

    #[test]
    fn test_pipeline_publishes_overlay_updates() {
        let handle = spawn(
            start_session(),
            Box::new(OneFaceDetector),
            OverlayRenderer::new(AssetId::default()),
            Arc::new(AssetLibrary::builtin().unwrap()),
        );

        let update = recv_update(&handle);
        // One face box plus one nose image per face.
        assert_eq!(update.elements.len(), 2);
        assert_eq!(update.frame.width(), 8);
        handle.shutdown();
    }

    #[test]
    fn test_detector_failure_clears_overlay() {
        let handle = spawn(
            start_session(),
            Box::new(FailingDetector),
            OverlayRenderer::new(AssetId::default()),
            Arc::new(AssetLibrary::builtin().unwrap()),
        );

        let update = recv_update(&handle);
        assert!(update.elements.is_empty());
        handle.shutdown();
    }

    #[test]
    fn test_toggle_facing_reports_new_facing() {
        let handle = spawn(
            start_session(),
            Box::new(OneFaceDetector),
            OverlayRenderer::new(AssetId::default()),
            Arc::new(AssetLibrary::builtin().unwrap()),
        );

        handle.toggle_facing();
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match handle.events().recv_timeout(remaining).unwrap() {
                PipelineEvent::FacingChanged(facing) => {
                    assert_eq!(facing, Facing::Back);
                    break;
                }
                _ => continue,
            }
        }
        handle.shutdown();
    }

    #[test]
    fn test_set_display_size_rescales_overlay() {
        let handle = spawn(
            start_session(),
            Box::new(OneFaceDetector),
            OverlayRenderer::new(AssetId::default()),
            Arc::new(AssetLibrary::builtin().unwrap()),
        );

        handle.set_display_size(100.0, 100.0);
        // The face box is at x = 0.25 normalized, so once the new
        // geometry reaches the capture thread updates land at x = 25.
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let update = recv_update(&handle);
            if (update.elements[0].frame().x - 25.0).abs() < 1e-9 {
                break;
            }
            assert!(Instant::now() < deadline, "geometry change never applied");
        }
        handle.shutdown();
    }

    #[test]
    fn test_next_asset_cycles_selection() {
        let assets = Arc::new(AssetLibrary::builtin().unwrap());
        let first = assets.default_asset();
        let expected = assets.next_after(first);

        let handle = spawn(
            start_session(),
            Box::new(OneFaceDetector),
            OverlayRenderer::new(first),
            assets.clone(),
        );

        handle.next_asset();
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match handle.events().recv_timeout(remaining).unwrap() {
                PipelineEvent::AssetChanged(id) => {
                    assert_eq!(id, expected);
                    break;
                }
                _ => continue,
            }
        }
        handle.shutdown();
    }
}
