use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use faceoverlay_core::capture::domain::camera_provider::Facing;
use faceoverlay_core::capture::domain::session::CaptureSession;
use faceoverlay_core::capture::infrastructure::openpnp_camera::OpenpnpCameraProvider;
use faceoverlay_core::detection::infrastructure::model_resolver;
use faceoverlay_core::detection::infrastructure::onnx_landmark_detector::{
    OnnxLandmarkDetector, DEFAULT_CONFIDENCE,
};
use faceoverlay_core::overlay::assets::{AssetId, AssetLibrary};
use faceoverlay_core::overlay::renderer::OverlayRenderer;
use faceoverlay_core::pipeline::overlay_pipeline::{self, OverlayUpdate, PipelineEvent};
use faceoverlay_core::shared::constants::{LANDMARK_MODEL_NAME, LANDMARK_MODEL_URL};
use faceoverlay_core::shared::geometry::PreviewGeometry;

pub enum WorkerMessage {
    DownloadProgress(u64, u64),
    Update(OverlayUpdate),
    FacingChanged(Facing),
    AssetChanged(AssetId),
    Error(String),
}

pub enum WorkerCommand {
    ToggleCamera,
    NextAsset,
}

pub struct WorkerParams {
    pub assets: Arc<AssetLibrary>,
    pub display_width: f64,
    pub display_height: f64,
}

/// Resolve the model, open the camera and run the overlay pipeline,
/// forwarding its events to the UI.
pub fn spawn(
    params: WorkerParams,
) -> (Receiver<WorkerMessage>, Sender<WorkerCommand>, Arc<AtomicBool>) {
    let (tx, rx) = crossbeam_channel::unbounded::<WorkerMessage>();
    let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded::<WorkerCommand>();
    let cancelled = Arc::new(AtomicBool::new(false));
    let cancelled_clone = cancelled.clone();

    thread::spawn(move || {
        if let Err(e) = run(&tx, &cmd_rx, &cancelled_clone, &params) {
            let _ = tx.send(WorkerMessage::Error(e.to_string()));
        }
    });

    (rx, cmd_tx, cancelled)
}

fn run(
    tx: &Sender<WorkerMessage>,
    commands: &Receiver<WorkerCommand>,
    cancelled: &Arc<AtomicBool>,
    params: &WorkerParams,
) -> Result<(), Box<dyn std::error::Error>> {
    let tx_dl = tx.clone();
    let model_path = model_resolver::resolve(
        LANDMARK_MODEL_NAME,
        LANDMARK_MODEL_URL,
        None,
        Some(Box::new(move |downloaded, total| {
            let _ = tx_dl.send(WorkerMessage::DownloadProgress(downloaded, total));
        })),
    )?;

    if cancelled.load(Ordering::Relaxed) {
        return Ok(());
    }

    let detector = OnnxLandmarkDetector::new(&model_path, DEFAULT_CONFIDENCE)?;
    let session = CaptureSession::start(
        Box::new(OpenpnpCameraProvider::new()),
        Facing::Front,
        PreviewGeometry::new(params.display_width, params.display_height),
    );
    let renderer = OverlayRenderer::new(params.assets.default_asset());
    let pipeline = overlay_pipeline::spawn(
        session,
        Box::new(detector),
        renderer,
        params.assets.clone(),
    );

    loop {
        if cancelled.load(Ordering::Relaxed) {
            pipeline.shutdown();
            return Ok(());
        }

        while let Ok(cmd) = commands.try_recv() {
            match cmd {
                WorkerCommand::ToggleCamera => pipeline.toggle_facing(),
                WorkerCommand::NextAsset => pipeline.next_asset(),
            }
        }

        match pipeline.events().recv_timeout(Duration::from_millis(100)) {
            Ok(PipelineEvent::Update(update)) => {
                if tx.send(WorkerMessage::Update(update)).is_err() {
                    pipeline.shutdown();
                    return Ok(());
                }
            }
            Ok(PipelineEvent::FacingChanged(facing)) => {
                let _ = tx.send(WorkerMessage::FacingChanged(facing));
            }
            Ok(PipelineEvent::AssetChanged(asset)) => {
                let _ = tx.send(WorkerMessage::AssetChanged(asset));
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                return Ok(());
            }
        }
    }
}
