use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use iced::widget::image::Handle;
use iced::widget::{button, canvas, column, container, row, stack, text};
use iced::{Element, Length, Subscription, Task, Theme};

use faceoverlay_core::capture::domain::camera_provider::Facing;
use faceoverlay_core::overlay::assets::{AssetId, AssetLibrary};
use faceoverlay_core::overlay::element::OverlayElement;
use faceoverlay_core::shared::frame::Frame;

use crate::overlay_canvas::{self, AssetSprites, OverlayScene};
use crate::workers::overlay_worker::{self, WorkerCommand, WorkerMessage, WorkerParams};

pub const PREVIEW_WIDTH: f32 = 480.0;
pub const PREVIEW_HEIGHT: f32 = 360.0;
pub const WINDOW_WIDTH: f32 = 480.0;
pub const WINDOW_HEIGHT: f32 = 430.0;

/// UI refresh cadence; also paces the overlay transition.
const TICK_INTERVAL: Duration = Duration::from_millis(33);

#[derive(Debug, Clone)]
pub enum Message {
    Tick,
    ToggleCamera,
    NextOverlayImage,
}

pub struct App {
    assets: Option<Arc<AssetLibrary>>,
    sprites: AssetSprites,
    facing: Facing,
    current_asset: AssetId,
    frame_handle: Option<Handle>,
    previous_elements: Vec<OverlayElement>,
    elements: Vec<OverlayElement>,
    updated_at: Instant,
    download: Option<(u64, u64)>,
    error: Option<String>,
    worker_rx: Option<Receiver<WorkerMessage>>,
    worker_tx: Option<Sender<WorkerCommand>>,
    worker_cancelled: Option<Arc<AtomicBool>>,
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        let mut app = Self {
            assets: None,
            sprites: AssetSprites {
                handles: Vec::new(),
                sizes: Vec::new(),
            },
            facing: Facing::Front,
            current_asset: AssetId::default(),
            frame_handle: None,
            previous_elements: Vec::new(),
            elements: Vec::new(),
            updated_at: Instant::now(),
            download: None,
            error: None,
            worker_rx: None,
            worker_tx: None,
            worker_cancelled: None,
        };

        match AssetLibrary::builtin() {
            Ok(lib) => {
                let lib = Arc::new(lib);
                app.sprites = build_sprites(&lib);
                app.current_asset = lib.default_asset();

                let (rx, tx, cancelled) = overlay_worker::spawn(WorkerParams {
                    assets: lib.clone(),
                    display_width: PREVIEW_WIDTH as f64,
                    display_height: PREVIEW_HEIGHT as f64,
                });
                app.assets = Some(lib);
                app.worker_rx = Some(rx);
                app.worker_tx = Some(tx);
                app.worker_cancelled = Some(cancelled);
            }
            Err(e) => {
                log::error!("Embedded overlay assets failed to decode: {e}");
                app.error = Some(format!("Overlay assets failed to load: {e}"));
            }
        }

        (app, Task::none())
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => {
                let messages: Vec<WorkerMessage> = self
                    .worker_rx
                    .as_ref()
                    .map(|rx| rx.try_iter().collect())
                    .unwrap_or_default();
                for msg in messages {
                    self.handle_worker_message(msg);
                }
            }
            Message::ToggleCamera => {
                if let Some(tx) = &self.worker_tx {
                    let _ = tx.send(WorkerCommand::ToggleCamera);
                }
            }
            Message::NextOverlayImage => {
                if let Some(tx) = &self.worker_tx {
                    let _ = tx.send(WorkerCommand::NextAsset);
                }
            }
        }
        Task::none()
    }

    fn handle_worker_message(&mut self, msg: WorkerMessage) {
        match msg {
            WorkerMessage::DownloadProgress(downloaded, total) => {
                self.download = Some((downloaded, total));
            }
            WorkerMessage::Update(update) => {
                self.download = None;
                self.frame_handle = frame_to_handle(&update.frame);
                // Snapshot the in-flight blend so a new update continues
                // from wherever the animation currently is.
                self.previous_elements = overlay_canvas::blend(
                    &self.previous_elements,
                    &self.elements,
                    self.updated_at.elapsed(),
                );
                self.elements = update.elements;
                self.updated_at = Instant::now();
            }
            WorkerMessage::FacingChanged(facing) => {
                self.facing = facing;
            }
            WorkerMessage::AssetChanged(asset) => {
                self.current_asset = asset;
            }
            WorkerMessage::Error(e) => {
                log::error!("Overlay worker failed: {e}");
                self.error = Some(e);
            }
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let preview: Element<'_, Message> = match &self.frame_handle {
            Some(handle) => {
                let scene = OverlayScene {
                    elements: overlay_canvas::blend(
                        &self.previous_elements,
                        &self.elements,
                        self.updated_at.elapsed(),
                    ),
                    sprites: self.sprites.clone(),
                };
                stack![
                    iced::widget::image(handle.clone())
                        .width(Length::Fixed(PREVIEW_WIDTH))
                        .height(Length::Fixed(PREVIEW_HEIGHT))
                        .content_fit(iced::ContentFit::Fill),
                    canvas(scene)
                        .width(Length::Fixed(PREVIEW_WIDTH))
                        .height(Length::Fixed(PREVIEW_HEIGHT)),
                ]
                .into()
            }
            None => container(text(self.status_line()))
                .center_x(Length::Fixed(PREVIEW_WIDTH))
                .center_y(Length::Fixed(PREVIEW_HEIGHT))
                .into(),
        };

        let asset_label = self
            .assets
            .as_ref()
            .map(|lib| lib.name(self.current_asset))
            .unwrap_or("none");

        let controls = row![
            button(text(format!("Camera: {}", self.facing.label())))
                .on_press(Message::ToggleCamera)
                .padding([6, 14]),
            button(text(format!("Overlay: {asset_label}")))
                .on_press(Message::NextOverlayImage)
                .padding([6, 14]),
        ]
        .spacing(8);

        let mut content = column![preview, container(controls).center_x(Length::Fill)]
            .spacing(12)
            .padding(12);

        if self.frame_handle.is_some() {
            if let Some(err) = &self.error {
                content = content.push(text(err.clone()).size(12));
            }
        }

        content.into()
    }

    pub fn theme(&self) -> Theme {
        Theme::Dark
    }

    pub fn subscription(&self) -> Subscription<Message> {
        iced::time::every(TICK_INTERVAL).map(|_| Message::Tick)
    }

    fn status_line(&self) -> String {
        if let Some(err) = &self.error {
            return err.clone();
        }
        match self.download {
            Some((downloaded, total)) if total > 0 => format!(
                "Downloading face model\u{2026} {}%",
                downloaded * 100 / total
            ),
            Some(_) => "Downloading face model\u{2026}".to_string(),
            None => "Waiting for camera\u{2026}".to_string(),
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(cancelled) = &self.worker_cancelled {
            cancelled.store(true, Ordering::Relaxed);
        }
    }
}

/// Decode the overlay images once into canvas-ready handles.
fn build_sprites(lib: &AssetLibrary) -> AssetSprites {
    let mut sprites = AssetSprites {
        handles: Vec::with_capacity(lib.len()),
        sizes: Vec::with_capacity(lib.len()),
    };
    let mut id = lib.default_asset();
    for _ in 0..lib.len() {
        let img = lib.image(id);
        sprites.sizes.push((img.width() as f32, img.height() as f32));
        sprites
            .handles
            .push(Handle::from_rgba(img.width(), img.height(), img.as_raw().clone()));
        id = lib.next_after(id);
    }
    sprites
}

/// Repack a captured frame as an RGBA handle for the preview widget.
fn frame_to_handle(frame: &Frame) -> Option<Handle> {
    match frame.channels() {
        4 => Some(Handle::from_rgba(
            frame.width(),
            frame.height(),
            frame.data().to_vec(),
        )),
        3 => {
            let mut rgba = Vec::with_capacity(frame.data().len() / 3 * 4);
            for px in frame.data().chunks_exact(3) {
                rgba.extend_from_slice(&[px[0], px[1], px[2], 0xff]);
            }
            Some(Handle::from_rgba(frame.width(), frame.height(), rgba))
        }
        other => {
            log::warn!("Unsupported frame format with {other} channels");
            None
        }
    }
}
