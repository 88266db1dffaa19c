//! Webcam capture via the openpnp-capture wrapper.
//!
//! Device enumeration order stands in for facing on desktop hardware:
//! the first enumerated device plays the front camera, the second the
//! back camera. A missing slot is an open error, which the session
//! turns into "feature disabled" or "keep the previous input".

use openpnp_capture::{Device, Format, Stream};

use crate::capture::domain::camera_provider::{CameraProvider, Facing};
use crate::capture::domain::frame_source::FrameSource;
use crate::shared::frame::Frame;

pub struct OpenpnpCameraProvider;

impl OpenpnpCameraProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OpenpnpCameraProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraProvider for OpenpnpCameraProvider {
    fn open(&self, facing: Facing) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
        let devices = Device::enumerate();
        let slot = match facing {
            Facing::Front => 0,
            Facing::Back => 1,
        };
        let index = devices
            .get(slot)
            .copied()
            .ok_or_else(|| format!("no capture device for the {} camera", facing.label()))?;

        let device =
            Device::new(index).ok_or_else(|| format!("failed to open capture device {index}"))?;
        let format = Format::default();
        let stream = Stream::new(&device, &format)
            .ok_or_else(|| format!("failed to start capture stream on device {index}"))?;
        let negotiated = stream.format();

        log::info!(
            "opened {} camera: device {index}, {}x{}",
            facing.label(),
            negotiated.width,
            negotiated.height
        );

        Ok(Box::new(OpenpnpCameraSource {
            _device: device,
            stream,
            width: negotiated.width,
            height: negotiated.height,
            mirrored: facing.mirrored(),
            next_index: 0,
            buffer: Vec::new(),
        }))
    }
}

struct OpenpnpCameraSource {
    _device: Device,
    stream: Stream,
    width: u32,
    height: u32,
    mirrored: bool,
    next_index: usize,
    buffer: Vec<u8>,
}

// The capture stream is only ever driven from the owning thread.
unsafe impl Send for OpenpnpCameraSource {}

impl FrameSource for OpenpnpCameraSource {
    fn next_frame(&mut self) -> Result<Frame, Box<dyn std::error::Error>> {
        self.stream.advance();
        self.stream.read(&mut self.buffer);

        let expected = (self.width as usize) * (self.height as usize) * 3;
        if self.buffer.len() != expected {
            return Err(format!(
                "capture delivered {} bytes, expected {expected} for {}x{} RGB",
                self.buffer.len(),
                self.width,
                self.height
            )
            .into());
        }

        let frame = Frame::new(
            self.buffer.clone(),
            self.width,
            self.height,
            3,
            self.next_index,
            self.mirrored,
        );
        self.next_index += 1;
        Ok(frame)
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_fails_cleanly_without_devices() {
        // Only meaningful on machines with no cameras (CI); with
        // hardware present the provider is exercised by hand.
        if Device::enumerate().is_empty() {
            let provider = OpenpnpCameraProvider::new();
            assert!(provider.open(Facing::Front).is_err());
            assert!(provider.open(Facing::Back).is_err());
        }
    }

    #[test]
    fn test_back_camera_requires_second_device() {
        if Device::enumerate().len() < 2 {
            let provider = OpenpnpCameraProvider::new();
            assert!(provider.open(Facing::Back).is_err());
        }
    }
}
