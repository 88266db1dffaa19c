use crate::shared::frame::Frame;

/// Domain interface for a live frame supplier.
///
/// `next_frame` blocks until the device delivers a frame. Sources own
/// their device handle and release it on drop.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Frame, Box<dyn std::error::Error>>;
    fn dimensions(&self) -> (u32, u32);
}
