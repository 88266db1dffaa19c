pub mod frame_channel;
pub mod overlay_pipeline;
