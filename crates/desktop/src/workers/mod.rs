pub mod overlay_worker;
