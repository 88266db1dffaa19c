pub mod openpnp_camera;
