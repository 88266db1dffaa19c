pub mod assets;
pub mod element;
pub mod renderer;
