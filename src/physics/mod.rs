pub mod overlay;
pub mod world;
