pub mod catalog;
pub mod generators;
pub mod loader;
pub mod types;
