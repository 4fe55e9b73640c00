pub mod amplitude;
pub mod pitch;
pub mod synth;
