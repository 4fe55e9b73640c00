use serde::{Deserialize, Serialize};

/// Tunables for playback, animation and the particle overlay.
/// Every field has a default so a host can pass a partial object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PianoConfig {
    /// Idle time before auto-play kicks in (ms).
    pub inactivity_timeout_ms: f64,
    /// Spacing of auto-play advances (ms).
    pub autoplay_interval_ms: f64,
    /// Upper bound on the timeline scroll animation (ms).
    pub max_shift_ms: f64,
    /// Length of each half of the marker pulse (ms).
    pub pulse_ms: f64,
    /// Duration of the anchor move that follows the editor cursor (ms).
    pub cursor_transition_ms: f64,
    /// Horizontal gap between the cursor's right edge and the anchor (px).
    pub cursor_offset_x: f64,
    /// Particles spawn this far below the cursor's bottom edge (px).
    pub spawn_offset_y: f64,
    /// How far `move_down` drops the floor (px).
    pub floor_step: f64,
    /// Maximum live particles; the oldest is evicted first.
    pub particle_capacity: usize,
    /// Particle/marker radius range for the lowest and highest velocity (px).
    pub radius_range: [f64; 2],
    /// Time groups shown per screen width of timeline.
    pub groups_per_screen: usize,
    /// Most groups replayed as particles when restoring saved progress.
    pub restore_cap: usize,
    /// Seed for the scatter applied to restored particles.
    pub seed: u64,
}

impl Default for PianoConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_ms: 5000.0,
            autoplay_interval_ms: 2000.0,
            max_shift_ms: 500.0,
            pulse_ms: 100.0,
            cursor_transition_ms: 200.0,
            cursor_offset_x: 30.0,
            spawn_offset_y: 10.0,
            floor_step: 20.0,
            particle_capacity: 512,
            radius_range: [5.0, 20.0],
            groups_per_screen: 5,
            restore_cap: 200,
            seed: 0x5eed_f00d,
        }
    }
}

impl PianoConfig {
    /// Screens of timeline needed for `group_count` groups, at least one.
    pub fn screens_for(&self, group_count: usize) -> usize {
        group_count.div_ceil(self.groups_per_screen.max(1)).max(1)
    }
}
