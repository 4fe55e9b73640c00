/// MIDI note number of the A4 reference pitch.
pub const A4_PITCH: f64 = 69.0;
pub const A4_FREQUENCY: f64 = 440.0;
pub const MAX_VELOCITY: f64 = 127.0;

/// Equal-tempered MIDI note number to frequency in Hz.
/// 69 -> 440 Hz, every 12 semitones doubles the frequency.
pub fn midi_to_frequency(pitch: f64) -> f64 {
    A4_FREQUENCY * 2f64.powf((pitch - A4_PITCH) / 12.0)
}

/// MIDI velocity (0-127) to gain (0-1). Not clamped.
pub fn normalized_velocity(intensity: f64) -> f64 {
    intensity / MAX_VELOCITY
}
