use std::cell::Cell;
use std::rc::Rc;

/// Root-mean-square level of one analyser frame. Zero for an empty frame.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut energy = 0.0f32;
    for &s in samples {
        energy += s * s;
    }
    (energy / samples.len() as f32).sqrt()
}

/// Write side of the melody amplitude. Owned by the piano, updated once per
/// frame from the analyser.
#[derive(Clone, Debug, Default)]
pub struct AmplitudeHandle {
    level: Rc<Cell<f32>>,
}

impl AmplitudeHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, level: f32) {
        self.level.set(level);
    }

    pub fn reader(&self) -> MelodyAmplitude {
        MelodyAmplitude {
            level: Rc::clone(&self.level),
        }
    }
}

/// Read-only view of the current melody amplitude, handed to sketch code.
#[derive(Clone, Debug)]
pub struct MelodyAmplitude {
    level: Rc<Cell<f32>>,
}

impl MelodyAmplitude {
    pub fn get(&self) -> f32 {
        self.level.get()
    }
}
