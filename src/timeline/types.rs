use serde::{Deserialize, Serialize};

/// Shortest tone the synthesizer is asked to hold, in seconds.
pub const MIN_DURATION_SECS: f64 = 0.1;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct NoteEvent {
    pub start_ms: f64,
    pub end_ms: f64,
    pub pitch: f64,     // MIDI note number, nominally 0-127
    pub intensity: f64, // MIDI velocity, nominally 0-127
}

impl NoteEvent {
    pub fn duration_secs(&self) -> f64 {
        ((self.end_ms - self.start_ms) / 1000.0).max(MIN_DURATION_SECS)
    }
}

/// All notes sounding from the same instant (a chord, or a single note).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TimeGroup {
    pub start_ms: f64,
    pub notes: Vec<NoteEvent>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Timeline {
    pub groups: Vec<TimeGroup>,
}

impl Timeline {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Group at a monotonically growing playback index, reduced modulo the
    /// group count. `None` for an empty timeline.
    pub fn group_at(&self, index: usize) -> Option<&TimeGroup> {
        if self.groups.is_empty() {
            return None;
        }
        self.groups.get(index % self.groups.len())
    }

    pub fn notes(&self) -> impl Iterator<Item = &NoteEvent> + '_ {
        self.groups.iter().flat_map(|g| g.notes.iter())
    }

    pub fn note_count(&self) -> usize {
        self.groups.iter().map(|g| g.notes.len()).sum()
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    pub index: usize,
    pub percentage: u32,
}
