use serde::{Deserialize, Serialize};

use crate::audio::pitch::{midi_to_frequency, normalized_velocity};
use crate::timeline::types::NoteEvent;

/// Lowest and highest frequency the synthesizer is asked to produce.
const MIN_FREQUENCY: f64 = 8.0;
const MAX_FREQUENCY: f64 = 12_600.0;

/// A tone to attack immediately and release after `duration_secs`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct ToneRequest {
    pub frequency: f64,
    pub duration_secs: f64,
    pub velocity: f64,
}

impl ToneRequest {
    pub fn from_note(note: &NoteEvent) -> Self {
        ToneRequest {
            frequency: midi_to_frequency(note.pitch),
            duration_secs: note.duration_secs(),
            velocity: normalized_velocity(note.intensity),
        }
    }

    /// Pull out-of-range notes back into what a synth voice can play.
    pub fn clamped(self) -> Self {
        ToneRequest {
            frequency: self.frequency.clamp(MIN_FREQUENCY, MAX_FREQUENCY),
            duration_secs: self.duration_secs,
            velocity: self.velocity.clamp(0.0, 1.0),
        }
    }
}

/// One-shot drum samples used as feedback for editor actions.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SoundCue {
    Kick,
    Snare,
    Hh,
    Hho,
}

impl SoundCue {
    pub fn sample_name(&self) -> &'static str {
        match self {
            SoundCue::Kick => "kick",
            SoundCue::Snare => "snare",
            SoundCue::Hh => "hh",
            SoundCue::Hho => "hho",
        }
    }

    /// Accepts sample names as well as the editor actions they stand for.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "kick" | "save" => Some(SoundCue::Kick),
            "snare" | "success" => Some(SoundCue::Snare),
            "hho" | "failure" => Some(SoundCue::Hho),
            "hh" | "move" => Some(SoundCue::Hh),
            _ => None,
        }
    }
}

/// Audio output seam. The browser implementation forwards to a JS synth;
/// tests record requests.
pub trait AudioSink {
    fn is_running(&self) -> bool;

    /// Ask the host to activate audio output. Browsers may refuse until a
    /// user gesture has happened.
    fn start(&mut self) -> anyhow::Result<()>;

    fn trigger(&mut self, tone: &ToneRequest);

    fn play_cue(&mut self, cue: SoundCue);

    /// Latest analyser frame. Sinks without an analyser leave `out` empty.
    fn waveform(&mut self, out: &mut Vec<f32>) {
        out.clear();
    }
}

/// Requests activation if needed. `false` when the host refused; callers keep
/// going without sound.
pub fn ensure_running(sink: &mut dyn AudioSink) -> bool {
    if sink.is_running() {
        return true;
    }
    match sink.start() {
        Ok(()) => true,
        Err(e) => {
            log::warn!("audio activation rejected, continuing silently: {:#}", e);
            false
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Records every request; can be told to refuse activation.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        pub running: bool,
        pub reject_start: bool,
        pub start_attempts: usize,
        pub tones: Vec<ToneRequest>,
        pub cues: Vec<SoundCue>,
        pub samples: Vec<f32>,
    }

    impl RecordingSink {
        pub fn running() -> Self {
            RecordingSink {
                running: true,
                ..Default::default()
            }
        }

        pub fn rejecting() -> Self {
            RecordingSink {
                reject_start: true,
                ..Default::default()
            }
        }
    }

    impl AudioSink for RecordingSink {
        fn is_running(&self) -> bool {
            self.running
        }

        fn start(&mut self) -> anyhow::Result<()> {
            self.start_attempts += 1;
            if self.reject_start {
                anyhow::bail!("not allowed to start");
            }
            self.running = true;
            Ok(())
        }

        fn trigger(&mut self, tone: &ToneRequest) {
            self.tones.push(*tone);
        }

        fn play_cue(&mut self, cue: SoundCue) {
            self.cues.push(cue);
        }

        fn waveform(&mut self, out: &mut Vec<f32>) {
            out.clear();
            out.extend_from_slice(&self.samples);
        }
    }
}
