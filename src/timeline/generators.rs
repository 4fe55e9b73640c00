//! Small generated pieces so the piano has something to play before the host
//! registers real piece data.

use anyhow::{bail, Context};

use crate::timeline::types::NoteEvent;

const DEFAULT_VELOCITY: f64 = 90.0;

pub fn generate(kind: &str, key: &str, tempo: f64) -> anyhow::Result<Vec<NoteEvent>> {
    let root = key_to_pitch(key)?;
    if tempo.is_nan() || tempo <= 0.0 {
        bail!("Tempo must be positive, got {}", tempo);
    }
    let beat_ms = 60_000.0 / tempo;

    match kind {
        "major_scale" => Ok(generate_major_scale(root, beat_ms)),
        "chromatic" => Ok(generate_chromatic(root, beat_ms)),
        "arpeggios" => Ok(generate_arpeggios(root, beat_ms)),
        "cadence" => Ok(generate_cadence(root, beat_ms)),
        _ => bail!("Unknown piece generator: {}", kind),
    }
}

pub fn pitch_from_step(step: char, alter: i32, octave: i32) -> i32 {
    let base = match step.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => 0,
    };
    (octave + 1) * 12 + base + alter
}

fn key_to_pitch(key: &str) -> anyhow::Result<f64> {
    // "C4", "F#3", "Bb3"; octave defaults to 4
    let key = key.trim();
    let mut chars = key.chars();
    let Some(step) = chars.next() else {
        bail!("Empty key");
    };
    let rest = chars.as_str();

    let (alter, octave_str) = if let Some(stripped) = rest.strip_prefix('#') {
        (1, stripped)
    } else if let Some(stripped) = rest.strip_prefix('b') {
        (-1, stripped)
    } else {
        (0, rest)
    };

    let octave: i32 = if octave_str.is_empty() {
        4
    } else {
        octave_str
            .parse()
            .with_context(|| format!("Invalid octave in key: {}", key))?
    };

    Ok(pitch_from_step(step, alter, octave) as f64)
}

fn make_note(start_beat: f64, duration_beats: f64, pitch: f64, beat_ms: f64) -> NoteEvent {
    let start_ms = (start_beat * beat_ms).round();
    NoteEvent {
        start_ms,
        end_ms: start_ms + (duration_beats * beat_ms).round(),
        pitch,
        intensity: DEFAULT_VELOCITY,
    }
}

fn generate_major_scale(root: f64, beat_ms: f64) -> Vec<NoteEvent> {
    let intervals = [0.0, 2.0, 4.0, 5.0, 7.0, 9.0, 11.0, 12.0];
    let mut notes = Vec::new();
    let mut beat = 0.0;

    for &interval in &intervals {
        notes.push(make_note(beat, 1.0, root + interval, beat_ms));
        beat += 1.0;
    }
    for &interval in intervals[..7].iter().rev() {
        notes.push(make_note(beat, 1.0, root + interval, beat_ms));
        beat += 1.0;
    }
    notes
}

fn generate_chromatic(root: f64, beat_ms: f64) -> Vec<NoteEvent> {
    let mut notes = Vec::new();
    let mut beat = 0.0;

    for i in 0..=12 {
        notes.push(make_note(beat, 0.5, root + i as f64, beat_ms));
        beat += 0.5;
    }
    for i in (0..12).rev() {
        notes.push(make_note(beat, 0.5, root + i as f64, beat_ms));
        beat += 0.5;
    }
    notes
}

fn generate_arpeggios(root: f64, beat_ms: f64) -> Vec<NoteEvent> {
    let patterns: [[f64; 7]; 2] = [
        [0.0, 4.0, 7.0, 12.0, 7.0, 4.0, 0.0],
        [0.0, 3.0, 7.0, 12.0, 7.0, 3.0, 0.0],
    ];

    let mut notes = Vec::new();
    let mut beat = 0.0;

    for pattern in &patterns {
        for &interval in pattern {
            notes.push(make_note(beat, 1.0, root + interval, beat_ms));
            beat += 1.0;
        }
        // breath between patterns
        beat += 1.0;
    }
    notes
}

/// I-IV-V-I block chords; every chord is one time group.
fn generate_cadence(root: f64, beat_ms: f64) -> Vec<NoteEvent> {
    let chords: [[f64; 3]; 4] = [
        [0.0, 4.0, 7.0],
        [5.0, 9.0, 12.0],
        [7.0, 11.0, 14.0],
        [0.0, 4.0, 7.0],
    ];

    let mut notes = Vec::new();
    for (i, chord) in chords.iter().enumerate() {
        let beat = i as f64 * 2.0;
        for &interval in chord {
            notes.push(make_note(beat, 2.0, root + interval, beat_ms));
        }
        notes.push(make_note(beat, 2.0, root + chord[0] - 12.0, beat_ms));
    }
    notes
}
