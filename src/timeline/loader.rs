use crate::timeline::types::{NoteEvent, TimeGroup, Timeline};

/// Values per note in the flat piece format: start, end, pitch, intensity.
pub const VALUES_PER_NOTE: usize = 4;

/// Read every complete quadruple as a note. Values are passed through
/// unchanged; a trailing partial quadruple is dropped.
pub fn parse_notes(data: &[f64]) -> Vec<NoteEvent> {
    let remainder = data.len() % VALUES_PER_NOTE;
    if remainder != 0 {
        log::warn!(
            "piece data length {} is not a multiple of {}, ignoring {} trailing values",
            data.len(),
            VALUES_PER_NOTE,
            remainder
        );
    }

    data.chunks_exact(VALUES_PER_NOTE)
        .map(|chunk| NoteEvent {
            start_ms: chunk[0],
            end_ms: chunk[1],
            pitch: chunk[2],
            intensity: chunk[3],
        })
        .collect()
}

/// Group notes that share a start time, in ascending start order. The sort
/// is stable so notes within a chord keep their source order.
pub fn group_by_start(mut notes: Vec<NoteEvent>) -> Vec<TimeGroup> {
    notes.sort_by(|a, b| a.start_ms.total_cmp(&b.start_ms));

    let mut groups: Vec<TimeGroup> = Vec::new();
    for note in notes {
        match groups.last_mut() {
            Some(group) if group.start_ms == note.start_ms => group.notes.push(note),
            _ => groups.push(TimeGroup {
                start_ms: note.start_ms,
                notes: vec![note],
            }),
        }
    }
    groups
}

pub fn load_timeline(data: &[f64]) -> Timeline {
    Timeline {
        groups: group_by_start(parse_notes(data)),
    }
}
