//! Playback cursor: walks the time groups of a piece, one group per advance,
//! looping forever.

use crate::audio::synth::ToneRequest;
use crate::playback::layout::TimelineLayout;
use crate::timeline::types::{NoteEvent, Progress, Timeline};

/// Completion of the current lap, in whole percent.
///
/// The index only ever grows, so this is computed per lap: the last group of
/// a lap reads 100 and the first group of the next lap starts over. A fresh
/// cursor (index 0) reads 0.
pub fn lap_percentage(index: usize, total: usize) -> u32 {
    if total == 0 || index == 0 {
        return 0;
    }
    let lap_position = (index - 1) % total + 1;
    (lap_position * 100 / total) as u32
}

/// Result of one advance.
#[derive(Clone, Debug, PartialEq)]
pub struct Advance {
    /// Index (mod group count) of the group that was just played.
    pub group_index: usize,
    pub notes: Vec<NoteEvent>,
    pub progress: Progress,
    /// Start time of the group that plays next.
    pub next_start_ms: f64,
    /// Timeline position of `next_start_ms`, when the piece has a layout.
    pub next_offset: Option<f64>,
    /// How long the scroll towards `next_offset` should take.
    pub shift_ms: f64,
}

impl Advance {
    pub fn tones(&self) -> impl Iterator<Item = ToneRequest> + '_ {
        self.notes.iter().map(ToneRequest::from_note)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlaybackCursor {
    index: usize,
    last_play_ms: Option<f64>,
}

impl PlaybackCursor {
    pub fn new(index: usize) -> Self {
        PlaybackCursor {
            index,
            last_play_ms: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn progress(&self, total_groups: usize) -> Progress {
        Progress {
            index: self.index,
            percentage: lap_percentage(self.index, total_groups),
        }
    }

    pub fn elapsed_since_play(&self, now_ms: f64) -> Option<f64> {
        self.last_play_ms.map(|last| now_ms - last)
    }

    /// Play the current group and step to the next one. `None` for an empty
    /// piece; the cursor does not move in that case.
    pub fn advance(
        &mut self,
        timeline: &Timeline,
        layout: Option<&TimelineLayout>,
        now_ms: f64,
        max_shift_ms: f64,
    ) -> Option<Advance> {
        let total = timeline.len();
        if total == 0 {
            return None;
        }

        let group_index = self.index % total;
        let group = &timeline.groups[group_index];
        self.index += 1;

        let shift_ms = match self.elapsed_since_play(now_ms) {
            Some(elapsed) => elapsed.clamp(0.0, max_shift_ms),
            None => max_shift_ms,
        };
        self.last_play_ms = Some(now_ms);

        let next_start_ms = timeline.groups[(group_index + 1) % total].start_ms;

        Some(Advance {
            group_index,
            notes: group.notes.clone(),
            progress: self.progress(total),
            next_start_ms,
            next_offset: layout.map(|l| l.x.apply(next_start_ms)),
            shift_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PianoConfig;
    use crate::timeline::loader::load_timeline;

    fn four_groups() -> Timeline {
        load_timeline(&[
            0.0, 100.0, 60.0, 64.0, 100.0, 200.0, 62.0, 64.0, 200.0, 300.0, 64.0, 64.0, 300.0,
            400.0, 65.0, 64.0,
        ])
    }

    #[test]
    fn test_lap_percentage() {
        assert_eq!(lap_percentage(0, 4), 0);
        assert_eq!(lap_percentage(1, 4), 25);
        assert_eq!(lap_percentage(4, 4), 100);
        assert_eq!(lap_percentage(5, 4), 25);
        assert_eq!(lap_percentage(8, 4), 100);
        assert_eq!(lap_percentage(1, 3), 33);
        assert_eq!(lap_percentage(3, 0), 0);
    }

    #[test]
    fn test_full_lap_returns_to_first_group() {
        let timeline = four_groups();
        let mut cursor = PlaybackCursor::new(0);
        let mut last = None;
        for i in 0..4 {
            last = cursor.advance(&timeline, None, i as f64 * 1000.0, 500.0);
        }
        let last = last.unwrap();
        assert_eq!(last.group_index, 3);
        assert_eq!(last.progress.percentage, 100);
        assert_eq!(last.next_start_ms, 0.0);
        assert_eq!(cursor.index() % timeline.len(), 0);

        let wrapped = cursor.advance(&timeline, None, 5000.0, 500.0).unwrap();
        assert_eq!(wrapped.group_index, 0);
        assert_eq!(wrapped.progress, Progress { index: 5, percentage: 25 });
    }

    #[test]
    fn test_empty_timeline_does_not_advance() {
        let mut cursor = PlaybackCursor::new(0);
        assert!(cursor.advance(&Timeline::default(), None, 0.0, 500.0).is_none());
        assert_eq!(cursor.index(), 0);
    }

    #[test]
    fn test_shift_duration_is_capped() {
        let timeline = four_groups();
        let mut cursor = PlaybackCursor::new(0);
        assert_eq!(cursor.advance(&timeline, None, 0.0, 500.0).unwrap().shift_ms, 500.0);
        assert_eq!(cursor.advance(&timeline, None, 120.0, 500.0).unwrap().shift_ms, 120.0);
        assert_eq!(cursor.advance(&timeline, None, 5000.0, 500.0).unwrap().shift_ms, 500.0);
    }

    #[test]
    fn test_example_first_advance() {
        let timeline = load_timeline(&[
            0.0, 500.0, 69.0, 100.0, 0.0, 500.0, 73.0, 80.0, 500.0, 1000.0, 76.0, 90.0,
        ]);
        let layout =
            TimelineLayout::compute(&timeline, 1000.0, 600.0, &PianoConfig::default()).unwrap();
        let mut cursor = PlaybackCursor::new(0);
        let advance = cursor.advance(&timeline, Some(&layout), 0.0, 500.0).unwrap();

        let tones: Vec<ToneRequest> = advance.tones().collect();
        assert_eq!(tones.len(), 2);
        assert!((tones[0].frequency - 440.0).abs() < 1e-6);
        assert!((tones[1].frequency - 554.365_261_953_7).abs() < 1e-6);
        assert_eq!(tones[0].duration_secs, 0.5);
        assert_eq!(advance.next_start_ms, 500.0);
        assert_eq!(advance.next_offset, Some(100.0));
        assert_eq!(advance.progress, Progress { index: 1, percentage: 50 });
    }

    #[test]
    fn test_restored_index_continues() {
        let timeline = four_groups();
        let mut cursor = PlaybackCursor::new(6);
        assert_eq!(cursor.progress(4).percentage, 50);
        let advance = cursor.advance(&timeline, None, 0.0, 500.0).unwrap();
        assert_eq!(advance.group_index, 2);
    }
}
