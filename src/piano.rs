//! The piano: a looping note timeline that plays one chord per editor
//! interaction, scrolls its markers, and drops a falling particle per note.
//!
//! Everything is driven by the host. Control calls come from editor events,
//! `tick` from the animation frame, and every call takes the host clock in
//! milliseconds so the whole thing runs (and tests) without a real clock.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::audio::amplitude::{rms, AmplitudeHandle, MelodyAmplitude};
use crate::audio::synth::{ensure_running, AudioSink, SoundCue};
use crate::binder::{CursorCoords, ViewBinder};
use crate::config::PianoConfig;
use crate::events::PianoEvent;
use crate::physics::overlay::{ParticleView, PhysicsOverlay};
use crate::playback::cursor::PlaybackCursor;
use crate::playback::layout::TimelineLayout;
use crate::playback::markers::{MarkerView, TimelineMarkers};
use crate::playback::tween::{Point, Tween};
use crate::sketch::{SketchCallback, SketchContext, SketchGuard};
use crate::timeline::catalog::{Catalog, DEFAULT_PIECE};
use crate::timeline::types::{Progress, Timeline};

/// Height of the status panel under the piano.
const PANEL_HEIGHT: f64 = 20.0;
const LABEL_MARGIN: f64 = 20.0;

/// Everything the host needs to draw one frame.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    /// Translation of the group that follows the editor caret.
    pub anchor: Point,
    /// Horizontal translation of the marker strip inside the anchor group.
    pub timeline_x: f64,
    pub markers: Vec<MarkerView>,
    pub particles: Vec<ParticleView>,
    pub label: String,
    pub label_position: Point,
}

pub struct Piano<A: AudioSink> {
    config: PianoConfig,
    catalog: Catalog,
    piece_key: String,
    timeline: Timeline,
    layout: Option<TimelineLayout>,
    markers: TimelineMarkers,
    cursor: PlaybackCursor,
    timeline_x: Tween<f64>,
    overlay: PhysicsOverlay,
    binder: ViewBinder,
    audio: A,
    amplitude: AmplitudeHandle,
    waveform: Vec<f32>,
    sketch: Option<SketchGuard>,
    events: Vec<PianoEvent>,
    width: f64,
    height: f64,
    restore_pending: bool,
    rng: SmallRng,
    frame: u64,
    destroyed: bool,
}

impl<A: AudioSink> Piano<A> {
    /// Load the default piece (or the first one in the catalog) and pick up
    /// from `initial` progress saved by an earlier session.
    pub fn new(config: PianoConfig, audio: A, catalog: Catalog, initial: Progress) -> Self {
        let mut piano = Piano {
            overlay: PhysicsOverlay::new(config.particle_capacity),
            binder: ViewBinder::new(&config),
            rng: SmallRng::seed_from_u64(config.seed),
            config,
            catalog,
            piece_key: String::new(),
            timeline: Timeline::default(),
            layout: None,
            markers: TimelineMarkers::default(),
            cursor: PlaybackCursor::default(),
            timeline_x: Tween::settled(0.0),
            audio,
            amplitude: AmplitudeHandle::new(),
            waveform: Vec::new(),
            sketch: None,
            events: Vec::new(),
            width: 0.0,
            height: 0.0,
            restore_pending: false,
            frame: 0,
            destroyed: false,
        };

        let first = if piano.catalog.contains(DEFAULT_PIECE) {
            Some(DEFAULT_PIECE.to_string())
        } else {
            piano.catalog.keys().into_iter().next()
        };
        if let Some(key) = first {
            piano.load_piece(&key);
        }

        piano.cursor = PlaybackCursor::new(initial.index);
        piano.restore_pending = initial.index > 0;
        piano.sync_timeline_x();
        piano
    }

    fn load_piece(&mut self, key: &str) -> bool {
        let Some(timeline) = self.catalog.get(key) else {
            log::debug!("no piece named {:?}, keeping {:?}", key, self.piece_key);
            return false;
        };
        self.timeline = timeline.clone();
        self.piece_key = key.to_string();
        self.cursor.reset();
        self.restore_pending = false;
        self.overlay.clear();
        self.relayout();
        self.sync_timeline_x();

        log::info!("loaded piece {:?} ({} groups)", key, self.timeline.len());
        self.events.push(PianoEvent::PieceLoaded {
            key: key.to_string(),
            groups: self.timeline.len(),
        });
        true
    }

    fn relayout(&mut self) {
        self.layout = TimelineLayout::compute(&self.timeline, self.width, self.height, &self.config);
        self.markers = match &self.layout {
            Some(layout) => TimelineMarkers::layout(&self.timeline, layout),
            None => TimelineMarkers::default(),
        };
    }

    /// Put the marker strip at the group that plays next, without animating.
    fn sync_timeline_x(&mut self) {
        let x = match (&self.layout, self.timeline.group_at(self.cursor.index())) {
            (Some(layout), Some(group)) => -layout.x.apply(group.start_ms),
            _ => 0.0,
        };
        self.timeline_x.snap(x);
    }

    /// Switch to another catalog piece. Unknown keys are ignored.
    pub fn select_piece(&mut self, key: &str) -> bool {
        if self.destroyed {
            return false;
        }
        self.load_piece(key)
    }

    /// Add or replace a piece from its JSON form. Returns its group count.
    pub fn register_piece(&mut self, key: &str, json: &str) -> anyhow::Result<usize> {
        if self.destroyed {
            anyhow::bail!("piano has been destroyed");
        }
        let groups = self.catalog.register_json(key, json)?.len();
        log::debug!("registered piece {:?} ({} groups)", key, groups);
        Ok(groups)
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        if self.destroyed {
            return;
        }
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        self.overlay.resize(self.width, self.height);
        self.relayout();
        self.sync_timeline_x();
    }

    /// Explicit play from the editor (a keystroke, a slider drag, ...).
    pub fn play(&mut self, now_ms: f64) {
        if self.destroyed {
            return;
        }
        self.binder.note_interaction(now_ms);
        self.advance(now_ms);
    }

    fn advance(&mut self, now_ms: f64) {
        self.binder.mark_started();

        let Some(advance) = self.cursor.advance(
            &self.timeline,
            self.layout.as_ref(),
            now_ms,
            self.config.max_shift_ms,
        ) else {
            return;
        };

        if ensure_running(&mut self.audio) {
            for tone in advance.tones() {
                self.audio.trigger(&tone);
            }
        }

        self.events.push(PianoEvent::Progress {
            index: advance.progress.index,
            percentage: advance.progress.percentage,
        });

        if let (Some(layout), Some(coords)) = (&self.layout, self.binder.coords()) {
            let at = coords.spawn_point(self.config.spawn_offset_y);
            self.overlay.spawn(at, &advance.notes, layout);
        }

        if let Some(offset) = advance.next_offset {
            self.timeline_x.retarget(now_ms, -offset, advance.shift_ms);
            self.markers
                .pulse_visible(offset, self.width, now_ms, self.config.pulse_ms);
        }
    }

    pub fn stop(&mut self) {
        if self.destroyed {
            return;
        }
        self.binder.stop();
    }

    pub fn resume(&mut self, now_ms: f64) {
        if self.destroyed {
            return;
        }
        self.binder.resume(now_ms);
    }

    pub fn move_to(&mut self, coords: CursorCoords, now_ms: f64) {
        if self.destroyed {
            return;
        }
        self.binder.move_to(coords, now_ms);

        // nothing to restore into until the overlay has a size
        let sized = self.width > 0.0 && self.height > 0.0;
        if self.restore_pending && sized && self.cursor.index() > 0 {
            if let Some(layout) = &self.layout {
                self.restore_pending = false;
                let restored = self.overlay.restore(
                    coords.spawn_point(self.config.spawn_offset_y),
                    &self.timeline,
                    self.cursor.index(),
                    layout,
                    self.config.restore_cap,
                    &mut self.rng,
                );
                log::debug!("restored {} particles from saved progress", restored);
            }
        }
    }

    /// Make room for more particles by lowering the floor.
    pub fn move_down(&mut self, now_ms: f64) {
        if self.destroyed {
            return;
        }
        self.overlay.move_floor_down(self.config.floor_step);
        self.binder.note_interaction(now_ms);
    }

    /// One animation frame: auto-play timers, physics, amplitude, sketch.
    pub fn tick(&mut self, now_ms: f64) {
        if self.destroyed {
            return;
        }
        for _ in 0..self.binder.poll(now_ms) {
            self.advance(now_ms);
        }

        self.overlay.step();
        self.frame += 1;

        self.audio.waveform(&mut self.waveform);
        self.amplitude.set(rms(&self.waveform));

        if let Some(sketch) = self.sketch.as_mut() {
            let ctx = SketchContext {
                amplitude: self.amplitude.reader(),
                frame: self.frame,
            };
            if let Some(fault) = sketch.run(&ctx) {
                self.events.push(PianoEvent::SketchError {
                    message: fault.message,
                    frame: fault.frame,
                });
            }
        }
    }

    pub fn play_cue(&mut self, cue: SoundCue) {
        if self.destroyed {
            return;
        }
        if ensure_running(&mut self.audio) {
            self.audio.play_cue(cue);
        }
    }

    /// Replace the per-frame sketch callback.
    pub fn attach_sketch(&mut self, callback: SketchCallback) {
        if self.destroyed {
            return;
        }
        self.sketch = Some(SketchGuard::new(callback));
    }

    pub fn detach_sketch(&mut self) {
        self.sketch = None;
    }

    /// Stop all timers and drop all particles and callbacks. Every later
    /// call is a no-op.
    pub fn destroy(&mut self) {
        self.destroyed = true;
        self.binder.cancel();
        self.overlay.teardown();
        self.sketch = None;
        self.events.clear();
    }

    pub fn scene(&self, now_ms: f64) -> Scene {
        Scene {
            width: self.width,
            height: self.height,
            anchor: self.binder.anchor_at(now_ms),
            timeline_x: self.timeline_x.sample(now_ms),
            markers: self.markers.views(now_ms),
            particles: self.overlay.views(),
            label: format!("{}%", self.progress().percentage),
            label_position: Point::new(
                self.width - LABEL_MARGIN,
                self.height - PANEL_HEIGHT - LABEL_MARGIN,
            ),
        }
    }

    pub fn drain_events(&mut self) -> Vec<PianoEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn progress(&self) -> Progress {
        self.cursor.progress(self.timeline.len())
    }

    pub fn is_started(&self) -> bool {
        self.binder.is_started()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn piece_key(&self) -> &str {
        &self.piece_key
    }

    pub fn piece_keys(&self) -> Vec<String> {
        self.catalog.keys()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn particle_count(&self) -> usize {
        self.overlay.len()
    }

    /// Read-only amplitude handle for sketch environments.
    pub fn amplitude(&self) -> MelodyAmplitude {
        self.amplitude.reader()
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::synth::testing::RecordingSink;

    const EXAMPLE: &str =
        r#"{"pieceDataVersion":1,"pieceData":[0,500,69,100,0,500,73,80,500,1000,76,90]}"#;

    fn caret() -> CursorCoords {
        CursorCoords {
            left: 100.0,
            top: 40.0,
            right: 108.0,
            bottom: 58.0,
        }
    }

    fn piano_with(audio: RecordingSink) -> Piano<RecordingSink> {
        let mut catalog = Catalog::empty();
        catalog.register_json("example", EXAMPLE).unwrap();
        catalog
            .register_json("empty", r#"{"pieceDataVersion":1,"pieceData":[]}"#)
            .unwrap();
        let mut piano = Piano::new(PianoConfig::default(), audio, catalog, Progress::default());
        piano.select_piece("example");
        piano.resize(1000.0, 600.0);
        piano.drain_events();
        piano
    }

    fn piano() -> Piano<RecordingSink> {
        piano_with(RecordingSink::running())
    }

    #[test]
    fn test_example_end_to_end() {
        let mut p = piano();
        p.move_to(caret(), 0.0);
        p.play(10.0);

        let tones = &p.audio().tones;
        assert_eq!(tones.len(), 2);
        assert!((tones[0].frequency - 440.0).abs() < 1e-6);
        assert!((tones[1].frequency - 554.365_261_953_7).abs() < 1e-6);

        // scrolling towards the t=500 group, which sits at x = 100
        let scene = p.scene(10.0 + 500.0);
        assert_eq!(scene.timeline_x, -100.0);
        assert_eq!(scene.label, "50%");

        // two particles under the caret
        assert_eq!(p.particle_count(), 2);
        let particles = p.scene(10.0).particles;
        assert!(particles.iter().all(|v| v.x == 104.0 && v.y == 68.0));

        assert_eq!(
            p.drain_events(),
            vec![PianoEvent::Progress {
                index: 1,
                percentage: 50
            }]
        );
    }

    #[test]
    fn test_full_lap_reads_one_hundred() {
        let mut p = piano();
        p.play(0.0);
        p.play(100.0);
        let events = p.drain_events();
        assert_eq!(
            events.last(),
            Some(&PianoEvent::Progress {
                index: 2,
                percentage: 100
            })
        );
        assert_eq!(p.progress().index % p.timeline().len(), 0);
    }

    #[test]
    fn test_empty_piece_plays_nothing() {
        let mut p = piano();
        assert!(p.select_piece("empty"));
        p.move_to(caret(), 0.0);
        p.play(10.0);
        p.tick(20.0);
        assert!(p.audio().tones.is_empty());
        assert_eq!(p.particle_count(), 0);
        assert_eq!(p.progress(), Progress::default());
        assert_eq!(p.scene(20.0).label, "0%");
    }

    #[test]
    fn test_rejected_audio_still_advances() {
        let mut p = piano_with(RecordingSink::rejecting());
        p.move_to(caret(), 0.0);
        p.play(10.0);
        assert!(p.audio().tones.is_empty());
        assert_eq!(p.audio().start_attempts, 1);
        assert_eq!(p.progress().index, 1);
        assert_eq!(p.particle_count(), 2);
    }

    #[test]
    fn test_no_caret_no_particles() {
        let mut p = piano();
        p.play(0.0);
        assert_eq!(p.particle_count(), 0);
        assert_eq!(p.audio().tones.len(), 2);
    }

    #[test]
    fn test_auto_play_after_idle() {
        let mut p = piano();
        p.play(0.0);
        p.tick(4000.0);
        assert_eq!(p.progress().index, 1);
        p.tick(5000.0);
        p.tick(7000.0);
        assert_eq!(p.progress().index, 2);
        p.tick(9000.0);
        assert_eq!(p.progress().index, 3);

        // typing again cancels it
        p.move_to(caret(), 9500.0);
        p.tick(11_000.0);
        assert_eq!(p.progress().index, 3);
    }

    #[test]
    fn test_stop_prevents_auto_play() {
        let mut p = piano();
        p.play(0.0);
        p.stop();
        assert!(!p.is_started());
        p.tick(5000.0);
        p.tick(7000.0);
        assert_eq!(p.progress().index, 1);
        p.resume(8000.0);
        assert!(p.is_started());
        assert_eq!(p.progress().index, 1);
    }

    #[test]
    fn test_piece_switch_resets() {
        let mut p = piano();
        p.move_to(caret(), 0.0);
        p.play(0.0);
        p.play(100.0);
        p.register_piece("other", EXAMPLE).unwrap();
        assert!(p.select_piece("other"));
        assert_eq!(p.progress().index, 0);
        assert_eq!(p.particle_count(), 0);
        assert_eq!(
            p.drain_events().last(),
            Some(&PianoEvent::PieceLoaded {
                key: "other".to_string(),
                groups: 2
            })
        );
        assert!(!p.select_piece("missing"));
        assert_eq!(p.piece_key(), "other");
    }

    #[test]
    fn test_move_down_lowers_floor() {
        let mut p = piano();
        p.move_to(caret(), 0.0);
        p.play(0.0);
        // keep auto-play from adding particles
        p.stop();
        for i in 0..600 {
            p.tick(i as f64 * 16.0);
        }
        let resting = p.scene(0.0).particles[0];
        p.move_down(10_000.0);
        for i in 0..600 {
            p.tick(10_000.0 + i as f64 * 16.0);
        }
        let lowered = p.scene(0.0).particles[0];
        assert!((lowered.y - resting.y - 20.0).abs() < 1.0);
    }

    #[test]
    fn test_restore_from_saved_progress() {
        let mut catalog = Catalog::builtin();
        catalog.register_json("example", EXAMPLE).unwrap();
        let mut p = Piano::new(
            PianoConfig::default(),
            RecordingSink::running(),
            catalog,
            Progress {
                index: 6,
                percentage: 40,
            },
        );
        p.resize(1000.0, 600.0);
        assert_eq!(p.progress().index, 6);
        assert_eq!(p.particle_count(), 0);

        p.move_to(caret(), 0.0);
        assert_eq!(p.particle_count(), 6);
        // only once
        p.move_to(caret(), 100.0);
        assert_eq!(p.particle_count(), 6);
    }

    #[test]
    fn test_restore_waits_for_a_viewport() {
        let mut p = Piano::new(
            PianoConfig::default(),
            RecordingSink::running(),
            Catalog::builtin(),
            Progress {
                index: 6,
                percentage: 40,
            },
        );
        p.move_to(caret(), 0.0);
        assert_eq!(p.particle_count(), 0);

        p.resize(1000.0, 600.0);
        assert_eq!(p.particle_count(), 0);
        p.move_to(caret(), 100.0);
        let particles = p.scene(100.0).particles;
        assert_eq!(particles.len(), 6);
        // spread around the caret, not piled in a corner
        assert!(particles.iter().all(|v| (v.x - 104.0).abs() <= 5.0));
    }

    #[test]
    fn test_amplitude_and_sketch_error() {
        let mut audio = RecordingSink::running();
        audio.samples = vec![0.5, -0.5, 0.5, -0.5];
        let mut p = piano_with(audio);
        let reader = p.amplitude();
        p.attach_sketch(Box::new(|ctx: &SketchContext| {
            if ctx.amplitude.get() > 0.0 {
                anyhow::bail!("boom");
            }
            Ok(())
        }));
        p.tick(0.0);
        assert!((reader.get() - 0.5).abs() < 1e-6);
        p.tick(16.0);
        let events = p.drain_events();
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], PianoEvent::SketchError { message, .. } if message == "boom"));
    }

    #[test]
    fn test_play_cue() {
        let mut p = piano();
        p.play_cue(SoundCue::Hh);
        assert_eq!(p.audio().cues, vec![SoundCue::Hh]);
    }

    #[test]
    fn test_destroy_makes_everything_inert() {
        let mut p = piano();
        p.move_to(caret(), 0.0);
        p.play(0.0);
        p.destroy();
        assert_eq!(p.particle_count(), 0);
        p.play(100.0);
        p.tick(6000.0);
        p.tick(9000.0);
        p.move_down(9100.0);
        assert_eq!(p.progress().index, 1);
        assert_eq!(p.audio().tones.len(), 2);
        assert!(p.drain_events().is_empty());
        assert!(p.is_destroyed());

        assert!(p.register_piece("late", EXAMPLE).is_err());
        assert!(!p.piece_keys().contains(&"late".to_string()));
    }
}
