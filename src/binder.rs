//! Connects the editor cursor to the piano: anchor placement and the
//! idle/auto-play state machine.

use serde::{Deserialize, Serialize};

use crate::config::PianoConfig;
use crate::playback::tween::{Point, Tween};

/// Screen rectangle of the editor caret, relative to the editor content box.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct CursorCoords {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl CursorCoords {
    /// Where the timeline anchor goes: vertically centered on the caret, a
    /// little to its right.
    pub fn anchor(&self, offset_x: f64) -> Point {
        let middle = (self.top - self.bottom) / 2.0;
        Point::new(self.right + offset_x, self.top - middle)
    }

    /// Where particles are dropped from: just under the caret.
    pub fn spawn_point(&self, offset_y: f64) -> Point {
        Point::new((self.left + self.right) / 2.0, self.bottom + offset_y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AutoPlay {
    /// Waiting for the inactivity deadline, if one is armed.
    IdleWaiting { deadline_ms: Option<f64> },
    /// Advancing on its own every interval.
    AutoPlaying { next_ms: f64 },
}

#[derive(Clone, Debug)]
pub struct ViewBinder {
    coords: Option<CursorCoords>,
    anchor: Tween<Point>,
    started: bool,
    state: AutoPlay,
    inactivity_timeout_ms: f64,
    interval_ms: f64,
    transition_ms: f64,
    offset_x: f64,
}

impl ViewBinder {
    pub fn new(config: &PianoConfig) -> Self {
        ViewBinder {
            coords: None,
            anchor: Tween::settled(Point::default()),
            started: false,
            state: AutoPlay::IdleWaiting { deadline_ms: None },
            inactivity_timeout_ms: config.inactivity_timeout_ms,
            interval_ms: config.autoplay_interval_ms.max(1.0),
            transition_ms: config.cursor_transition_ms,
            offset_x: config.cursor_offset_x,
        }
    }

    pub fn coords(&self) -> Option<CursorCoords> {
        self.coords
    }

    pub fn anchor_at(&self, now_ms: f64) -> Point {
        self.anchor.sample(now_ms)
    }

    pub fn anchor_target(&self) -> Point {
        self.anchor.target()
    }

    pub fn is_transitioning(&self, now_ms: f64) -> bool {
        self.anchor.is_active(now_ms)
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn state(&self) -> AutoPlay {
        self.state
    }

    /// Record the caret position and ease the anchor to it. A call during a
    /// running transition replaces it.
    pub fn move_to(&mut self, coords: CursorCoords, now_ms: f64) {
        self.coords = Some(coords);
        self.anchor
            .retarget(now_ms, coords.anchor(self.offset_x), self.transition_ms);
        self.note_interaction(now_ms);
    }

    /// Any explicit interaction cancels auto-play and re-arms the deadline.
    pub fn note_interaction(&mut self, now_ms: f64) {
        if let AutoPlay::AutoPlaying { .. } = self.state {
            log::debug!("auto-play cancelled by interaction");
        }
        self.state = AutoPlay::IdleWaiting {
            deadline_ms: Some(now_ms + self.inactivity_timeout_ms),
        };
    }

    pub fn mark_started(&mut self) {
        self.started = true;
    }

    /// Pause: no auto-play until resumed. The deadline stays armed but only
    /// fires into auto-play while started.
    pub fn stop(&mut self) {
        self.started = false;
        if let AutoPlay::AutoPlaying { .. } = self.state {
            self.state = AutoPlay::IdleWaiting { deadline_ms: None };
        }
    }

    pub fn resume(&mut self, now_ms: f64) {
        self.started = true;
        self.note_interaction(now_ms);
    }

    /// Drive the timers. Returns how many automatic advances are due now
    /// (zero or one; a late frame does not replay missed intervals).
    pub fn poll(&mut self, now_ms: f64) -> usize {
        match self.state {
            AutoPlay::IdleWaiting {
                deadline_ms: Some(deadline),
            } if now_ms >= deadline => {
                self.state = if self.started {
                    log::debug!("idle for {} ms, auto-play on", self.inactivity_timeout_ms);
                    AutoPlay::AutoPlaying {
                        next_ms: deadline + self.interval_ms,
                    }
                } else {
                    AutoPlay::IdleWaiting { deadline_ms: None }
                };
                0
            }
            AutoPlay::AutoPlaying { next_ms } if now_ms >= next_ms => {
                let mut next_ms = next_ms + self.interval_ms;
                if next_ms <= now_ms {
                    next_ms = now_ms + self.interval_ms;
                }
                self.state = AutoPlay::AutoPlaying { next_ms };
                1
            }
            _ => 0,
        }
    }

    /// Teardown: forget the caret and disarm every timer.
    pub fn cancel(&mut self) {
        self.started = false;
        self.state = AutoPlay::IdleWaiting { deadline_ms: None };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binder() -> ViewBinder {
        ViewBinder::new(&PianoConfig::default())
    }

    fn caret(left: f64, top: f64) -> CursorCoords {
        CursorCoords {
            left,
            top,
            right: left + 8.0,
            bottom: top + 18.0,
        }
    }

    #[test]
    fn test_anchor_geometry() {
        let c = caret(100.0, 40.0);
        assert_eq!(c.anchor(30.0), Point::new(138.0, 49.0));
        assert_eq!(c.spawn_point(10.0), Point::new(104.0, 68.0));
    }

    #[test]
    fn test_second_move_supersedes_first() {
        let mut b = binder();
        b.move_to(caret(100.0, 40.0), 0.0);
        b.move_to(caret(300.0, 200.0), 50.0);
        assert!(b.is_transitioning(100.0));
        assert_eq!(b.anchor_target(), caret(300.0, 200.0).anchor(30.0));
        assert_eq!(b.anchor_at(250.0), caret(300.0, 200.0).anchor(30.0));
        assert!(!b.is_transitioning(250.0));
        assert_eq!(b.coords(), Some(caret(300.0, 200.0)));
    }

    #[test]
    fn test_idle_enters_auto_play_when_started() {
        let mut b = binder();
        b.mark_started();
        b.note_interaction(0.0);
        assert_eq!(b.poll(4999.0), 0);
        assert_eq!(b.poll(5000.0), 0);
        assert_eq!(b.state(), AutoPlay::AutoPlaying { next_ms: 7000.0 });
        assert_eq!(b.poll(6999.0), 0);
        assert_eq!(b.poll(7000.0), 1);
        assert_eq!(b.poll(7001.0), 0);
        assert_eq!(b.poll(9000.0), 1);
    }

    #[test]
    fn test_interaction_cancels_auto_play() {
        let mut b = binder();
        b.mark_started();
        b.note_interaction(0.0);
        b.poll(5000.0);
        b.move_to(caret(0.0, 0.0), 6000.0);
        assert_eq!(
            b.state(),
            AutoPlay::IdleWaiting {
                deadline_ms: Some(11_000.0)
            }
        );
        assert_eq!(b.poll(7000.0), 0);
    }

    #[test]
    fn test_not_started_never_auto_plays() {
        let mut b = binder();
        b.move_to(caret(0.0, 0.0), 0.0);
        assert_eq!(b.poll(5000.0), 0);
        assert_eq!(b.state(), AutoPlay::IdleWaiting { deadline_ms: None });
        assert_eq!(b.poll(20_000.0), 0);
    }

    #[test]
    fn test_stop_and_resume() {
        let mut b = binder();
        b.resume(0.0);
        b.poll(5000.0);
        b.stop();
        assert!(!b.is_started());
        assert_eq!(b.poll(7000.0), 0);
        b.resume(8000.0);
        assert!(b.is_started());
        b.poll(13_000.0);
        assert_eq!(b.poll(15_000.0), 1);
    }

    #[test]
    fn test_late_frame_fires_once() {
        let mut b = binder();
        b.resume(0.0);
        b.poll(5000.0);
        assert_eq!(b.poll(60_000.0), 1);
        assert_eq!(b.state(), AutoPlay::AutoPlaying { next_ms: 62_000.0 });
    }
}
