use serde::Serialize;

use crate::playback::layout::TimelineLayout;
use crate::playback::tween::{ease_cubic_out, Lerp};
use crate::timeline::types::Timeline;

/// How much a marker at the left edge of the viewport grows during a pulse;
/// the growth falls off quadratically towards the right edge.
const PULSE_GAIN: f64 = 1.0;

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct MarkerView {
    pub cx: f64,
    pub r: f64,
}

/// Grow to `peak_r`, then settle back to the base radius. Each half takes
/// `half_ms`.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Pulse {
    from_r: f64,
    peak_r: f64,
    start_ms: f64,
    half_ms: f64,
}

#[derive(Clone, Debug, PartialEq)]
struct Marker {
    cx: f64,
    base_r: f64,
    pulse: Option<Pulse>,
}

impl Marker {
    fn radius_at(&self, now_ms: f64) -> f64 {
        let Some(pulse) = self.pulse else {
            return self.base_r;
        };
        let elapsed = now_ms - pulse.start_ms;
        if pulse.half_ms <= 0.0 || elapsed >= 2.0 * pulse.half_ms {
            self.base_r
        } else if elapsed < pulse.half_ms {
            let t = ease_cubic_out(elapsed.max(0.0) / pulse.half_ms);
            f64::lerp(pulse.from_r, pulse.peak_r, t)
        } else {
            let t = ease_cubic_out((elapsed - pulse.half_ms) / pulse.half_ms);
            f64::lerp(pulse.peak_r, self.base_r, t)
        }
    }
}

/// One marker per note, laid out along the scrolling timeline.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimelineMarkers {
    markers: Vec<Marker>,
}

impl TimelineMarkers {
    pub fn layout(timeline: &Timeline, layout: &TimelineLayout) -> Self {
        let markers = timeline
            .notes()
            .map(|note| Marker {
                cx: layout.x.apply(note.start_ms),
                base_r: layout.radius.apply(note.intensity),
                pulse: None,
            })
            .collect();
        TimelineMarkers { markers }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Pulse every marker whose on-screen x (`cx - offset`) lies within
    /// `[0, width]`. Returns how many markers were pulsed.
    pub fn pulse_visible(&mut self, offset: f64, width: f64, now_ms: f64, half_ms: f64) -> usize {
        if width <= 0.0 {
            return 0;
        }
        let mut pulsed = 0;
        for marker in &mut self.markers {
            let x = marker.cx - offset;
            if !(0.0..=width).contains(&x) {
                continue;
            }
            let closeness = 1.0 - x / width;
            let from_r = marker.radius_at(now_ms);
            marker.pulse = Some(Pulse {
                from_r,
                peak_r: marker.base_r * (1.0 + PULSE_GAIN * closeness * closeness),
                start_ms: now_ms,
                half_ms,
            });
            pulsed += 1;
        }
        pulsed
    }

    pub fn views(&self, now_ms: f64) -> Vec<MarkerView> {
        self.markers
            .iter()
            .map(|m| MarkerView {
                cx: m.cx,
                r: m.radius_at(now_ms),
            })
            .collect()
    }
}
