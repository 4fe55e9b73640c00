use crate::config::PianoConfig;
use crate::playback::scale::{extent, ColorRamp, LinearScale, RadialScale};
use crate::timeline::types::Timeline;

/// Scales derived from the loaded piece and the current viewport size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimelineLayout {
    /// Start time (ms) to horizontal timeline position (px).
    pub x: LinearScale,
    /// Intensity to radius (px).
    pub radius: RadialScale,
    /// Pitch to fill color.
    pub color: ColorRamp,
    pub width: f64,
    pub height: f64,
}

impl TimelineLayout {
    /// `None` while the piece is empty: there is nothing to scale.
    pub fn compute(
        timeline: &Timeline,
        width: f64,
        height: f64,
        config: &PianoConfig,
    ) -> Option<Self> {
        let starts = extent(timeline.notes().map(|n| n.start_ms))?;
        let intensities = extent(timeline.notes().map(|n| n.intensity))?;
        let pitches = extent(timeline.notes().map(|n| n.pitch))?;

        let screens = config.screens_for(timeline.len()) as f64;
        let [r_min, r_max] = config.radius_range;

        Some(TimelineLayout {
            x: LinearScale::new(starts, (0.0, width * screens / 10.0)),
            radius: RadialScale::new(intensities, (r_min, r_max)),
            color: ColorRamp::new(pitches),
            width,
            height,
        })
    }
}
