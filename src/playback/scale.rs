//! Value-to-screen mappings for the timeline and the particles.
//!
//! These follow the usual charting conventions: a collapsed domain maps to the
//! middle of the range, and values outside the domain extrapolate (linear,
//! radial) or saturate (color).

use serde::Serialize;

/// Minimum and maximum of the finite values, `None` if there are none.
pub fn extent<I: IntoIterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Position of `x` within `domain` as a 0..1 fraction; 0.5 when collapsed.
fn normalize(domain: (f64, f64), x: f64) -> f64 {
    let span = domain.1 - domain.0;
    if span == 0.0 {
        0.5
    } else {
        (x - domain.0) / span
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearScale {
    domain: (f64, f64),
    range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn apply(&self, x: f64) -> f64 {
        let t = normalize(self.domain, x);
        self.range.0 + t * (self.range.1 - self.range.0)
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }
}

/// Linear in area: interpolates squared radii so that perceived size grows
/// linearly with the input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadialScale {
    squared: LinearScale,
}

impl RadialScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        let square = |r: f64| r.signum() * r * r;
        Self {
            squared: LinearScale::new(domain, (square(range.0), square(range.1))),
        }
    }

    pub fn apply(&self, x: f64) -> f64 {
        let y = self.squared.apply(x);
        y.signum() * y.abs().sqrt()
    }
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn from_hex(hex: u32) -> Self {
        Rgb {
            r: (hex >> 16) as u8,
            g: (hex >> 8) as u8,
            b: hex as u8,
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    fn mix(a: Rgb, b: Rgb, t: f64) -> Rgb {
        let channel = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
        Rgb {
            r: channel(a.r, b.r),
            g: channel(a.g, b.g),
            b: channel(a.b, b.b),
        }
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_hex()
    }
}

/// Viridis sampled at ten evenly spaced stops.
const VIRIDIS: [Rgb; 10] = [
    Rgb::from_hex(0x440154),
    Rgb::from_hex(0x482878),
    Rgb::from_hex(0x3e4989),
    Rgb::from_hex(0x31688e),
    Rgb::from_hex(0x26828e),
    Rgb::from_hex(0x1f9e89),
    Rgb::from_hex(0x35b779),
    Rgb::from_hex(0x6ece58),
    Rgb::from_hex(0xb5de2b),
    Rgb::from_hex(0xfde725),
];

pub fn viridis(t: f64) -> Rgb {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let pos = t * (VIRIDIS.len() - 1) as f64;
    let i = (pos.floor() as usize).min(VIRIDIS.len() - 2);
    Rgb::mix(VIRIDIS[i], VIRIDIS[i + 1], pos - i as f64)
}

/// Sequential color scale over `domain`, saturating at both ends.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorRamp {
    domain: (f64, f64),
}

impl ColorRamp {
    pub fn new(domain: (f64, f64)) -> Self {
        Self { domain }
    }

    pub fn apply(&self, x: f64) -> Rgb {
        viridis(normalize(self.domain, x))
    }
}
