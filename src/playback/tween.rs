use serde::{Deserialize, Serialize};

pub fn ease_cubic_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0) - 1.0;
    t * t * t + 1.0
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

pub trait Lerp: Copy {
    fn lerp(from: Self, to: Self, t: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(from: Self, to: Self, t: f64) -> Self {
        from + (to - from) * t
    }
}

impl Lerp for Point {
    fn lerp(from: Self, to: Self, t: f64) -> Self {
        Point {
            x: f64::lerp(from.x, to.x, t),
            y: f64::lerp(from.y, to.y, t),
        }
    }
}

/// A cubic-out transition sampled against an explicit clock. Retargeting
/// interrupts the running transition and continues from wherever it was.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tween<T: Lerp> {
    from: T,
    to: T,
    start_ms: f64,
    duration_ms: f64,
}

impl<T: Lerp> Tween<T> {
    pub fn settled(value: T) -> Self {
        Tween {
            from: value,
            to: value,
            start_ms: 0.0,
            duration_ms: 0.0,
        }
    }

    pub fn sample(&self, now_ms: f64) -> T {
        if self.duration_ms <= 0.0 || now_ms >= self.start_ms + self.duration_ms {
            return self.to;
        }
        let t = ((now_ms - self.start_ms) / self.duration_ms).max(0.0);
        T::lerp(self.from, self.to, ease_cubic_out(t))
    }

    pub fn is_active(&self, now_ms: f64) -> bool {
        self.duration_ms > 0.0 && now_ms < self.start_ms + self.duration_ms
    }

    pub fn target(&self) -> T {
        self.to
    }

    pub fn retarget(&mut self, now_ms: f64, to: T, duration_ms: f64) {
        self.from = self.sample(now_ms);
        self.to = to;
        self.start_ms = now_ms;
        self.duration_ms = duration_ms.max(0.0);
    }

    /// Jump without animating.
    pub fn snap(&mut self, value: T) {
        *self = Self::settled(value);
    }
}
