//! Minimal rigid-body world: dynamic circles against static rectangles and
//! each other, advanced in fixed per-frame steps.
//!
//! Units are pixels and frames. There is no rotation and no restitution;
//! contacts cancel the approaching velocity and apply a little friction.

use std::collections::VecDeque;

use crate::playback::scale::Rgb;
use crate::playback::tween::Point;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldParams {
    /// Downward acceleration (px/frame²).
    pub gravity: f64,
    /// Fraction of velocity lost to drag each step.
    pub air_friction: f64,
    /// Fraction of tangential velocity lost on contact.
    pub contact_friction: f64,
    /// Collision passes per step.
    pub iterations: usize,
}

impl Default for WorldParams {
    fn default() -> Self {
        // 0.001 px/ms² at a 60 Hz frame
        WorldParams {
            gravity: 0.001 * (1000.0f64 / 60.0).powi(2),
            air_friction: 0.01,
            contact_friction: 0.1,
            iterations: 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub id: u64,
    pub position: Point,
    pub velocity: Point,
    pub radius: f64,
    pub color: Rgb,
}

/// Axis-aligned, immovable box given by its center and full size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StaticRect {
    pub center: Point,
    pub width: f64,
    pub height: f64,
}

impl StaticRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        StaticRect {
            center: Point::new(x, y),
            width,
            height,
        }
    }

    fn min(&self) -> Point {
        Point::new(
            self.center.x - self.width / 2.0,
            self.center.y - self.height / 2.0,
        )
    }

    fn max(&self) -> Point {
        Point::new(
            self.center.x + self.width / 2.0,
            self.center.y + self.height / 2.0,
        )
    }
}

#[derive(Clone, Debug)]
pub struct World {
    params: WorldParams,
    circles: VecDeque<Circle>,
    statics: Vec<StaticRect>,
    capacity: usize,
    next_id: u64,
    /// Circles whose top edge passes this y are dropped.
    kill_y: Option<f64>,
}

impl World {
    pub fn new(params: WorldParams, capacity: usize) -> Self {
        World {
            params,
            circles: VecDeque::with_capacity(capacity.min(1024)),
            statics: Vec::new(),
            capacity: capacity.max(1),
            next_id: 0,
            kill_y: None,
        }
    }

    /// Add a circle, evicting the oldest one when the world is full.
    pub fn add_circle(&mut self, position: Point, velocity: Point, radius: f64, color: Rgb) -> u64 {
        while self.circles.len() >= self.capacity {
            self.circles.pop_front();
        }
        let id = self.next_id;
        self.next_id += 1;
        self.circles.push_back(Circle {
            id,
            position,
            velocity,
            radius,
            color,
        });
        id
    }

    pub fn set_statics(&mut self, statics: Vec<StaticRect>) {
        self.statics = statics;
    }

    pub fn static_mut(&mut self, index: usize) -> Option<&mut StaticRect> {
        self.statics.get_mut(index)
    }

    pub fn set_kill_y(&mut self, kill_y: Option<f64>) {
        self.kill_y = kill_y;
    }

    pub fn circles(&self) -> impl Iterator<Item = &Circle> + '_ {
        self.circles.iter()
    }

    pub fn len(&self) -> usize {
        self.circles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.circles.is_empty()
    }

    pub fn clear_circles(&mut self) {
        self.circles.clear();
    }

    pub fn clear(&mut self) {
        self.circles.clear();
        self.statics.clear();
    }

    /// Advance one frame: integrate, resolve contacts, drop lost circles.
    pub fn step(&mut self) {
        let WorldParams {
            gravity,
            air_friction,
            contact_friction,
            iterations,
        } = self.params;

        for c in self.circles.iter_mut() {
            let from = c.position;
            c.velocity.y += gravity;
            c.velocity.x *= 1.0 - air_friction;
            c.velocity.y *= 1.0 - air_friction;
            c.position.x += c.velocity.x;
            c.position.y += c.velocity.y;
            for rect in &self.statics {
                sweep_static(c, from, rect, contact_friction);
            }
        }

        let circles = self.circles.make_contiguous();
        for _ in 0..iterations {
            resolve_pairs(circles, contact_friction);
            for c in circles.iter_mut() {
                for rect in &self.statics {
                    resolve_static(c, rect, contact_friction);
                }
            }
        }

        if let Some(kill_y) = self.kill_y {
            self.circles.retain(|c| c.position.y - c.radius <= kill_y);
        }
    }
}

fn dot(a: Point, b: Point) -> f64 {
    a.x * b.x + a.y * b.y
}

/// Remove the approaching part of the velocity along `normal` and damp the
/// rest.
fn stop_against(c: &mut Circle, normal: Point, friction: f64) {
    let vn = dot(c.velocity, normal);
    if vn < 0.0 {
        c.velocity.x -= normal.x * vn;
        c.velocity.y -= normal.y * vn;
        // what remains is tangential
        c.velocity.x *= 1.0 - friction;
        c.velocity.y *= 1.0 - friction;
    }
}

/// Stop a circle that moved from `from` to its current position at the face
/// of `rect` it entered through. Fast circles can otherwise cross most of a
/// thin static in one step and get pushed out the far side.
fn sweep_static(c: &mut Circle, from: Point, rect: &StaticRect, friction: f64) {
    let (min, max) = (rect.min(), rect.max());
    let lo = Point::new(min.x - c.radius, min.y - c.radius);
    let hi = Point::new(max.x + c.radius, max.y + c.radius);
    if from.x > lo.x && from.x < hi.x && from.y > lo.y && from.y < hi.y {
        // already in contact; resolve_static handles it
        return;
    }

    let d = Point::new(c.position.x - from.x, c.position.y - from.y);
    let axes = [
        (from.x, d.x, lo.x, hi.x, Point::new(-d.x.signum(), 0.0)),
        (from.y, d.y, lo.y, hi.y, Point::new(0.0, -d.y.signum())),
    ];
    let mut t_enter = f64::NEG_INFINITY;
    let mut t_exit = f64::INFINITY;
    let mut normal = Point::default();
    for (start, delta, low, high, face) in axes {
        if delta == 0.0 {
            if start < low || start > high {
                return;
            }
            continue;
        }
        let (t0, t1) = ((low - start) / delta, (high - start) / delta);
        let (near, far) = if t0 < t1 { (t0, t1) } else { (t1, t0) };
        if near > t_enter {
            t_enter = near;
            normal = face;
        }
        t_exit = t_exit.min(far);
    }
    if !(0.0..=1.0).contains(&t_enter) || t_enter > t_exit {
        return;
    }

    c.position = Point::new(from.x + d.x * t_enter, from.y + d.y * t_enter);
    stop_against(c, normal, friction);
}

fn resolve_static(c: &mut Circle, rect: &StaticRect, friction: f64) {
    let min = rect.min();
    let max = rect.max();
    let p = c.position;

    let inside = p.x > min.x && p.x < max.x && p.y > min.y && p.y < max.y;
    let (normal, depth) = if inside {
        // push out through the nearest face
        let faces = [
            (Point::new(-1.0, 0.0), p.x - min.x),
            (Point::new(1.0, 0.0), max.x - p.x),
            (Point::new(0.0, -1.0), p.y - min.y),
            (Point::new(0.0, 1.0), max.y - p.y),
        ];
        let mut best = faces[0];
        for face in &faces[1..] {
            if face.1 < best.1 {
                best = *face;
            }
        }
        (best.0, best.1 + c.radius)
    } else {
        let closest = Point::new(p.x.clamp(min.x, max.x), p.y.clamp(min.y, max.y));
        let d = Point::new(p.x - closest.x, p.y - closest.y);
        let dist_sq = dot(d, d);
        if dist_sq >= c.radius * c.radius || dist_sq == 0.0 {
            return;
        }
        let dist = dist_sq.sqrt();
        (Point::new(d.x / dist, d.y / dist), c.radius - dist)
    };

    c.position.x += normal.x * depth;
    c.position.y += normal.y * depth;
    stop_against(c, normal, friction);
}

fn resolve_circle_pair(a: &mut Circle, b: &mut Circle, friction: f64) {
    let d = Point::new(b.position.x - a.position.x, b.position.y - a.position.y);
    let reach = a.radius + b.radius;
    let dist_sq = dot(d, d);
    if dist_sq >= reach * reach {
        return;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > 0.0 {
        Point::new(d.x / dist, d.y / dist)
    } else {
        Point::new(0.0, 1.0)
    };
    let half_depth = (reach - dist) / 2.0;
    a.position.x -= normal.x * half_depth;
    a.position.y -= normal.y * half_depth;
    b.position.x += normal.x * half_depth;
    b.position.y += normal.y * half_depth;

    let relative = Point::new(b.velocity.x - a.velocity.x, b.velocity.y - a.velocity.y);
    let closing = dot(relative, normal);
    if closing < 0.0 {
        let impulse = closing / 2.0;
        a.velocity.x += normal.x * impulse;
        a.velocity.y += normal.y * impulse;
        b.velocity.x -= normal.x * impulse;
        b.velocity.y -= normal.y * impulse;

        let tangent = Point::new(
            relative.x - normal.x * closing,
            relative.y - normal.y * closing,
        );
        let share = friction / 2.0;
        a.velocity.x += tangent.x * share;
        a.velocity.y += tangent.y * share;
        b.velocity.x -= tangent.x * share;
        b.velocity.y -= tangent.y * share;
    }
}

/// Sweep along x so only circles with overlapping horizontal spans are
/// tested against each other.
fn resolve_pairs(circles: &mut [Circle], friction: f64) {
    let mut order: Vec<usize> = (0..circles.len()).collect();
    order.sort_by(|&i, &j| {
        let left = |c: &Circle| c.position.x - c.radius;
        left(&circles[i]).total_cmp(&left(&circles[j]))
    });

    for (n, &i) in order.iter().enumerate() {
        let right = circles[i].position.x + circles[i].radius;
        for &j in &order[n + 1..] {
            if circles[j].position.x - circles[j].radius > right {
                break;
            }
            let (lo, hi) = (i.min(j), i.max(j));
            let (head, tail) = circles.split_at_mut(hi);
            resolve_circle_pair(&mut head[lo], &mut tail[0], friction);
        }
    }
}
