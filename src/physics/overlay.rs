use rand::Rng;
use serde::Serialize;

use crate::physics::world::{StaticRect, World, WorldParams};
use crate::playback::layout::TimelineLayout;
use crate::playback::scale::Rgb;
use crate::playback::tween::Point;
use crate::timeline::types::{NoteEvent, Timeline};

const WALL_THICKNESS: f64 = 20.0;
/// Side walls are tall enough to never be overflowed in practice.
const WALL_HEIGHT_FACTOR: f64 = 100_000.0;
/// The floor sits slightly above the bottom edge of the overlay.
const FLOOR_INSET: f64 = 3.0;
const FLOOR_INDEX: usize = 2;

/// Fraction of the overlay height restored particles are spread over.
const RESTORE_FALL_SPAN: f64 = 0.6;

const SPAWN_VELOCITY: Point = Point::new(0.0, 1.0);

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct ParticleView {
    pub x: f64,
    pub y: f64,
    pub r: f64,
    pub fill: Rgb,
}

/// Falling-note particles bounded by two walls and a movable floor.
#[derive(Clone, Debug)]
pub struct PhysicsOverlay {
    world: World,
    width: f64,
    height: f64,
    floor_drop: f64,
}

impl PhysicsOverlay {
    pub fn new(capacity: usize) -> Self {
        PhysicsOverlay {
            world: World::new(WorldParams::default(), capacity),
            width: 0.0,
            height: 0.0,
            floor_drop: 0.0,
        }
    }

    /// Rebuild the walls for a new overlay size. The floor keeps any drop
    /// applied by `move_floor_down`.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;

        let walls = vec![
            StaticRect::new(
                -WALL_THICKNESS / 2.0 + 1.0,
                height / 2.0,
                WALL_THICKNESS,
                height * WALL_HEIGHT_FACTOR,
            ),
            StaticRect::new(
                width + WALL_THICKNESS / 2.0 - 1.0,
                height / 2.0,
                WALL_THICKNESS,
                height * WALL_HEIGHT_FACTOR,
            ),
            self.floor_rect(),
        ];
        self.world.set_statics(walls);
        self.update_kill_line();
    }

    fn floor_rect(&self) -> StaticRect {
        StaticRect::new(
            self.width / 2.0,
            self.height - WALL_THICKNESS / 2.0 - FLOOR_INSET + self.floor_drop,
            self.width,
            WALL_THICKNESS,
        )
    }

    /// Top edge of the floor body.
    pub fn floor_top(&self) -> f64 {
        self.floor_rect().center.y - WALL_THICKNESS / 2.0
    }

    fn update_kill_line(&mut self) {
        // anything that got a full viewport below the floor is lost for good
        let kill_y = self.floor_top() + WALL_THICKNESS + self.height.max(1.0);
        self.world.set_kill_y(Some(kill_y));
    }

    pub fn move_floor_down(&mut self, step: f64) {
        self.floor_drop += step;
        let floor = self.floor_rect();
        if let Some(rect) = self.world.static_mut(FLOOR_INDEX) {
            *rect = floor;
        }
        self.update_kill_line();
    }

    /// One particle per note, dropped from `at`.
    pub fn spawn(&mut self, at: Point, notes: &[NoteEvent], layout: &TimelineLayout) -> usize {
        for note in notes {
            self.world.add_circle(
                at,
                SPAWN_VELOCITY,
                layout.radius.apply(note.intensity),
                layout.color.apply(note.pitch),
            );
        }
        notes.len()
    }

    /// Re-create particles for groups already played in an earlier session,
    /// spread out below `at` so older notes look like they have fallen further.
    /// At most `cap` groups are sampled, evenly strided.
    pub fn restore<R: Rng>(
        &mut self,
        at: Point,
        timeline: &Timeline,
        played: usize,
        layout: &TimelineLayout,
        cap: usize,
        rng: &mut R,
    ) -> usize {
        let played = played.min(timeline.len());
        if played == 0 {
            return 0;
        }
        self.world.clear_circles();

        let stride = (played / cap.max(1)).max(1);
        let mut spawned = 0;
        for i in (0..played).step_by(stride) {
            let fall = i as f64 / played as f64 * self.height * RESTORE_FALL_SPAN;
            for note in &timeline.groups[i].notes {
                let radius = layout.radius.apply(note.intensity);
                let x = at.x + (rng.gen::<f64>() - 0.5) * 10.0;
                let y = at.y + fall + (rng.gen::<f64>() - 0.5) * 20.0;
                let position = Point::new(
                    x.min(self.width - radius).max(radius),
                    y.min(self.height - radius - WALL_THICKNESS).max(radius),
                );
                let velocity = Point::new(
                    (rng.gen::<f64>() - 0.5) * 0.5,
                    0.5 + rng.gen::<f64>() * 0.5,
                );
                self.world
                    .add_circle(position, velocity, radius, layout.color.apply(note.pitch));
                spawned += 1;
            }
        }
        spawned
    }

    pub fn step(&mut self) {
        self.world.step();
    }

    /// Drop every particle, keeping the walls.
    pub fn clear(&mut self) {
        self.world.clear_circles();
    }

    /// Drop particles and walls.
    pub fn teardown(&mut self) {
        self.world.clear();
    }

    pub fn len(&self) -> usize {
        self.world.len()
    }

    pub fn is_empty(&self) -> bool {
        self.world.is_empty()
    }

    pub fn views(&self) -> Vec<ParticleView> {
        self.world
            .circles()
            .map(|c| ParticleView {
                x: c.position.x,
                y: c.position.y,
                r: c.radius,
                fill: c.color,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PianoConfig;
    use crate::timeline::loader::load_timeline;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn example() -> (Timeline, TimelineLayout) {
        let timeline = load_timeline(&[
            0.0, 500.0, 69.0, 100.0, 0.0, 500.0, 73.0, 80.0, 500.0, 1000.0, 76.0, 90.0,
        ]);
        let layout =
            TimelineLayout::compute(&timeline, 800.0, 600.0, &PianoConfig::default()).unwrap();
        (timeline, layout)
    }

    fn overlay() -> PhysicsOverlay {
        let mut overlay = PhysicsOverlay::new(64);
        overlay.resize(800.0, 600.0);
        overlay
    }

    #[test]
    fn test_spawn_radius_bounds() {
        let (timeline, layout) = example();
        let mut overlay = overlay();
        let at = Point::new(100.0, 50.0);
        assert_eq!(overlay.spawn(at, &timeline.groups[0].notes, &layout), 2);

        let views = overlay.views();
        assert_eq!(views.len(), 2);
        // intensity 100 is the loudest note, 80 the softest
        assert!((views[0].r - 20.0).abs() < 1e-9);
        assert!((views[1].r - 5.0).abs() < 1e-9);
        assert!(views.iter().all(|v| v.x == 100.0 && v.y == 50.0));
        assert_ne!(views[0].fill, views[1].fill);
    }

    #[test]
    fn test_floor_position_and_move_down() {
        let mut overlay = overlay();
        assert_eq!(overlay.floor_top(), 577.0);
        overlay.move_floor_down(20.0);
        assert_eq!(overlay.floor_top(), 597.0);
        // the drop survives a resize
        overlay.resize(800.0, 700.0);
        assert_eq!(overlay.floor_top(), 697.0);
    }

    #[test]
    fn test_particles_settle_on_floor() {
        let (timeline, layout) = example();
        let mut overlay = overlay();
        overlay.spawn(Point::new(400.0, 0.0), &timeline.groups[1].notes, &layout);
        for _ in 0..600 {
            overlay.step();
        }
        let p = overlay.views()[0];
        assert!((p.y + p.r - 577.0).abs() < 1.0, "bottom at {}", p.y + p.r);

        overlay.move_floor_down(20.0);
        for _ in 0..600 {
            overlay.step();
        }
        let p = overlay.views()[0];
        assert!((p.y + p.r - 597.0).abs() < 1.0);
    }

    #[test]
    fn test_floor_holds_small_particles_on_tall_overlays() {
        let (timeline, layout) = example();
        // intensity 80: the smallest radius
        let small = &timeline.groups[0].notes[1..2];
        for height in [600.0, 800.0, 1000.0, 1200.0] {
            for y0 in 0..40 {
                let mut overlay = PhysicsOverlay::new(4);
                overlay.resize(800.0, height);
                overlay.spawn(Point::new(400.0, y0 as f64), small, &layout);
                for _ in 0..900 {
                    overlay.step();
                }
                let views = overlay.views();
                assert_eq!(views.len(), 1, "lost particle dropped from {} at height {}", y0, height);
                assert!((views[0].r - 5.0).abs() < 1e-9);
                let bottom = views[0].y + views[0].r;
                assert!(
                    (bottom - overlay.floor_top()).abs() < 1.0,
                    "bottom at {} for height {}",
                    bottom,
                    height
                );
            }
        }
    }

    #[test]
    fn test_restore_is_bounded_and_in_view() {
        let data: Vec<f64> = (0..500)
            .flat_map(|i| {
                let start = i as f64 * 100.0;
                [start, start + 80.0, 40.0 + (i % 40) as f64, 30.0 + (i % 90) as f64]
            })
            .collect();
        let timeline = load_timeline(&data);
        let layout =
            TimelineLayout::compute(&timeline, 800.0, 600.0, &PianoConfig::default()).unwrap();
        let mut overlay = PhysicsOverlay::new(1024);
        overlay.resize(800.0, 600.0);
        let mut rng = SmallRng::seed_from_u64(7);

        let spawned = overlay.restore(Point::new(300.0, 40.0), &timeline, 450, &layout, 200, &mut rng);
        // stride 2 over 450 played groups
        assert_eq!(spawned, 225);
        for p in overlay.views() {
            assert!(p.x >= p.r && p.x <= 800.0 - p.r);
            assert!(p.y >= p.r && p.y <= 600.0 - p.r - 20.0);
        }
    }

    #[test]
    fn test_restore_nothing_played() {
        let (timeline, layout) = example();
        let mut overlay = overlay();
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(overlay.restore(Point::default(), &timeline, 0, &layout, 200, &mut rng), 0);
        assert!(overlay.is_empty());
    }
}
