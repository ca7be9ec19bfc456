//! Contact resolution
//!
//! Turns the contact-begin events of one physics step into arena changes:
//! squares lose a hit, spawn markers turn into balls, and balls reaching the
//! floor come to rest.

use super::arena::Arena;
use super::entity::{Attributes, EntityKind};
use super::physics::{ContactBegin, FixtureOwner, PhysicsWorld};

/// What happened during one resolution pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContactReport {
    /// Square hits that removed one point of payload
    pub hits: u32,
    /// Squares whose payload reached zero
    pub destroyed: u32,
    /// Spawn markers collected
    pub collected: u32,
    /// Balls that came to rest on the floor
    pub landed: u32,
}

impl ContactReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl std::ops::AddAssign for ContactReport {
    fn add_assign(&mut self, rhs: Self) {
        self.hits += rhs.hits;
        self.destroyed += rhs.destroyed;
        self.collected += rhs.collected;
        self.landed += rhs.landed;
    }
}

impl Arena {
    /// Apply every contact that began since the last call
    pub fn resolve_contacts(&mut self, world: &mut PhysicsWorld) -> ContactReport {
        let mut report = ContactReport::default();
        for ContactBegin { a, b } in world.drain_contacts() {
            let (Some(oa), Some(ob)) = (world.owner(a), world.owner(b)) else {
                continue;
            };
            // Exactly one side of an allowed pair is a ball
            let (ball, other) = match (self.ball_of(oa), self.ball_of(ob)) {
                (Some(ball), None) => (ball, ob),
                (None, Some(ball)) => (ball, oa),
                _ => continue,
            };
            match other {
                FixtureOwner::Entity(index) => self.hit_cell(world, index, &mut report),
                FixtureOwner::Floor => self.touch_floor(world, ball, &mut report),
                FixtureOwner::Wall => {}
            }
        }
        if !report.is_empty() {
            log::trace!("Contacts resolved: {report:?}");
        }
        report
    }

    /// Ball slot of an owner, if it is a tracked ball
    fn ball_of(&self, owner: FixtureOwner) -> Option<usize> {
        match owner {
            FixtureOwner::Entity(index) => self.ball_slot(index),
            _ => None,
        }
    }

    fn hit_cell(&mut self, world: &mut PhysicsWorld, index: usize, report: &mut ContactReport) {
        let Some(cell) = self.entity_mut(index) else {
            return;
        };
        match cell.kind() {
            EntityKind::ActiveCell => {
                let payload = cell.payload().saturating_sub(1);
                report.hits += 1;
                if payload == 0 {
                    cell.attrs = Attributes::empty_cell();
                    self.apply_cell_fixture(world, index);
                    report.destroyed += 1;
                } else {
                    cell.attrs.payload = payload;
                }
            }
            EntityKind::BallSpawnMarker => {
                cell.attrs = Attributes::empty_cell();
                self.apply_cell_fixture(world, index);
                self.queue_ball();
                report.collected += 1;
            }
            // A cell emptied earlier in this pass
            _ => return,
        }
        self.mark_dirty(index..index + 1);
    }

    fn touch_floor(&mut self, world: &mut PhysicsWorld, ball: usize, report: &mut ContactReport) {
        if !self.is_in_flight(ball) {
            return;
        }
        let index = self.grid().len() + ball;
        let falling = self
            .body(index)
            .and_then(|body| world.body_velocity(body))
            .is_some_and(|v| v.y < 0.0);
        // Freshly launched balls overlap the floor on their way up
        if falling {
            self.land_ball(world, ball);
            report.landed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use super::*;
    use crate::settings::Settings;

    fn setup() -> (PhysicsWorld, Arena) {
        let mut settings = Settings::default();
        settings.arena.max_balls = 8;
        let mut world = PhysicsWorld::new(&settings.physics);
        let arena = Arena::new(&mut world, settings.arena, &settings.physics);
        (world, arena)
    }

    fn place(arena: &mut Arena, world: &mut PhysicsWorld, index: usize, attrs: Attributes) {
        if let Some(cell) = arena.entity_mut(index) {
            cell.attrs = attrs;
        }
        arena.apply_cell_fixture(world, index);
    }

    /// Run until `done` holds or `max_steps` elapse, returning the summed report
    fn run(
        arena: &mut Arena,
        world: &mut PhysicsWorld,
        max_steps: usize,
        done: impl Fn(&Arena) -> bool,
    ) -> ContactReport {
        let mut total = ContactReport::default();
        for _ in 0..max_steps {
            world.step();
            total += arena.resolve_contacts(world);
            arena.step(world);
            if done(arena) {
                break;
            }
        }
        total
    }

    #[test]
    fn test_straight_shot_destroys_last_hit_square() {
        let (mut world, mut arena) = setup();
        // Column 3, row 1: directly above the default launch point
        let target = arena.grid().index(3, 1);
        place(&mut arena, &mut world, target, Attributes::new(EntityKind::ActiveCell, 1));
        arena.add_ball(&mut world);
        arena.shoot(&mut world, FRAC_PI_2);

        let report = run(&mut arena, &mut world, 120, |a| {
            a.squares()[target].kind() == EntityKind::EmptyCell
        });
        assert_eq!(report.destroyed, 1);
        assert_eq!(arena.squares()[target].attrs, Attributes::empty_cell());

        // Emptied cells never come back while the ball keeps bouncing
        run(&mut arena, &mut world, 240, |_| false);
        assert_eq!(arena.squares()[target].kind(), EntityKind::EmptyCell);
    }

    #[test]
    fn test_hit_decrements_payload() {
        let (mut world, mut arena) = setup();
        let target = arena.grid().index(3, 1);
        place(&mut arena, &mut world, target, Attributes::new(EntityKind::ActiveCell, 3));
        arena.add_ball(&mut world);
        arena.shoot(&mut world, FRAC_PI_2);

        let report = run(&mut arena, &mut world, 120, |a| a.squares()[target].payload() < 3);
        assert_eq!(report.hits, 1);
        assert_eq!(arena.squares()[target].attrs, Attributes::new(EntityKind::ActiveCell, 2));
    }

    #[test]
    fn test_spawn_marker_is_collected_and_passed_through() {
        let (mut world, mut arena) = setup();
        let target = arena.grid().index(3, 2);
        place(&mut arena, &mut world, target, Attributes::new(EntityKind::BallSpawnMarker, 0));
        arena.add_ball(&mut world);
        arena.shoot(&mut world, FRAC_PI_2);

        let report = run(&mut arena, &mut world, 120, |a| a.pending_balls() > 0);
        assert_eq!(report.collected, 1);
        assert_eq!(arena.pending_balls(), 1);
        assert_eq!(arena.squares()[target].kind(), EntityKind::EmptyCell);

        // Markers are sensors, so the ball keeps climbing
        let vel = world.body_velocity(arena.body(arena.grid().len()).unwrap()).unwrap();
        assert!(vel.y > 0.0);

        arena.finish_round(&mut world);
        assert_eq!(arena.num_balls(), 2);
    }

    #[test]
    fn test_ball_lands_on_floor() {
        let (mut world, mut arena) = setup();
        arena.add_ball(&mut world);
        arena.shoot(&mut world, 1.2);
        assert!(!arena.all_balls_landed());

        let report = run(&mut arena, &mut world, 1200, Arena::all_balls_landed);
        assert!(arena.all_balls_landed());
        assert_eq!(report.landed, 1);

        let ball = arena.tracked_balls()[0];
        assert!((ball.pos.y - 10.0).abs() < 1e-3);
        assert!(ball.pos.x >= 10.0 && ball.pos.x <= 690.0);
        let vel = world.body_velocity(arena.body(arena.grid().len()).unwrap()).unwrap();
        assert_eq!(vel, glam::Vec2::ZERO);

        let landed_x = ball.pos.x;
        arena.finish_round(&mut world);
        assert!((arena.spawn_position().x - landed_x).abs() < 1e-3);
    }

    #[test]
    fn test_resting_ball_ignores_floor() {
        let (mut world, mut arena) = setup();
        arena.add_ball(&mut world);
        let report = run(&mut arena, &mut world, 30, |_| false);
        assert_eq!(report, ContactReport::default());
        assert!((arena.tracked_balls()[0].pos - arena.spawn_position()).length() < 1e-3);
    }
}
