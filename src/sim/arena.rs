//! The arena: grid of breakable squares plus a pool of balls
//!
//! Positions are kept in render units (pixels). Cells are bound to fixed
//! colliders on a single static grid body; rows shifting only moves the
//! `Attributes` of cells, and each collider is then reshaped and refiltered
//! to match its new content. Balls are bullet bodies that start disabled.

use std::ops::Range;

use glam::Vec2;
use rand::SeedableRng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand_pcg::Pcg32;
use rapier2d::prelude::*;

use super::entity::{Attributes, Entity, EntityKind, GridLayout};
use super::physics::{FixtureOwner, PhysicsWorld, interaction_groups, wall_groups};
use super::rotate::rotate_blocks_left;
use crate::launch_direction;
use crate::renderer::vertex::GpuEntity;
use crate::settings::{ArenaConfig, PhysicsConfig};

/// Result of shifting the grid down one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Continue,
    /// The floor row still held a square; nothing was changed
    GameOver,
}

/// Physics handles owned by one entity slot
#[derive(Debug, Clone, Copy)]
struct Fixture {
    body: RigidBodyHandle,
    collider: ColliderHandle,
}

/// Smallest index range touched since the last GPU sync
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtyRange(Option<Range<usize>>);

impl DirtyRange {
    pub fn mark(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        self.0 = Some(match self.0.take() {
            Some(r) => r.start.min(range.start)..r.end.max(range.end),
            None => range,
        });
    }

    pub fn take(&mut self) -> Option<Range<usize>> {
        self.0.take()
    }

    pub fn peek(&self) -> Option<&Range<usize>> {
        self.0.as_ref()
    }
}

pub struct Arena {
    config: ArenaConfig,
    grid: GridLayout,
    entities: Vec<Entity>,
    fixtures: Vec<Fixture>,
    /// Per ball slot: launched and not yet landed
    in_flight: Vec<bool>,
    /// Odds over `EntityKind::CELL_KINDS`
    spawn_weights: Option<WeightedIndex<u32>>,
    /// Generation counter, assigned to new squares
    counter: u32,
    num_balls: usize,
    ball_x: f32,
    /// Launch X picked by the first ball to land this round
    next_ball_x: Option<f32>,
    /// Balls earned from spawn markers, added when the round ends
    pending_balls: u32,
    dirty: DirtyRange,
}

impl Arena {
    /// Build the arena's bodies and colliders in `world`
    pub fn new(world: &mut PhysicsWorld, config: ArenaConfig, physics: &PhysicsConfig) -> Self {
        let grid = GridLayout::new(config.nx, config.ny, config.cell_size);
        let n_grid = grid.len();
        let n_balls = config.max_balls as usize;
        let ppm = world.pixels_per_meter();

        let mut entities = Vec::with_capacity(n_grid + n_balls);
        let mut fixtures = Vec::with_capacity(n_grid + n_balls);

        build_walls(world, &config, physics);

        let grid_body = world.bodies.insert(RigidBodyBuilder::fixed().build());
        let half = 0.5 * config.square_size / ppm;
        for i in 0..n_grid {
            let center = grid.cell_center(i);
            let collider = ColliderBuilder::cuboid(half, half)
                .translation(crate::to_sim(center, ppm))
                .collision_groups(interaction_groups(EntityKind::EmptyCell))
                .restitution(physics.restitution)
                .friction(physics.friction)
                .user_data(FixtureOwner::Entity(i).to_user_data())
                .build();
            let collider = world
                .colliders
                .insert_with_parent(collider, grid_body, &mut world.bodies);
            entities.push(Entity::cell(i, center));
            fixtures.push(Fixture {
                body: grid_body,
                collider,
            });
        }

        let radius = config.ball_radius / ppm;
        for j in 0..n_balls {
            let body = RigidBodyBuilder::dynamic()
                .ccd_enabled(true)
                .enabled(false)
                .build();
            let body = world.bodies.insert(body);
            let collider = ColliderBuilder::ball(radius)
                .collision_groups(interaction_groups(EntityKind::InactiveBall))
                .active_events(ActiveEvents::COLLISION_EVENTS)
                .restitution(physics.restitution)
                .restitution_combine_rule(CoefficientCombineRule::Max)
                .friction(physics.friction)
                .friction_combine_rule(CoefficientCombineRule::Min)
                .user_data(FixtureOwner::Entity(n_grid + j).to_user_data())
                .build();
            let collider = world
                .colliders
                .insert_with_parent(collider, body, &mut world.bodies);
            entities.push(Entity::ball());
            fixtures.push(Fixture { body, collider });
        }

        let w = &config.spawn_weights;
        let spawn_weights = WeightedIndex::new([w.empty, w.active, w.spawn_marker])
            .inspect_err(|e| log::warn!("Unusable spawn weights ({e}), new rows will be empty"))
            .ok();

        log::info!(
            "Arena {}x{} with {} ball slots ({} bodies)",
            config.nx,
            config.ny,
            n_balls,
            world.bodies.len()
        );

        let ball_x = 0.5 * config.width();
        let mut arena = Self {
            config,
            grid,
            entities,
            fixtures,
            in_flight: vec![false; n_balls],
            spawn_weights,
            counter: 1,
            num_balls: 0,
            ball_x,
            next_ball_x: None,
            pending_balls: 0,
            dirty: DirtyRange::default(),
        };
        let all = 0..arena.entities.len();
        arena.dirty.mark(all);
        arena
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn grid(&self) -> GridLayout {
        self.grid
    }

    /// Whole store: cells then balls
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn squares(&self) -> &[Entity] {
        &self.entities[..self.grid.len()]
    }

    pub fn balls(&self) -> &[Entity] {
        &self.entities[self.grid.len()..]
    }

    pub fn row(&self, row: usize) -> &[Entity] {
        &self.entities[self.grid.row(row)]
    }

    /// Balls added so far (the tracked prefix of the pool)
    pub fn tracked_balls(&self) -> &[Entity] {
        &self.balls()[..self.num_balls]
    }

    pub fn num_balls(&self) -> usize {
        self.num_balls
    }

    pub fn generation(&self) -> u32 {
        self.counter
    }

    pub fn pending_balls(&self) -> u32 {
        self.pending_balls
    }

    /// Where balls are staged before launch
    pub fn spawn_position(&self) -> Vec2 {
        Vec2::new(self.ball_x, self.config.ball_radius)
    }

    pub(crate) fn ball_slot(&self, index: usize) -> Option<usize> {
        index
            .checked_sub(self.grid.len())
            .filter(|&j| j < self.num_balls)
    }

    pub(crate) fn entity_mut(&mut self, index: usize) -> Option<&mut Entity> {
        self.entities.get_mut(index)
    }

    /// Shift rows toward the floor and spawn a new top row
    ///
    /// Refuses with `GameOver` (and changes nothing) while the floor row
    /// still holds a square. The new row is drawn from a generator seeded with
    /// `seed`, so the same seed from the same state gives the same row.
    pub fn advance(&mut self, world: &mut PhysicsWorld, seed: u32) -> AdvanceOutcome {
        if self.row(0).iter().any(|e| e.kind() == EntityKind::ActiveCell) {
            log::info!("Advance refused: floor row occupied (generation {})", self.counter);
            return AdvanceOutcome::GameOver;
        }

        let n_grid = self.grid.len();
        let before: Vec<EntityKind> = self.squares().iter().map(Entity::kind).collect();

        let mut attrs: Vec<Attributes> = self.squares().iter().map(|e| e.attrs).collect();
        rotate_blocks_left(&mut attrs, self.grid.nx, 1);

        let mut rng = Pcg32::seed_from_u64(seed as u64);
        for a in &mut attrs[self.grid.row(self.grid.ny - 1)] {
            let kind = self
                .spawn_weights
                .as_ref()
                .map_or(EntityKind::EmptyCell, |w| EntityKind::CELL_KINDS[w.sample(&mut rng)]);
            let payload = if kind == EntityKind::ActiveCell {
                self.counter
            } else {
                0
            };
            *a = Attributes::new(kind, payload);
        }

        for (i, a) in attrs.into_iter().enumerate() {
            self.entities[i].attrs = a;
            if a.kind != before[i] {
                self.apply_cell_fixture(world, i);
            }
        }

        self.counter += 1;
        self.dirty.mark(0..n_grid);
        log::debug!("Advanced to generation {} (seed {})", self.counter, seed);
        AdvanceOutcome::Continue
    }

    /// Reshape and refilter a cell's collider to match its kind
    pub(crate) fn apply_cell_fixture(&mut self, world: &mut PhysicsWorld, index: usize) {
        let kind = self.entities[index].kind();
        let ppm = world.pixels_per_meter();
        let side = match kind {
            EntityKind::BallSpawnMarker => self.config.ball_spawn_size(),
            _ => self.config.square_size,
        };
        let half = 0.5 * side / ppm;
        if let Some(collider) = world.colliders.get_mut(self.fixtures[index].collider) {
            collider.set_shape(SharedShape::cuboid(half, half));
            collider.set_sensor(kind == EntityKind::BallSpawnMarker);
            collider.set_collision_groups(interaction_groups(kind));
        }
    }

    /// Activate the next ball slot and stage every tracked ball at the spawn point
    ///
    /// Returns the entity index of the new ball, or `None` when the pool is full.
    pub fn add_ball(&mut self, world: &mut PhysicsWorld) -> Option<usize> {
        if self.num_balls >= self.config.max_balls as usize {
            log::warn!("Ball pool exhausted ({} balls)", self.num_balls);
            return None;
        }
        let index = self.grid.len() + self.num_balls;
        self.num_balls += 1;

        self.entities[index].attrs = Attributes::new(EntityKind::ActiveBall, 0);
        let fixture = self.fixtures[index];
        if let Some(collider) = world.colliders.get_mut(fixture.collider) {
            collider.set_collision_groups(interaction_groups(EntityKind::ActiveBall));
        }
        world.set_body_enabled(fixture.body, true);

        self.rehome_balls(world);
        Some(index)
    }

    /// Put every tracked ball back at the spawn point, at rest
    fn rehome_balls(&mut self, world: &mut PhysicsWorld) {
        let spawn = self.spawn_position();
        let start = self.grid.len();
        for j in 0..self.num_balls {
            let index = start + j;
            world.place_body(self.fixtures[index].body, spawn);
            self.entities[index].pos = spawn;
            self.in_flight[j] = false;
        }
        self.dirty.mark(start..start + self.num_balls);
    }

    /// Launch every tracked ball along `angle` (radians from +X)
    pub fn shoot(&mut self, world: &mut PhysicsWorld, angle: f32) {
        let vel = self.config.ball_velocity * launch_direction(angle);
        let start = self.grid.len();
        for j in 0..self.num_balls {
            world.set_body_velocity(self.fixtures[start + j].body, vel);
            self.in_flight[j] = true;
        }
        self.next_ball_x = None;
        log::debug!("Shot {} balls at {:.3} rad", self.num_balls, angle);
    }

    /// Copy simulated ball positions into the store
    pub fn step(&mut self, world: &PhysicsWorld) {
        let start = self.grid.len();
        for j in 0..self.num_balls {
            let index = start + j;
            if let Some(pos) = world.body_position(self.fixtures[index].body) {
                self.entities[index].pos = pos;
            }
        }
        self.dirty.mark(start..start + self.num_balls);
    }

    pub fn is_in_flight(&self, ball: usize) -> bool {
        self.in_flight.get(ball).copied().unwrap_or(false)
    }

    pub fn all_balls_landed(&self) -> bool {
        self.in_flight[..self.num_balls].iter().all(|f| !f)
    }

    /// Stop a ball that reached the floor; the first one sets the next launch X
    pub(crate) fn land_ball(&mut self, world: &mut PhysicsWorld, ball: usize) {
        if !self.is_in_flight(ball) {
            return;
        }
        let index = self.grid.len() + ball;
        let body = self.fixtures[index].body;
        let r = self.config.ball_radius;
        let x = world
            .body_position(body)
            .map_or(self.ball_x, |p| p.x)
            .clamp(r, self.config.width() - r);
        let rest = Vec2::new(x, r);
        world.place_body(body, rest);
        self.entities[index].pos = rest;
        self.in_flight[ball] = false;
        self.next_ball_x.get_or_insert(x);
        self.dirty.mark(index..index + 1);
    }

    pub(crate) fn queue_ball(&mut self) {
        self.pending_balls += 1;
    }

    /// Close a round: move the launch point, add earned balls, restage
    pub fn finish_round(&mut self, world: &mut PhysicsWorld) {
        if let Some(x) = self.next_ball_x.take() {
            self.ball_x = x;
        }
        let earned = std::mem::take(&mut self.pending_balls);
        for _ in 0..earned {
            if self.add_ball(world).is_none() {
                break;
            }
        }
        self.rehome_balls(world);
    }

    pub(crate) fn mark_dirty(&mut self, range: Range<usize>) {
        self.dirty.mark(range);
    }

    /// Range of the store changed since the last call, for the GPU upload
    pub fn take_dirty(&mut self) -> Option<Range<usize>> {
        self.dirty.take()
    }

    pub fn dirty(&self) -> Option<&Range<usize>> {
        self.dirty.peek()
    }

    /// Packed GPU copy of a store range
    pub fn gpu_entities(&self, range: Range<usize>) -> Vec<GpuEntity> {
        self.entities[range].iter().map(GpuEntity::from).collect()
    }

    /// Physics body of an entity slot
    pub fn body(&self, index: usize) -> Option<RigidBodyHandle> {
        self.fixtures.get(index).map(|f| f.body)
    }

    /// Collider of an entity slot
    pub fn collider(&self, index: usize) -> Option<ColliderHandle> {
        self.fixtures.get(index).map(|f| f.collider)
    }
}

/// Static walls on the left, right and top, and the floor
///
/// The floor is a sensor: balls pass into it and are then stopped by
/// `Arena::land_ball`, so a landing ball keeps its downward velocity for the
/// contact check.
fn build_walls(world: &mut PhysicsWorld, config: &ArenaConfig, physics: &PhysicsConfig) {
    let ppm = world.pixels_per_meter();
    let (w, h) = (config.width(), config.height());
    let t = physics.wall_thickness;
    let walls = [
        (FixtureOwner::Wall, Vec2::new(-0.5 * t, 0.5 * h), Vec2::new(0.5 * t, 0.5 * h + t)),
        (FixtureOwner::Wall, Vec2::new(w + 0.5 * t, 0.5 * h), Vec2::new(0.5 * t, 0.5 * h + t)),
        (FixtureOwner::Wall, Vec2::new(0.5 * w, h + 0.5 * t), Vec2::new(0.5 * w + t, 0.5 * t)),
        (FixtureOwner::Floor, Vec2::new(0.5 * w, -0.5 * t), Vec2::new(0.5 * w + t, 0.5 * t)),
    ];
    let body = world.bodies.insert(RigidBodyBuilder::fixed().build());
    for (owner, center, half) in walls {
        let collider = ColliderBuilder::cuboid(half.x / ppm, half.y / ppm)
            .translation(crate::to_sim(center, ppm))
            .collision_groups(wall_groups())
            .sensor(owner == FixtureOwner::Floor)
            .restitution(physics.restitution)
            .friction(physics.friction)
            .user_data(owner.to_user_data())
            .build();
        world
            .colliders
            .insert_with_parent(collider, body, &mut world.bodies);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use proptest::prelude::*;

    fn small_settings() -> Settings {
        let mut settings = Settings::default();
        settings.arena.max_balls = 16;
        settings
    }

    fn new_arena(settings: &Settings) -> (PhysicsWorld, Arena) {
        let mut world = PhysicsWorld::new(&settings.physics);
        let arena = Arena::new(&mut world, settings.arena.clone(), &settings.physics);
        (world, arena)
    }

    fn fill_row(arena: &mut Arena, world: &mut PhysicsWorld, row: usize, payload: u32) {
        for i in arena.grid().row(row) {
            arena.entities[i].attrs = Attributes::new(EntityKind::ActiveCell, payload);
            arena.apply_cell_fixture(world, i);
        }
    }

    fn snapshot(arena: &Arena) -> Vec<Attributes> {
        arena.squares().iter().map(|e| e.attrs).collect()
    }

    #[test]
    fn test_fresh_arena() {
        let settings = small_settings();
        let (world, arena) = new_arena(&settings);
        assert_eq!(arena.entities().len(), 56 + 16);
        assert!(arena.squares().iter().all(|e| e.kind() == EntityKind::EmptyCell));
        assert!(arena.balls().iter().all(|e| e.kind() == EntityKind::InactiveBall));
        assert_eq!(arena.num_balls(), 0);
        assert_eq!(arena.generation(), 1);
        assert_eq!(arena.grid(), GridLayout::new(7, 8, 100.0));
        assert_eq!(arena.config(), &settings.arena);
        for (i, e) in arena.squares().iter().enumerate() {
            assert_eq!(e.grid_index, Some(i));
            assert_eq!(e.pos, arena.grid().cell_center(i));
        }
        for j in 0..16 {
            let body = arena.body(56 + j).unwrap();
            assert!(!world.body_enabled(body));
        }
    }

    #[test]
    fn test_add_ball_stages_at_spawn() {
        let settings = small_settings();
        let (mut world, mut arena) = new_arena(&settings);
        let index = arena.add_ball(&mut world).unwrap();
        assert_eq!(index, 56);
        let active: Vec<_> = arena
            .balls()
            .iter()
            .filter(|e| e.kind() == EntityKind::ActiveBall)
            .collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].pos, Vec2::new(350.0, 10.0));
        assert_eq!(arena.spawn_position(), Vec2::new(3.5 * 100.0, 10.0));
        assert!(world.body_enabled(arena.body(index).unwrap()));
        let pos = world.body_position(arena.body(index).unwrap()).unwrap();
        assert!((pos - Vec2::new(350.0, 10.0)).length() < 1e-3);
    }

    #[test]
    fn test_add_ball_pool_exhaustion() {
        let mut settings = small_settings();
        settings.arena.max_balls = 2;
        let (mut world, mut arena) = new_arena(&settings);
        assert!(arena.add_ball(&mut world).is_some());
        assert!(arena.add_ball(&mut world).is_some());
        assert!(arena.add_ball(&mut world).is_none());
        assert_eq!(arena.num_balls(), 2);
    }

    #[test]
    fn test_advance_spawns_top_row_and_bumps_generation() {
        let settings = small_settings();
        let (mut world, mut arena) = new_arena(&settings);
        assert_eq!(arena.advance(&mut world, 7), AdvanceOutcome::Continue);
        assert_eq!(arena.generation(), 2);
        for row in 0..7 {
            assert!(arena.row(row).iter().all(|e| e.kind() == EntityKind::EmptyCell));
        }
        for e in arena.row(7) {
            assert!(e.kind().is_cell());
            match e.kind() {
                EntityKind::ActiveCell => assert_eq!(e.payload(), 1),
                _ => assert_eq!(e.payload(), 0),
            }
        }
    }

    #[test]
    fn test_advance_shifts_rows_toward_floor() {
        let settings = small_settings();
        let (mut world, mut arena) = new_arena(&settings);
        fill_row(&mut arena, &mut world, 3, 9);
        assert_eq!(arena.advance(&mut world, 0), AdvanceOutcome::Continue);
        assert!(arena.row(2).iter().all(|e| e.attrs == Attributes::new(EntityKind::ActiveCell, 9)));
        assert!(arena.row(3).iter().all(|e| e.kind() == EntityKind::EmptyCell));
        // Positions and grid slots never move
        for (i, e) in arena.squares().iter().enumerate() {
            assert_eq!(e.grid_index, Some(i));
            assert_eq!(e.pos, arena.grid().cell_center(i));
        }
    }

    #[test]
    fn test_advance_refits_colliders() {
        let settings = small_settings();
        let (mut world, mut arena) = new_arena(&settings);
        fill_row(&mut arena, &mut world, 1, 3);
        arena.advance(&mut world, 5);
        for e in arena.squares() {
            let i = e.grid_index.unwrap();
            let collider = world.colliders.get(arena.collider(i).unwrap()).unwrap();
            assert_eq!(collider.collision_groups(), interaction_groups(e.kind()));
            assert_eq!(collider.is_sensor(), e.kind() == EntityKind::BallSpawnMarker);
            let half = collider.shape().as_cuboid().unwrap().half_extents;
            let expected = match e.kind() {
                EntityKind::BallSpawnMarker => 0.5 * settings.arena.ball_spawn_size() / 100.0,
                _ => 0.5 * settings.arena.square_size / 100.0,
            };
            assert!((half.x - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_advance_game_over_leaves_state_untouched() {
        let settings = small_settings();
        let (mut world, mut arena) = new_arena(&settings);
        arena.advance(&mut world, 1);
        fill_row(&mut arena, &mut world, 0, 4);
        arena.take_dirty();
        let before = snapshot(&arena);
        let generation = arena.generation();

        assert_eq!(arena.advance(&mut world, 99), AdvanceOutcome::GameOver);
        assert_eq!(snapshot(&arena), before);
        assert_eq!(arena.generation(), generation);
        assert_eq!(arena.take_dirty(), None);
    }

    #[test]
    fn test_single_square_on_floor_row_is_game_over() {
        let settings = small_settings();
        let (mut world, mut arena) = new_arena(&settings);
        arena.entities[3].attrs = Attributes::new(EntityKind::ActiveCell, 1);
        assert_eq!(arena.advance(&mut world, 0), AdvanceOutcome::GameOver);
        arena.entities[3].attrs = Attributes::new(EntityKind::BallSpawnMarker, 0);
        assert_eq!(arena.advance(&mut world, 0), AdvanceOutcome::Continue);
    }

    #[test]
    fn test_advance_seeds_42_23_replay() {
        let settings = small_settings();
        let run = || {
            let (mut world, mut arena) = new_arena(&settings);
            arena.advance(&mut world, 42);
            arena.advance(&mut world, 23);
            let rows: Vec<Attributes> = arena
                .row(6)
                .iter()
                .chain(arena.row(7))
                .map(|e| e.attrs)
                .collect();
            rows
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_dirty_range_tracking() {
        let settings = small_settings();
        let (mut world, mut arena) = new_arena(&settings);
        assert_eq!(arena.take_dirty(), Some(0..72));
        assert_eq!(arena.take_dirty(), None);
        arena.add_ball(&mut world);
        arena.add_ball(&mut world);
        assert_eq!(arena.take_dirty(), Some(56..58));
        arena.advance(&mut world, 3);
        arena.step(&world);
        assert_eq!(arena.take_dirty(), Some(0..58));
    }

    #[test]
    fn test_gpu_snapshot_matches_store() {
        let settings = small_settings();
        let (mut world, mut arena) = new_arena(&settings);
        arena.add_ball(&mut world);
        arena.advance(&mut world, 11);
        let gpu = arena.gpu_entities(0..arena.entities().len());
        assert_eq!(gpu.len(), arena.entities().len());
        for (g, e) in gpu.iter().zip(arena.entities()) {
            assert_eq!(g.position, [e.pos.x, e.pos.y]);
            assert_eq!(g.payload, e.payload());
            assert_eq!(g.kind, e.kind().code());
        }
    }

    #[test]
    fn test_step_reads_back_physics_positions() {
        let settings = small_settings();
        let (mut world, mut arena) = new_arena(&settings);
        let index = arena.add_ball(&mut world).unwrap();
        arena.shoot(&mut world, 1.2);
        for _ in 0..30 {
            world.step();
        }
        arena.step(&world);
        let body = world.bodies.get(arena.body(index).unwrap()).unwrap();
        let expected = crate::to_render(body.translation(), 100.0);
        assert_eq!(arena.entities()[index].pos, expected);
        assert!(arena.entities()[index].pos.y > 10.0);
    }

    #[test]
    fn test_shoot_sets_common_velocity() {
        let settings = small_settings();
        let (mut world, mut arena) = new_arena(&settings);
        for _ in 0..3 {
            arena.add_ball(&mut world);
        }
        let angle = 1.0f32;
        arena.shoot(&mut world, angle);
        for j in 0..3 {
            let vel = world.body_velocity(arena.body(56 + j).unwrap()).unwrap();
            let expected = 500.0 * Vec2::new(angle.cos(), angle.sin());
            assert!((vel - expected).length() < 1e-3);
            assert!(arena.is_in_flight(j));
        }
        assert!(!arena.all_balls_landed());
    }

    #[test]
    fn test_land_and_finish_round_moves_launch_point() {
        let settings = small_settings();
        let (mut world, mut arena) = new_arena(&settings);
        arena.add_ball(&mut world);
        arena.add_ball(&mut world);
        arena.shoot(&mut world, 1.0);
        world.place_body(arena.body(56).unwrap(), Vec2::new(120.0, 40.0));
        arena.land_ball(&mut world, 0);
        world.place_body(arena.body(57).unwrap(), Vec2::new(600.0, 40.0));
        arena.land_ball(&mut world, 1);
        assert!(arena.all_balls_landed());

        arena.queue_ball();
        arena.finish_round(&mut world);
        assert_eq!(arena.num_balls(), 3);
        assert_eq!(arena.pending_balls(), 0);
        // The launch X went through the meter scale and back
        let spawn = arena.spawn_position();
        assert!((spawn - Vec2::new(120.0, 10.0)).length() < 1e-3);
        for (j, e) in arena.tracked_balls().iter().enumerate() {
            assert_eq!(e.pos, spawn);
            let body = arena.body(56 + j).unwrap();
            let pos = world.body_position(body).unwrap();
            assert!((pos - spawn).length() < 1e-3);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_advance_is_deterministic(seed in any::<u32>(), warmup in 0u32..4) {
            let settings = small_settings();
            let (mut w1, mut a1) = new_arena(&settings);
            let (mut w2, mut a2) = new_arena(&settings);
            for s in 0..warmup {
                a1.advance(&mut w1, s);
                a2.advance(&mut w2, s);
            }
            prop_assert_eq!(a1.advance(&mut w1, seed), a2.advance(&mut w2, seed));
            prop_assert_eq!(snapshot(&a1), snapshot(&a2));
        }

        #[test]
        fn prop_continue_freshly_populates_top_row(seed in any::<u32>()) {
            let settings = small_settings();
            let (mut world, mut arena) = new_arena(&settings);
            fill_row(&mut arena, &mut world, 7, 77);
            prop_assert_eq!(arena.advance(&mut world, seed), AdvanceOutcome::Continue);
            for e in arena.row(7) {
                prop_assert!(e.payload() != 77);
            }
            for e in arena.row(6) {
                prop_assert_eq!(e.attrs, Attributes::new(EntityKind::ActiveCell, 77));
            }
        }
    }
}
