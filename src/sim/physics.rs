//! Physics bridge
//!
//! Owns the rapier world, defines which entity kinds may touch, and tags every
//! collider with the slot that owns it so contacts can be mapped back to the
//! entity store.

use std::sync::Mutex;

use glam::Vec2;
use rapier2d::prelude::*;

use super::entity::EntityKind;
use crate::settings::PhysicsConfig;
use crate::{to_render, to_sim};

/// Collision category for arena walls and floor
pub const WALL_CATEGORY: u32 = 32;

/// Kinds (by category bit) each kind is allowed to touch
///
/// Empty cells and inactive balls interact with nothing; squares and spawn
/// markers only with balls; balls never with each other.
pub const fn collision_mask(kind: EntityKind) -> u32 {
    match kind {
        EntityKind::EmptyCell | EntityKind::InactiveBall => 0,
        EntityKind::ActiveCell | EntityKind::BallSpawnMarker => EntityKind::ActiveBall.code(),
        EntityKind::ActiveBall => {
            EntityKind::ActiveCell.code() | EntityKind::BallSpawnMarker.code() | WALL_CATEGORY
        }
    }
}

/// Rapier membership/filter pair for a kind
pub fn interaction_groups(kind: EntityKind) -> InteractionGroups {
    InteractionGroups::new(
        Group::from_bits_truncate(kind.code()),
        Group::from_bits_truncate(collision_mask(kind)),
    )
}

pub fn wall_groups() -> InteractionGroups {
    InteractionGroups::new(
        Group::from_bits_truncate(WALL_CATEGORY),
        Group::from_bits_truncate(EntityKind::ActiveBall.code()),
    )
}

/// Whether two groups produce contacts, using rapier's rule
pub fn groups_interact(a: InteractionGroups, b: InteractionGroups) -> bool {
    a.test(b)
}

/// What a collider belongs to, stored in its `user_data`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureOwner {
    /// Slot in the entity store
    Entity(usize),
    Wall,
    Floor,
}

impl FixtureOwner {
    const TAG_SHIFT: u32 = 64;
    const TAG_ENTITY: u128 = 1;
    const TAG_WALL: u128 = 2;
    const TAG_FLOOR: u128 = 3;

    pub fn to_user_data(self) -> u128 {
        match self {
            FixtureOwner::Entity(index) => {
                (Self::TAG_ENTITY << Self::TAG_SHIFT) | index as u64 as u128
            }
            FixtureOwner::Wall => Self::TAG_WALL << Self::TAG_SHIFT,
            FixtureOwner::Floor => Self::TAG_FLOOR << Self::TAG_SHIFT,
        }
    }

    pub fn from_user_data(data: u128) -> Option<Self> {
        let index = (data & u64::MAX as u128) as u64;
        match data >> Self::TAG_SHIFT {
            Self::TAG_ENTITY => usize::try_from(index).ok().map(FixtureOwner::Entity),
            Self::TAG_WALL => Some(FixtureOwner::Wall),
            Self::TAG_FLOOR => Some(FixtureOwner::Floor),
            _ => None,
        }
    }
}

/// A pair of colliders that started touching during a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactBegin {
    pub a: ColliderHandle,
    pub b: ColliderHandle,
}

/// Collects contact-begin events emitted during `PhysicsPipeline::step`
#[derive(Default)]
struct ContactCollector {
    begun: Mutex<Vec<ContactBegin>>,
}

impl EventHandler for ContactCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if let CollisionEvent::Started(a, b, _) = event {
            let mut begun = self.begun.lock().unwrap_or_else(|e| e.into_inner());
            begun.push(ContactBegin { a, b });
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// The rigid-body simulation the arena lives in
pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    contacts: ContactCollector,
    pixels_per_meter: f32,
}

impl PhysicsWorld {
    pub fn new(config: &PhysicsConfig) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: config.dt,
            ..IntegrationParameters::default()
        };
        Self {
            gravity: Vector::zeros(),
            integration_parameters,
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            contacts: ContactCollector::default(),
            pixels_per_meter: config.pixels_per_meter,
        }
    }

    #[inline]
    pub fn pixels_per_meter(&self) -> f32 {
        self.pixels_per_meter
    }

    /// Advance the simulation by one fixed timestep
    pub fn step(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.contacts,
        );
    }

    /// Take the contact-begin events recorded since the last call
    pub fn drain_contacts(&mut self) -> Vec<ContactBegin> {
        let begun = self.contacts.begun.get_mut().unwrap_or_else(|e| e.into_inner());
        std::mem::take(begun)
    }

    /// Owner tag of a collider
    pub fn owner(&self, collider: ColliderHandle) -> Option<FixtureOwner> {
        self.colliders
            .get(collider)
            .and_then(|c| FixtureOwner::from_user_data(c.user_data))
    }

    /// Body translation in render units
    pub fn body_position(&self, body: RigidBodyHandle) -> Option<Vec2> {
        self.bodies
            .get(body)
            .map(|b| to_render(b.translation(), self.pixels_per_meter))
    }

    /// Body linear velocity in render units
    pub fn body_velocity(&self, body: RigidBodyHandle) -> Option<Vec2> {
        self.bodies
            .get(body)
            .map(|b| to_render(b.linvel(), self.pixels_per_meter))
    }

    /// Teleport a body to a render-space position and stop it
    pub fn place_body(&mut self, body: RigidBodyHandle, pos: Vec2) {
        let ppm = self.pixels_per_meter;
        if let Some(b) = self.bodies.get_mut(body) {
            b.set_translation(to_sim(pos, ppm), true);
            b.set_linvel(Vector::zeros(), true);
            b.set_angvel(0.0, true);
        }
    }

    /// Set a body's linear velocity from a render-space velocity
    pub fn set_body_velocity(&mut self, body: RigidBodyHandle, vel: Vec2) {
        let ppm = self.pixels_per_meter;
        if let Some(b) = self.bodies.get_mut(body) {
            b.set_linvel(to_sim(vel, ppm), true);
        }
    }

    pub fn set_body_enabled(&mut self, body: RigidBodyHandle, enabled: bool) {
        if let Some(b) = self.bodies.get_mut(body) {
            b.set_enabled(enabled);
        }
    }

    pub fn body_enabled(&self, body: RigidBodyHandle) -> bool {
        self.bodies.get(body).is_some_and(|b| b.is_enabled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_intended_pairs_interact() {
        use EntityKind::*;
        let ball = interaction_groups(ActiveBall);
        assert!(groups_interact(ball, interaction_groups(ActiveCell)));
        assert!(groups_interact(ball, interaction_groups(BallSpawnMarker)));
        assert!(groups_interact(ball, wall_groups()));

        assert!(!groups_interact(ball, ball));
        assert!(!groups_interact(ball, interaction_groups(EmptyCell)));
        assert!(!groups_interact(ball, interaction_groups(InactiveBall)));
        for a in EntityKind::CELL_KINDS {
            for b in EntityKind::CELL_KINDS {
                assert!(!groups_interact(interaction_groups(a), interaction_groups(b)));
            }
            assert!(!groups_interact(interaction_groups(a), wall_groups()));
        }
        assert!(!groups_interact(interaction_groups(InactiveBall), wall_groups()));
    }

    #[test]
    fn test_owner_tags_round_trip() {
        for owner in [
            FixtureOwner::Entity(0),
            FixtureOwner::Entity(2103),
            FixtureOwner::Wall,
            FixtureOwner::Floor,
        ] {
            assert_eq!(FixtureOwner::from_user_data(owner.to_user_data()), Some(owner));
        }
        assert_eq!(FixtureOwner::from_user_data(0), None);
    }

    #[test]
    fn test_free_body_moves_and_reads_back_in_render_units() {
        let mut world = PhysicsWorld::new(&PhysicsConfig::default());
        let body = world.bodies.insert(
            RigidBodyBuilder::dynamic()
                .translation(Vector::new(1.0, 1.0))
                .build(),
        );
        world
            .colliders
            .insert_with_parent(ColliderBuilder::ball(0.1).build(), body, &mut world.bodies);
        world.set_body_velocity(body, Vec2::new(120.0, 0.0));
        for _ in 0..120 {
            world.step();
        }
        let pos = world.body_position(body).unwrap();
        assert!((pos.x - 220.0).abs() < 1.0, "x = {}", pos.x);
        assert!((pos.y - 100.0).abs() < 1e-3);
    }
}
