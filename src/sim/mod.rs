//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity index)
//! - No rendering or platform dependencies beyond the packed GPU record

pub mod arena;
pub mod contact;
pub mod entity;
pub mod physics;
pub mod rotate;
pub mod tick;

pub use arena::{AdvanceOutcome, Arena, DirtyRange};
pub use contact::ContactReport;
pub use entity::{Attributes, Entity, EntityKind, GridLayout};
pub use physics::{FixtureOwner, PhysicsWorld, WALL_CATEGORY, collision_mask, interaction_groups};
pub use rotate::rotate_blocks_left;
pub use tick::{Game, GamePhase, TickInput, tick};
