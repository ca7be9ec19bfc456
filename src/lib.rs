//! Baller - a descending-grid ball shooter
//!
//! Core modules:
//! - `sim`: Arena simulation (entity store, physics bridge, row advance, contacts)
//! - `renderer`: WebGPU render bridge and procedurally generated shaders
//! - `settings`: Data-driven arena geometry and tuning
//! - `error`: Error types shared by the modules above

pub mod error;
pub mod renderer;
pub mod settings;
pub mod sim;

pub use error::{AtlasError, ConfigError, RenderError, ShaderError};
pub use settings::{ArenaConfig, PhysicsConfig, RenderConfig, Settings, SpawnWeights};

use glam::Vec2;
use rapier2d::prelude::{Real, Vector};

/// Arena configuration constants (defaults for `ArenaConfig`)
pub mod consts {
    /// Grid columns
    pub const NX: u32 = 7;
    /// Grid rows
    pub const NY: u32 = 8;
    /// Ball pool size
    pub const MAX_BALLS: u32 = 2048;

    /// Grid cell pitch (pixels)
    pub const CELL_SIZE: f32 = 100.0;
    /// Side of a breakable square (pixels)
    pub const SQUARE_SIZE: f32 = 85.0;
    pub const BALL_RADIUS: f32 = CELL_SIZE * 0.1;
    /// Spawn marker footprint relative to a square
    pub const BALL_SPAWN_REL_SIZE: f32 = 0.55;
    /// Launch speed (pixels/s)
    pub const BALL_VELOCITY: f32 = 500.0;

    /// Render units per simulation meter
    pub const PIXELS_PER_METER: f32 = 100.0;
    /// Fixed simulation timestep (120 Hz)
    pub const SIM_DT: f32 = 1.0 / 120.0;

    /// Payload at which the square gradient saturates
    pub const MAX_PAYLOAD: u32 = 50;
    /// Inner radius (relative) where the ball disc starts fading out
    pub const BALL_FEATHER: f32 = 0.75;
    /// Spawn marker quad half-extent relative to a square
    pub const SPAWN_MARKER_EXTENT: f32 = 0.75;
    /// Label glyph height relative to a square
    pub const FONT_SCALE: f32 = 0.25;
}

/// Convert a render-space (pixel) position to simulation space (meters)
#[inline]
pub fn to_sim(pos: Vec2, pixels_per_meter: f32) -> Vector<Real> {
    Vector::new(pos.x / pixels_per_meter, pos.y / pixels_per_meter)
}

/// Convert a simulation-space (meter) position to render space (pixels)
#[inline]
pub fn to_render(v: &Vector<Real>, pixels_per_meter: f32) -> Vec2 {
    Vec2::new(v.x * pixels_per_meter, v.y * pixels_per_meter)
}

/// Unit direction for a launch angle measured from +X
#[inline]
pub fn launch_direction(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}
