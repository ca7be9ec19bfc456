//! Arena settings and tuning
//!
//! Loaded from an optional JSON file; every field falls back to the
//! defaults in `crate::consts`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;

/// Relative odds for each kind drawn into a freshly spawned row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnWeights {
    pub empty: u32,
    pub active: u32,
    pub spawn_marker: u32,
}

impl Default for SpawnWeights {
    fn default() -> Self {
        Self {
            empty: 4,
            active: 4,
            spawn_marker: 1,
        }
    }
}

impl SpawnWeights {
    pub fn total(&self) -> u32 {
        self.empty + self.active + self.spawn_marker
    }
}

/// Arena geometry, in render units (pixels)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub nx: u32,
    pub ny: u32,
    pub max_balls: u32,
    pub cell_size: f32,
    pub square_size: f32,
    pub ball_radius: f32,
    pub ball_spawn_rel_size: f32,
    /// Launch speed in pixels/s
    pub ball_velocity: f32,
    /// Launch angles are clamped to [min, PI - min]
    pub min_launch_angle: f32,
    pub spawn_weights: SpawnWeights,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            nx: NX,
            ny: NY,
            max_balls: MAX_BALLS,
            cell_size: CELL_SIZE,
            square_size: SQUARE_SIZE,
            ball_radius: BALL_RADIUS,
            ball_spawn_rel_size: BALL_SPAWN_REL_SIZE,
            ball_velocity: BALL_VELOCITY,
            min_launch_angle: 0.1,
            spawn_weights: SpawnWeights::default(),
        }
    }
}

impl ArenaConfig {
    pub fn grid_len(&self) -> usize {
        (self.nx * self.ny) as usize
    }

    pub fn width(&self) -> f32 {
        self.nx as f32 * self.cell_size
    }

    pub fn height(&self) -> f32 {
        self.ny as f32 * self.cell_size
    }

    pub fn ball_spawn_size(&self) -> f32 {
        self.ball_spawn_rel_size * self.square_size
    }
}

/// Physics tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub pixels_per_meter: f32,
    pub dt: f32,
    pub restitution: f32,
    pub friction: f32,
    /// Wall collider thickness (pixels)
    pub wall_thickness: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            pixels_per_meter: PIXELS_PER_METER,
            dt: SIM_DT,
            restitution: 1.0,
            friction: 0.0,
            wall_thickness: 50.0,
        }
    }
}

/// Shader and label tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub max_payload: u32,
    pub ball_feather: f32,
    pub spawn_marker_extent: f32,
    /// TrueType/OpenType font used for digit labels; labels are off when absent
    pub font_path: Option<String>,
    pub font_scale: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_payload: MAX_PAYLOAD,
            ball_feather: BALL_FEATHER,
            spawn_marker_extent: SPAWN_MARKER_EXTENT,
            font_path: None,
            font_scale: FONT_SCALE,
        }
    }
}

/// All settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub arena: ArenaConfig,
    pub physics: PhysicsConfig,
    pub render: RenderConfig,
}

impl Settings {
    /// Load settings from a JSON file, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = match path {
            Some(path) => {
                let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                let settings = Self::from_json(&json)?;
                log::info!("Loaded settings from {}", path.display());
                settings
            }
            None => {
                log::info!("Using default settings");
                Self::default()
            }
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reject geometry the arena cannot be built from
    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.arena;
        if a.nx == 0 || a.ny < 2 {
            return Err(ConfigError::Invalid(format!(
                "grid must be at least 1x2, got {}x{}",
                a.nx, a.ny
            )));
        }
        if a.max_balls == 0 {
            return Err(ConfigError::Invalid("max_balls must be positive".into()));
        }
        if !(a.cell_size > 0.0) || !(a.square_size > 0.0) || a.square_size > a.cell_size {
            return Err(ConfigError::Invalid(format!(
                "square size {} must be positive and fit in cell size {}",
                a.square_size, a.cell_size
            )));
        }
        if !(a.ball_radius > 0.0) || a.ball_radius * 2.0 > a.cell_size {
            return Err(ConfigError::Invalid(format!(
                "ball radius {} must be positive and fit in a cell",
                a.ball_radius
            )));
        }
        if !(a.ball_spawn_rel_size > 0.0 && a.ball_spawn_rel_size <= 1.0) {
            return Err(ConfigError::Invalid(
                "ball_spawn_rel_size must be in (0, 1]".into(),
            ));
        }
        if a.spawn_weights.total() == 0 {
            return Err(ConfigError::Invalid("spawn weights are all zero".into()));
        }
        if !(self.physics.pixels_per_meter > 0.0) || !(self.physics.dt > 0.0) {
            return Err(ConfigError::Invalid(
                "pixels_per_meter and dt must be positive".into(),
            ));
        }
        if self.render.max_payload < 2 {
            return Err(ConfigError::Invalid("max_payload must be at least 2".into()));
        }
        if !(self.render.ball_feather >= 0.0 && self.render.ball_feather < 1.0) {
            return Err(ConfigError::Invalid("ball_feather must be in [0, 1)".into()));
        }
        Ok(())
    }
}
