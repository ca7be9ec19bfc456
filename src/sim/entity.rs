//! Entity store types
//!
//! Every grid cell and every ball slot is one `Entity`. The store is a fixed
//! length array: `nx * ny` cells followed by `max_balls` balls, so an index
//! always means the same slot for the lifetime of the arena.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Visual and behavioral role of an entity
///
/// The discriminants are single bits; they double as collision categories and
/// as the numeric kind seen by the shaders.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EntityKind {
    #[default]
    EmptyCell = 1,
    ActiveCell = 2,
    BallSpawnMarker = 4,
    InactiveBall = 8,
    ActiveBall = 16,
}

impl EntityKind {
    /// Kinds a grid cell can hold
    pub const CELL_KINDS: [EntityKind; 3] = [
        EntityKind::EmptyCell,
        EntityKind::ActiveCell,
        EntityKind::BallSpawnMarker,
    ];

    pub const ALL: [EntityKind; 5] = [
        EntityKind::EmptyCell,
        EntityKind::ActiveCell,
        EntityKind::BallSpawnMarker,
        EntityKind::InactiveBall,
        EntityKind::ActiveBall,
    ];

    /// Numeric encoding shared with the GPU
    #[inline]
    pub const fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.code() == code)
    }

    pub fn is_cell(self) -> bool {
        matches!(
            self,
            EntityKind::EmptyCell | EntityKind::ActiveCell | EntityKind::BallSpawnMarker
        )
    }

    pub fn is_ball(self) -> bool {
        matches!(self, EntityKind::InactiveBall | EntityKind::ActiveBall)
    }

    /// Name used in generated shader constants
    pub fn shader_name(self) -> &'static str {
        match self {
            EntityKind::EmptyCell => "KIND_EMPTY_CELL",
            EntityKind::ActiveCell => "KIND_ACTIVE_CELL",
            EntityKind::BallSpawnMarker => "KIND_SPAWN_MARKER",
            EntityKind::InactiveBall => "KIND_INACTIVE_BALL",
            EntityKind::ActiveBall => "KIND_ACTIVE_BALL",
        }
    }
}

/// The part of an entity that moves when rows shift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Attributes {
    pub kind: EntityKind,
    /// Remaining hits for an ActiveCell, unused otherwise
    pub payload: u32,
}

impl Attributes {
    pub const fn new(kind: EntityKind, payload: u32) -> Self {
        Self { kind, payload }
    }

    pub const fn empty_cell() -> Self {
        Self::new(EntityKind::EmptyCell, 0)
    }

    pub const fn inactive_ball() -> Self {
        Self::new(EntityKind::InactiveBall, 0)
    }
}

/// A cell or ball slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// World position in render units; authoritative for drawing
    pub pos: Vec2,
    pub attrs: Attributes,
    /// Fixed grid slot for cells, `None` for balls
    pub grid_index: Option<usize>,
}

impl Entity {
    pub fn cell(grid_index: usize, pos: Vec2) -> Self {
        Self {
            pos,
            attrs: Attributes::empty_cell(),
            grid_index: Some(grid_index),
        }
    }

    pub fn ball() -> Self {
        Self {
            pos: Vec2::ZERO,
            attrs: Attributes::inactive_ball(),
            grid_index: None,
        }
    }

    #[inline]
    pub fn kind(&self) -> EntityKind {
        self.attrs.kind
    }

    #[inline]
    pub fn payload(&self) -> u32 {
        self.attrs.payload
    }
}

/// Index arithmetic for a grid of `nx` columns by `ny` rows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub nx: usize,
    pub ny: usize,
    pub cell_size: f32,
}

impl GridLayout {
    pub fn new(nx: u32, ny: u32, cell_size: f32) -> Self {
        Self {
            nx: nx as usize,
            ny: ny as usize,
            cell_size,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (column, row) of a cell index
    #[inline]
    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index % self.nx, index / self.nx)
    }

    #[inline]
    pub fn index(&self, column: usize, row: usize) -> usize {
        row * self.nx + column
    }

    /// Index range of a row
    #[inline]
    pub fn row(&self, row: usize) -> std::ops::Range<usize> {
        row * self.nx..(row + 1) * self.nx
    }

    /// Center of a cell in render units
    pub fn cell_center(&self, index: usize) -> Vec2 {
        let (x, y) = self.coords(index);
        self.cell_size * (Vec2::splat(0.5) + Vec2::new(x as f32, y as f32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_codes_are_distinct_bits() {
        let mut seen = 0u32;
        for kind in EntityKind::ALL {
            assert_eq!(kind.code().count_ones(), 1);
            assert_eq!(seen & kind.code(), 0);
            seen |= kind.code();
            assert_eq!(EntityKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(EntityKind::from_code(3), None);
    }

    #[test]
    fn test_cell_and_ball_partition() {
        for kind in EntityKind::ALL {
            assert_ne!(kind.is_cell(), kind.is_ball());
        }
        assert!(EntityKind::CELL_KINDS.iter().all(|k| k.is_cell()));
    }

    #[test]
    fn test_grid_layout_math() {
        let grid = GridLayout::new(7, 8, 100.0);
        assert_eq!(grid.len(), 56);
        assert_eq!(grid.coords(9), (2, 1));
        assert_eq!(grid.index(2, 1), 9);
        assert_eq!(grid.row(7), 49..56);
        assert_eq!(grid.cell_center(0), Vec2::new(50.0, 50.0));
        assert_eq!(grid.cell_center(9), Vec2::new(250.0, 150.0));
    }
}
