//! WebGPU rendering module
//!
//! The arena is drawn as one instanced quad per entity. Shapes, colours and
//! digit labels are all produced by a generated shader from the packed
//! per-entity record.

pub mod glyph_atlas;
pub mod offscreen;
pub mod palette;
pub mod pipeline;
pub mod shader;
pub mod vertex;

pub use glyph_atlas::{DigitBitmap, GlyphAtlas, GlyphMetrics};
pub use offscreen::OffscreenTarget;
pub use pipeline::ArenaRenderer;
pub use shader::{GlyphBox, LabelGlyphs, ShaderParams};
pub use vertex::GpuEntity;
