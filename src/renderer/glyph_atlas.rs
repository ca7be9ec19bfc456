//! Digit glyph atlas for square labels
//!
//! Rasterizes the ten decimal digits with fontdue and packs them side by side
//! into a single-channel texture, one fixed-width tile per digit. Every digit
//! must rasterize to the same height; the label layout in the fragment shader
//! relies on it.

use std::path::Path;

use fontdue::{Font, FontSettings};

use crate::error::AtlasError;

/// Placement of one digit inside the atlas, in pixels unless noted
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphMetrics {
    pub width: u32,
    pub height: u32,
    /// Left edge offset from the pen position
    pub bearing_x: f32,
    /// Top edge above the baseline
    pub bearing_y: f32,
    pub advance: f32,
    /// Normalized texture rectangle (u0, v0, u1, v1), v0 at the top row
    pub uv: [f32; 4],
}

/// A rasterized digit before packing
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DigitBitmap {
    pub width: u32,
    pub height: u32,
    pub xmin: i32,
    /// Bottom edge relative to the baseline (positive up)
    pub ymin: i32,
    pub advance: f32,
    /// Row-major coverage, top row first
    pub coverage: Vec<u8>,
}

pub struct GlyphAtlas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    glyphs: [GlyphMetrics; 10],
}

impl GlyphAtlas {
    /// Read a font file and build the atlas at `px` pixels
    pub fn load(path: &Path, px: f32) -> Result<Self, AtlasError> {
        let bytes = std::fs::read(path).map_err(|source| AtlasError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let atlas = Self::from_font_bytes(&bytes, px)?;
        log::info!(
            "Glyph atlas from {}: {}x{} at {px}px",
            path.display(),
            atlas.width,
            atlas.height
        );
        Ok(atlas)
    }

    pub fn from_font_bytes(bytes: &[u8], px: f32) -> Result<Self, AtlasError> {
        let settings = FontSettings {
            scale: px,
            ..FontSettings::default()
        };
        let font = Font::from_bytes(bytes, settings).map_err(|e| AtlasError::Font(e.to_string()))?;

        let digits: [DigitBitmap; 10] = std::array::from_fn(|d| {
            let ch = char::from(b'0' + d as u8);
            let (metrics, coverage) = font.rasterize(ch, px);
            DigitBitmap {
                width: metrics.width as u32,
                height: metrics.height as u32,
                xmin: metrics.xmin,
                ymin: metrics.ymin,
                advance: metrics.advance_width,
                coverage,
            }
        });
        Self::from_bitmaps(&digits)
    }

    /// Pack ten digit bitmaps, `digits[d]` being the glyph for `d`
    pub fn from_bitmaps(digits: &[DigitBitmap; 10]) -> Result<Self, AtlasError> {
        for (digit, g) in digits.iter().enumerate() {
            if g.width == 0 || g.height == 0 || g.coverage.len() != (g.width * g.height) as usize {
                return Err(AtlasError::EmptyGlyph { digit });
            }
        }
        let height = digits[0].height;
        if let Some((digit, g)) = digits.iter().enumerate().find(|(_, g)| g.height != height) {
            return Err(AtlasError::NonUniformGlyphHeight {
                digit,
                expected: height,
                found: g.height,
            });
        }

        let tile = digits.iter().map(|g| g.width).max().unwrap_or(1);
        let width = tile * 10;
        let mut pixels = vec![0u8; (width * height) as usize];
        let mut glyphs = [GlyphMetrics::default(); 10];

        for (d, g) in digits.iter().enumerate() {
            let x0 = d as u32 * tile;
            for row in 0..g.height {
                let src = (row * g.width) as usize;
                let dst = (row * width + x0) as usize;
                pixels[dst..dst + g.width as usize]
                    .copy_from_slice(&g.coverage[src..src + g.width as usize]);
            }
            glyphs[d] = GlyphMetrics {
                width: g.width,
                height: g.height,
                bearing_x: g.xmin as f32,
                bearing_y: (g.ymin + g.height as i32) as f32,
                advance: g.advance,
                uv: [
                    x0 as f32 / width as f32,
                    0.0,
                    (x0 + g.width) as f32 / width as f32,
                    1.0,
                ],
            };
        }

        Ok(Self {
            width,
            height,
            pixels,
            glyphs,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Shared glyph height, also the texture height
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn glyphs(&self) -> &[GlyphMetrics; 10] {
        &self.glyphs
    }
}

/// Digit `d` as a `(d + 1)`-wide, 5-tall block filled with `d * 10 + 1`
#[cfg(test)]
pub(crate) fn synthetic_digits() -> [DigitBitmap; 10] {
    std::array::from_fn(|d| {
        let width = d as u32 + 1;
        DigitBitmap {
            width,
            height: 5,
            xmin: 1,
            ymin: -1,
            advance: width as f32 + 2.0,
            coverage: vec![d as u8 * 10 + 1; (width * 5) as usize],
        }
    })
}
