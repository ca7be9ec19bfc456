//! Error types
//!
//! Game over is not an error; see `sim::AdvanceOutcome`.

use std::path::PathBuf;

use thiserror::Error;

/// Settings could not be loaded or are inconsistent
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// Digit glyph atlas could not be built
#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("failed to read font file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to load font data: {0}")]
    Font(String),

    #[error("glyph for digit {digit} is empty")]
    EmptyGlyph { digit: usize },

    #[error(
        "font does not provide uniform height digits: digit {digit} is {found}px, expected {expected}px"
    )]
    NonUniformGlyphHeight {
        digit: usize,
        expected: u32,
        found: u32,
    },
}

/// Generated WGSL failed to parse or validate
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to parse shader:\n{0}")]
    Parse(String),

    #[error("failed to validate shader:\n{0}")]
    Validation(String),
}

/// Render bridge setup failure
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error("no compatible graphics adapter: {0}")]
    Adapter(String),

    #[error("failed to create graphics device: {0}")]
    Device(String),
}
