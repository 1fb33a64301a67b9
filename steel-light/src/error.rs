//! Errors raised while setting up the light engine.

use thiserror::Error;

/// Errors produced by the lighting core.
///
/// Propagation itself never fails: missing chunks and sections only stop light
/// from spreading. These errors come from construction and external input.
#[derive(Debug, Error)]
pub enum LightError {
    /// A leveled graph was created with too many levels to fit the pending
    /// level byte.
    #[error("level count must be < 254, got {level_count}")]
    LevelCount {
        /// The rejected level count.
        level_count: usize,
    },
    /// The engine configuration failed validation.
    #[error("invalid light engine config: {0}")]
    InvalidConfig(&'static str),
    /// The engine configuration could not be parsed.
    #[error("failed to parse light engine config")]
    ConfigParse(#[from] serde_json5::Error),
    /// An externally supplied light array had the wrong size.
    #[error("light data must be 2048 bytes, got {len}")]
    InvalidDataLayer {
        /// Length of the rejected payload.
        len: usize,
    },
}
