//! Light engine configuration.

use serde::Deserialize;

use crate::LightError;

/// The default configuration as written to disk by hosts that persist it.
pub const DEFAULT_CONFIG: &str = r"{
    // Lowest section y of the dimension (block y = section y * 16).
    min_section_y: -4,
    // Number of block sections in every column.
    section_count: 24,
    has_sky_light: true,
    has_block_light: true,
    // Queued light tasks that trigger a batched update.
    task_batch_size: 1000,
}";

/// Configuration of a dimension's light engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LightEngineConfig {
    /// Lowest block section y of the dimension.
    pub min_section_y: i32,
    /// Number of block sections per column.
    pub section_count: u32,
    /// Whether the dimension has a sky light layer.
    pub has_sky_light: bool,
    /// Whether the dimension has a block light layer.
    pub has_block_light: bool,
    /// Number of queued tasks after which the threaded engine runs a batch.
    pub task_batch_size: usize,
}

impl LightEngineConfig {
    /// Parses and validates a json5 configuration.
    pub fn from_json5(text: &str) -> Result<Self, LightError> {
        let config: Self = serde_json5::from_str(text)?;
        config.validate().map_err(LightError::InvalidConfig)?;
        Ok(config)
    }

    /// Checks the configuration for values the engine cannot work with.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.section_count == 0 {
            return Err("Section count must be at least 1");
        }
        if self.section_count > 4064 / 16 {
            return Err("Columns can be at most 4064 blocks high");
        }
        if self.min_section_y < -128 || self.min_section_y + self.section_count as i32 > 128 {
            return Err("Sections must stay within block y -2048..2047");
        }
        if self.task_batch_size == 0 {
            return Err("Task batch size must be at least 1");
        }
        Ok(())
    }

    /// Lowest section y that can hold light data.
    ///
    /// Light is stored one section below and above the block sections so light
    /// at the world border has somewhere to go.
    #[must_use]
    pub fn min_light_section(&self) -> i32 {
        self.min_section_y - 1
    }

    /// One past the highest section y that can hold light data.
    #[must_use]
    pub fn max_light_section(&self) -> i32 {
        self.min_section_y + self.section_count as i32 + 1
    }

    /// Lowest block y of the dimension.
    #[must_use]
    pub fn min_y(&self) -> i32 {
        self.min_section_y << 4
    }

    /// Total block height of the dimension.
    #[must_use]
    pub fn height(&self) -> i32 {
        (self.section_count as i32) << 4
    }
}

impl Default for LightEngineConfig {
    fn default() -> Self {
        Self {
            min_section_y: -4,
            section_count: 24,
            has_sky_light: true,
            has_block_light: true,
            task_batch_size: 1000,
        }
    }
}
