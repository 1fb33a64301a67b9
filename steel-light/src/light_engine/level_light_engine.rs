//! The light engines of one dimension behind a single interface.

use std::sync::Arc;

use steel_utils::{BlockPos, ChunkPos, SectionPos};

use super::{BlockLightEngine, SkyLightEngine};
use crate::{
    LightChunkGetter, LightEngineConfig, LightError, LightLayer, data_layer::DataLayer,
    storage::LightSectionReader,
};

/// Block and sky light of a dimension. Either layer may be absent.
pub struct LevelLightEngine {
    config: LightEngineConfig,
    block_engine: Option<BlockLightEngine>,
    sky_engine: Option<SkyLightEngine>,
}

impl LevelLightEngine {
    /// Creates the engines enabled in `config`.
    pub fn new(
        chunk_source: Arc<dyn LightChunkGetter>,
        config: &LightEngineConfig,
    ) -> Result<Self, LightError> {
        config.validate().map_err(LightError::InvalidConfig)?;
        let block_engine = if config.has_block_light {
            Some(BlockLightEngine::new(Arc::clone(&chunk_source), config)?)
        } else {
            None
        };
        let sky_engine = if config.has_sky_light {
            Some(SkyLightEngine::new(chunk_source, config)?)
        } else {
            None
        };
        Ok(Self {
            config: config.clone(),
            block_engine,
            sky_engine,
        })
    }

    /// The configuration the engines were created with.
    #[must_use]
    pub fn config(&self) -> &LightEngineConfig {
        &self.config
    }

    /// The block light engine, if the dimension has block light.
    #[must_use]
    pub fn block_engine(&self) -> Option<&BlockLightEngine> {
        self.block_engine.as_ref()
    }

    /// The sky light engine, if the dimension has sky light.
    #[must_use]
    pub fn sky_engine(&self) -> Option<&SkyLightEngine> {
        self.sky_engine.as_ref()
    }

    /// Marks the block at `pos` as changed on both layers.
    pub fn check_block(&mut self, pos: BlockPos) {
        if let Some(engine) = &mut self.block_engine {
            engine.check_block(pos);
        }
        if let Some(engine) = &mut self.sky_engine {
            engine.check_block(pos);
        }
    }

    /// Returns true if either layer has pending work.
    #[must_use]
    pub fn has_light_work(&self) -> bool {
        self.block_engine.as_ref().is_some_and(BlockLightEngine::has_light_work)
            || self.sky_engine.as_ref().is_some_and(SkyLightEngine::has_light_work)
    }

    /// Runs both layers to completion. Returns the number of queue entries
    /// processed.
    pub fn run_light_updates(&mut self) -> usize {
        let mut processed = 0;
        if let Some(engine) = &mut self.block_engine {
            processed += engine.run_light_updates();
        }
        if let Some(engine) = &mut self.sky_engine {
            processed += engine.run_light_updates();
        }
        processed
    }

    /// Records whether block section `section` is empty.
    pub fn update_section_status(&mut self, section: SectionPos, is_empty: bool) {
        if let Some(engine) = &mut self.block_engine {
            engine.update_section_status(section, is_empty);
        }
        if let Some(engine) = &mut self.sky_engine {
            engine.update_section_status(section, is_empty);
        }
    }

    /// Enables or disables light for `column`.
    pub fn set_light_enabled(&mut self, column: ChunkPos, enabled: bool) {
        if let Some(engine) = &mut self.block_engine {
            engine.set_light_enabled(column, enabled);
        }
        if let Some(engine) = &mut self.sky_engine {
            engine.set_light_enabled(column, enabled);
        }
    }

    /// Enables light for `column` and queues all its light sources.
    pub fn propagate_light_sources(&mut self, column: ChunkPos) {
        if let Some(engine) = &mut self.block_engine {
            engine.propagate_light_sources(column);
        }
        if let Some(engine) = &mut self.sky_engine {
            engine.propagate_light_sources(column);
        }
    }

    /// Keeps the light of `column` around while its sections are unloaded.
    pub fn retain_data(&mut self, column: ChunkPos, retain: bool) {
        if let Some(engine) = &mut self.block_engine {
            engine.retain_data(column, retain);
        }
        if let Some(engine) = &mut self.sky_engine {
            engine.retain_data(column, retain);
        }
    }

    /// Hands in externally loaded light of `layer` for `section`, or
    /// withdraws it. Ignored for a layer the dimension does not have.
    pub fn queue_section_data(
        &mut self,
        layer: LightLayer,
        section: SectionPos,
        data: Option<DataLayer>,
    ) {
        match layer {
            LightLayer::Block => {
                if let Some(engine) = &mut self.block_engine {
                    engine.queue_section_data(section, data);
                }
            }
            LightLayer::Sky => {
                if let Some(engine) = &mut self.sky_engine {
                    engine.queue_section_data(section, data);
                }
            }
        }
    }

    /// A lock-free reader of the published light of `layer`.
    #[must_use]
    pub fn get_layer_listener(&self, layer: LightLayer) -> Option<LightSectionReader> {
        match layer {
            LightLayer::Block => self.block_engine.as_ref().map(BlockLightEngine::light_section_reader),
            LightLayer::Sky => self.sky_engine.as_ref().map(SkyLightEngine::light_section_reader),
        }
    }

    /// Published light of `layer` at `pos`. A missing layer is dark.
    #[must_use]
    pub fn get_light_value(&self, layer: LightLayer, pos: BlockPos) -> u8 {
        match layer {
            LightLayer::Block => self.block_engine.as_ref().map_or(0, |engine| engine.get_light_value(pos)),
            LightLayer::Sky => self.sky_engine.as_ref().map_or(0, |engine| engine.get_light_value(pos)),
        }
    }

    /// Published light array of `layer` for `section`.
    #[must_use]
    pub fn get_data_layer_data(&self, layer: LightLayer, section: SectionPos) -> Option<Arc<DataLayer>> {
        match layer {
            LightLayer::Block => self.block_engine.as_ref()?.get_data_layer_data(section),
            LightLayer::Sky => self.sky_engine.as_ref()?.get_data_layer_data(section),
        }
    }

    /// Combined brightness at `pos`: the brighter of block light and sky light
    /// dimmed by `sky_darken`.
    #[must_use]
    pub fn get_raw_brightness(&self, pos: BlockPos, sky_darken: u8) -> u8 {
        let sky = self
            .get_light_value(LightLayer::Sky, pos)
            .saturating_sub(sky_darken);
        let block = self.get_light_value(LightLayer::Block, pos);
        block.max(sky)
    }

    /// Number of sections per column that can hold light.
    #[must_use]
    pub fn light_section_count(&self) -> u32 {
        self.config.section_count + 2
    }

    /// Lowest section y that can hold light.
    #[must_use]
    pub fn min_light_section(&self) -> i32 {
        self.config.min_light_section()
    }

    /// One past the highest section y that can hold light.
    #[must_use]
    pub fn max_light_section(&self) -> i32 {
        self.config.max_light_section()
    }
}
