//! Light emitted by blocks.

use steel_utils::{BlockPos, ChunkPos};

use super::{
    base::{LightEngine, LightRules},
    queue_entry::QueueEntry,
};
use crate::LightLayer;

/// Block light rules: every voxel is lit by the brightest emitter within
/// reach, losing at least one level per step.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockLightRules;

/// The block light engine.
pub type BlockLightEngine = LightEngine<BlockLightRules>;

impl LightRules for BlockLightRules {
    const LAYER: LightLayer = LightLayer::Block;
    const HAS_EMISSION: bool = true;

    fn check_node(engine: &mut LightEngine<Self>, pos: BlockPos) {
        if !engine.storage.storing_light_for_section(pos.section()) {
            return;
        }
        let state = engine.state(pos);
        let stored = engine.storage.get_stored_level(pos);
        if state.emission < stored {
            engine.storage.set_stored_level(pos, 0);
            engine.enqueue_decrease(pos, QueueEntry::decrease_all_directions(stored));
        } else {
            engine.enqueue_decrease(pos, QueueEntry::PULL_LIGHT_IN);
        }
        if state.emission > 0 {
            engine.enqueue_increase(
                pos,
                QueueEntry::increase_from_emission(state.emission, state.is_empty_shape()),
            );
        }
    }

    fn propagate_light_sources(engine: &mut LightEngine<Self>, chunk: ChunkPos) {
        engine.set_light_enabled(chunk, true);
        let Some(column) = engine.chunk(chunk) else {
            log::debug!("Chunk {chunk} is not loaded, no block light sources to add");
            return;
        };
        let mut sources = Vec::new();
        column.find_block_light_sources(&mut |pos, state| {
            sources.push((pos, state));
        });
        for (pos, state) in sources {
            engine.enqueue_increase(
                pos,
                QueueEntry::increase_from_emission(state.emission, state.is_empty_shape()),
            );
        }
    }
}
