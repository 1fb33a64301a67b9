//! Flood fill shared by the block and sky light engines.
//!
//! Changes are processed in two FIFO phases. The decrease phase removes every
//! value that may have depended on a darkened voxel and re-queues the
//! neighbors that are lit by something else. The increase phase then spreads
//! light outwards again, one step per queue entry. Both phases only touch
//! voxels in sections that store light.

use std::{marker::PhantomData, sync::Arc};

use rustc_hash::FxHashSet;
use steel_utils::{BlockPos, ChunkPos, SectionPos};

use super::{
    chunk_cache::ChunkCache, direction::Direction, light_queue::LightQueue,
    queue_entry::QueueEntry,
};
use crate::{
    LightChunk, LightChunkGetter, LightEngineConfig, LightError, LightLayer, LightState,
    data_layer::DataLayer,
    storage::{LayerLightSectionStorage, LightSectionReader},
};

/// What differs between the block and sky layers.
pub trait LightRules: Sized {
    /// The layer the engine writes.
    const LAYER: LightLayer;

    /// Whether voxels emit light of their own on this layer. Emitting voxels
    /// relight themselves when a decrease passes through them.
    const HAS_EMISSION: bool;

    /// Re-evaluates a voxel whose block changed and queues the resulting
    /// decreases and increases.
    fn check_node(engine: &mut LightEngine<Self>, pos: BlockPos);

    /// Enables light for the column of `chunk` and queues every source in it.
    fn propagate_light_sources(engine: &mut LightEngine<Self>, chunk: ChunkPos);
}

/// Light propagation for one layer.
pub struct LightEngine<R> {
    pub(super) storage: LayerLightSectionStorage,
    chunk_source: Arc<dyn LightChunkGetter>,
    blocks_to_check: FxHashSet<BlockPos>,
    decrease_queue: LightQueue,
    increase_queue: LightQueue,
    chunk_cache: ChunkCache,
    _rules: PhantomData<R>,
}

impl<R: LightRules> LightEngine<R> {
    /// Creates an engine reading chunks from `chunk_source`.
    pub fn new(
        chunk_source: Arc<dyn LightChunkGetter>,
        config: &LightEngineConfig,
    ) -> Result<Self, LightError> {
        Ok(Self {
            storage: LayerLightSectionStorage::new(R::LAYER, Arc::clone(&chunk_source), config)?,
            chunk_source,
            blocks_to_check: FxHashSet::default(),
            decrease_queue: LightQueue::new(),
            increase_queue: LightQueue::new(),
            chunk_cache: ChunkCache::new(),
            _rules: PhantomData,
        })
    }

    /// The section storage of this layer.
    #[must_use]
    pub fn storage(&self) -> &LayerLightSectionStorage {
        &self.storage
    }

    /// Marks the block at `pos` as changed.
    pub fn check_block(&mut self, pos: BlockPos) {
        self.blocks_to_check.insert(pos);
    }

    /// Returns true if a call to [`LightEngine::run_light_updates`] has
    /// anything to do.
    #[must_use]
    pub fn has_light_work(&self) -> bool {
        !self.blocks_to_check.is_empty()
            || !self.decrease_queue.is_empty()
            || !self.increase_queue.is_empty()
            || self.storage.has_inconsistencies()
    }

    /// Processes every marked block and queued change, then publishes the
    /// result. Returns the number of queue entries processed.
    pub fn run_light_updates(&mut self) -> usize {
        let dirty: Vec<BlockPos> = self.blocks_to_check.drain().collect();
        for pos in dirty {
            R::check_node(self, pos);
        }

        let mut processed = 0;
        while let Some((pos, entry)) = self.decrease_queue.dequeue() {
            self.propagate_decrease(pos, entry);
            processed += 1;
        }
        while let Some((pos, entry)) = self.increase_queue.dequeue() {
            let mut stored = self.storage.get_stored_level(pos);
            let from = entry.level();
            if entry.is_from_emission() && stored < from {
                self.storage.set_stored_level(pos, from);
                stored = from;
            }
            if stored == from {
                self.propagate_increase(pos, entry, from);
            }
            processed += 1;
        }
        if processed > 0 {
            log::trace!("Processed {processed} {:?} light changes", R::LAYER);
        }

        self.chunk_cache.clear();
        self.storage.mark_new_inconsistencies();
        self.storage.swap_section_map();
        processed
    }

    fn propagate_increase(&mut self, pos: BlockPos, entry: QueueEntry, level: u8) {
        let mut from_state = None;
        for direction in Direction::ALL {
            if !entry.should_propagate(direction) {
                continue;
            }
            let neighbor = direction.relative(pos);
            if !self.storage.storing_light_for_section(neighbor.section()) {
                continue;
            }
            let current = self.storage.get_stored_level(neighbor);
            if level.saturating_sub(1) <= current {
                continue;
            }
            let to_state = self.state(neighbor);
            let new_level = level.saturating_sub(to_state.light_block.max(1));
            if new_level <= current {
                continue;
            }
            let from_state = *from_state.get_or_insert_with(|| {
                if entry.is_from_empty_shape() {
                    LightState::AIR
                } else {
                    self.state(pos)
                }
            });
            if from_state.shape_occludes(&to_state, direction) {
                continue;
            }
            self.storage.set_stored_level(neighbor, new_level);
            if new_level > 1 {
                self.enqueue_increase(
                    neighbor,
                    QueueEntry::increase_skip_one_direction(
                        new_level,
                        to_state.is_empty_shape(),
                        direction.opposite(),
                    ),
                );
            }
        }
    }

    fn propagate_decrease(&mut self, pos: BlockPos, entry: QueueEntry) {
        let from = entry.level();
        for direction in Direction::ALL {
            if !entry.should_propagate(direction) {
                continue;
            }
            let neighbor = direction.relative(pos);
            if !self.storage.storing_light_for_section(neighbor.section()) {
                continue;
            }
            let level = self.storage.get_stored_level(neighbor);
            if level == 0 {
                continue;
            }
            if level < from {
                // Possibly lit through `pos`: clear it and let the neighbors
                // push their light back in.
                let (emission, empty_shape) = if R::HAS_EMISSION {
                    let state = self.state(neighbor);
                    (state.emission, state.is_empty_shape())
                } else {
                    (0, false)
                };
                self.storage.set_stored_level(neighbor, 0);
                if emission < level {
                    self.enqueue_decrease(
                        neighbor,
                        QueueEntry::decrease_skip_one_direction(level, direction.opposite()),
                    );
                }
                if emission > 0 {
                    self.enqueue_increase(
                        neighbor,
                        QueueEntry::increase_from_emission(emission, empty_shape),
                    );
                }
            } else {
                // Brighter than anything `pos` gave it: a source of its own.
                self.enqueue_increase(
                    neighbor,
                    QueueEntry::increase_only_one_direction(level, false, direction.opposite()),
                );
            }
        }
    }

    /// Queues a change for the increase phase.
    pub fn enqueue_increase(&mut self, pos: BlockPos, entry: QueueEntry) {
        self.increase_queue.enqueue(pos, entry);
    }

    /// Queues a change for the decrease phase.
    pub fn enqueue_decrease(&mut self, pos: BlockPos, entry: QueueEntry) {
        self.decrease_queue.enqueue(pos, entry);
    }

    /// The chunk at `pos`, through the cache.
    pub(super) fn chunk(&mut self, pos: ChunkPos) -> Option<Arc<dyn LightChunk>> {
        self.chunk_cache.get_or_load(pos, self.chunk_source.as_ref())
    }

    /// Light properties of the block at `pos`. Blocks of missing chunks are
    /// opaque.
    pub(super) fn state(&mut self, pos: BlockPos) -> LightState {
        self.chunk(pos.chunk())
            .map_or(LightState::OPAQUE, |chunk| chunk.light_state(pos))
    }

    /// Records whether block section `section` is empty.
    pub fn update_section_status(&mut self, section: SectionPos, is_empty: bool) {
        self.storage.update_section_status(section, is_empty);
    }

    /// Enables or disables light for `column`.
    pub fn set_light_enabled(&mut self, column: ChunkPos, enabled: bool) {
        self.storage.set_light_enabled(column, enabled);
    }

    /// Keeps the light of `column` around while its sections are unloaded.
    pub fn retain_data(&mut self, column: ChunkPos, retain: bool) {
        self.storage.retain_data(column, retain);
    }

    /// Hands in externally loaded light for `section`, or withdraws it.
    pub fn queue_section_data(&mut self, section: SectionPos, data: Option<DataLayer>) {
        self.storage.queue_section_data(section, data);
    }

    /// Enables light for `chunk` and queues every light source in it.
    pub fn propagate_light_sources(&mut self, chunk: ChunkPos) {
        R::propagate_light_sources(self, chunk);
    }

    /// Published light at `pos`.
    #[must_use]
    pub fn get_light_value(&self, pos: BlockPos) -> u8 {
        self.storage.get_light_value(pos)
    }

    /// Published light array of `section`.
    #[must_use]
    pub fn get_data_layer_data(&self, section: SectionPos) -> Option<Arc<DataLayer>> {
        self.storage.get_data_layer_data(section)
    }

    /// A lock-free reader of the published light.
    #[must_use]
    pub fn light_section_reader(&self) -> LightSectionReader {
        self.storage.reader()
    }
}
