//! Light coming down from the sky.
//!
//! Every voxel at or above its column's lowest source y (see
//! [`ChunkSkyLightSources`](crate::ChunkSkyLightSources)) is a source at full
//! brightness. Sources only spread down and sideways; going up is pointless
//! since everything above a source is a source too.

use std::sync::Arc;

use steel_utils::{BlockPos, ChunkPos, SectionPos};

use super::{
    base::{LightEngine, LightRules},
    direction::Direction,
    queue_entry::QueueEntry,
};
use crate::{LightChunk, LightLayer, MAX_LIGHT, sky_light_sources::NEGATIVE_INFINITY};

/// Sky light rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkyLightRules;

/// The sky light engine.
pub type SkyLightEngine = LightEngine<SkyLightRules>;

#[inline]
const fn index(x: i32, z: i32) -> usize {
    (z * 16 + x) as usize
}

#[inline]
const fn is_inside_chunk(x: i32, z: i32) -> bool {
    x >= 0 && x < 16 && z >= 0 && z < 16
}

impl LightEngine<SkyLightRules> {
    fn lowest_source_y(&mut self, x: i32, z: i32, default: i32) -> i32 {
        self.chunk(ChunkPos::new(x >> 4, z >> 4))
            .map_or(default, |chunk| {
                chunk.lowest_sky_source_y((x & 15) as usize, (z & 15) as usize)
            })
    }

    fn update_sources_in_column(&mut self, x: i32, z: i32, lowest: i32) {
        let bottom_y = self.storage.bottom_section_y() << 4;
        self.remove_sources_below(x, z, lowest, bottom_y);
        self.add_sources_above(x, z, lowest, bottom_y);
    }

    /// Darkens the run of former sources right below `lowest`.
    fn remove_sources_below(&mut self, x: i32, z: i32, lowest: i32, bottom_y: i32) {
        if lowest <= bottom_y {
            return;
        }
        let top = lowest - 1;
        let column = ChunkPos::new(x >> 4, z >> 4);
        for section_y in (self.storage.bottom_section_y()..=top >> 4).rev() {
            if !self
                .storage
                .storing_light_for_section(SectionPos::of_chunk(column, section_y))
            {
                continue;
            }
            let min_y = section_y << 4;
            for y in (min_y..=top.min(min_y + 15)).rev() {
                let pos = BlockPos::new(x, y, z);
                if self.storage.get_stored_level(pos) != MAX_LIGHT {
                    return;
                }
                self.storage.set_stored_level(pos, 0);
                let entry = if y == top {
                    QueueEntry::REMOVE_TOP_SKY_SOURCE
                } else {
                    QueueEntry::REMOVE_SKY_SOURCE
                };
                self.enqueue_decrease(pos, entry);
            }
        }
    }

    /// Turns every voxel from `lowest` up into a source.
    fn add_sources_above(&mut self, x: i32, z: i32, lowest: i32, bottom_y: i32) {
        let neighbors_lowest = Direction::HORIZONTAL
            .iter()
            .map(|direction| {
                let (dx, _, dz) = direction.offset();
                self.lowest_source_y(x + dx, z + dz, NEGATIVE_INFINITY)
            })
            .fold(NEGATIVE_INFINITY, i32::max);

        let start = lowest.max(bottom_y);
        let mut section = SectionPos::of_chunk(ChunkPos::new(x >> 4, z >> 4), start >> 4);
        while !self.storage.is_above_data(section) {
            if self.storage.storing_light_for_section(section) {
                let min_y = section.min_block_y();
                for y in min_y.max(start)..=min_y + 15 {
                    let pos = BlockPos::new(x, y, z);
                    if self.storage.get_stored_level(pos) == MAX_LIGHT {
                        return;
                    }
                    self.storage.set_stored_level(pos, MAX_LIGHT);
                    if y < neighbors_lowest || y == lowest {
                        self.enqueue_increase(pos, QueueEntry::ADD_SKY_SOURCE);
                    }
                }
            }
            section = section.offset(0, 1, 0);
        }
    }
}

impl LightRules for SkyLightRules {
    const LAYER: LightLayer = LightLayer::Sky;
    const HAS_EMISSION: bool = false;

    fn check_node(engine: &mut LightEngine<Self>, pos: BlockPos) {
        let section = pos.section();
        let lowest = if engine.storage.light_on_in_section(section) {
            engine.lowest_source_y(pos.x(), pos.z(), i32::MAX)
        } else {
            i32::MAX
        };
        if lowest != i32::MAX {
            engine.update_sources_in_column(pos.x(), pos.z(), lowest);
        }

        if !engine.storage.storing_light_for_section(section) {
            return;
        }
        if pos.y() >= lowest {
            engine.enqueue_decrease(pos, QueueEntry::REMOVE_SKY_SOURCE);
            engine.enqueue_increase(pos, QueueEntry::ADD_SKY_SOURCE);
        } else {
            let stored = engine.storage.get_stored_level(pos);
            if stored > 0 {
                engine.storage.set_stored_level(pos, 0);
                engine.enqueue_decrease(pos, QueueEntry::decrease_all_directions(stored));
            } else {
                engine.enqueue_decrease(pos, QueueEntry::PULL_LIGHT_IN);
            }
        }
    }

    fn propagate_light_sources(engine: &mut LightEngine<Self>, chunk: ChunkPos) {
        engine.set_light_enabled(chunk, true);
        // Nothing stored means the column reads as open sky everywhere.
        let Some(top_section) = engine.storage.top_section_of(chunk) else {
            return;
        };
        let Some(column) = engine.chunk(chunk) else {
            log::debug!("Chunk {chunk} is not loaded, skipping sky light sources");
            return;
        };

        let bottom_section = engine.storage.bottom_section_y();
        let bottom_y = bottom_section << 4;
        let mut lowest = [0; 256];
        for z in 0..16 {
            for x in 0..16 {
                lowest[index(x, z)] = column
                    .lowest_sky_source_y(x as usize, z as usize)
                    .max(bottom_y);
            }
        }
        let highest = lowest.iter().copied().max().unwrap_or(bottom_y);
        let first_full_section = ((highest + 15) >> 4).max(bottom_section);
        for section_y in first_full_section..top_section {
            engine
                .storage
                .fill_section(SectionPos::of_chunk(chunk, section_y), MAX_LIGHT);
        }

        let neighbor_chunks: [Option<Arc<dyn LightChunk>>; 4] =
            Direction::HORIZONTAL.map(|direction| {
                let (dx, _, dz) = direction.offset();
                engine.chunk(ChunkPos::new(chunk.x() + dx, chunk.z() + dz))
            });
        let full_y = first_full_section << 4;
        let top_y = top_section << 4;

        for z in 0..16 {
            for x in 0..16 {
                let own = lowest[index(x, z)];
                let world_x = chunk.min_block_x() + x;
                let world_z = chunk.min_block_z() + z;

                let mut neighbor_lowest = [None; 4];
                for (slot, direction) in Direction::HORIZONTAL.into_iter().enumerate() {
                    let (dx, _, dz) = direction.offset();
                    let (nx, nz) = (x + dx, z + dz);
                    neighbor_lowest[slot] = if is_inside_chunk(nx, nz) {
                        Some(lowest[index(nx, nz)])
                    } else {
                        neighbor_chunks[slot].as_ref().map(|neighbor| {
                            neighbor
                                .lowest_sky_source_y((nx & 15) as usize, (nz & 15) as usize)
                                .max(bottom_y)
                        })
                    };
                }
                let needs_light = |slot: usize, y: i32| neighbor_lowest[slot].is_some_and(|nb| nb > y);

                for y in own..full_y {
                    let pos = BlockPos::new(world_x, y, world_z);
                    if !engine.storage.storing_light_for_section(pos.section()) {
                        continue;
                    }
                    engine.storage.set_stored_level(pos, MAX_LIGHT);
                    engine.enqueue_increase(
                        pos,
                        QueueEntry::increase_sky_source_in_directions(
                            y == own,
                            needs_light(0, y),
                            needs_light(1, y),
                            needs_light(2, y),
                            needs_light(3, y),
                        ),
                    );
                }

                for (slot, direction) in Direction::HORIZONTAL.into_iter().enumerate() {
                    let (dx, _, dz) = direction.offset();
                    if is_inside_chunk(x + dx, z + dz) {
                        continue;
                    }
                    let Some(neighbor) = neighbor_lowest[slot] else {
                        continue;
                    };
                    // Filled sections are sources too, but were never queued.
                    for y in own.max(full_y)..neighbor.min(top_y) {
                        let pos = BlockPos::new(world_x, y, world_z);
                        if engine.storage.storing_light_for_section(pos.section()) {
                            engine.enqueue_increase(pos, QueueEntry::increase_sky_source_towards(direction));
                        }
                    }
                    // Neighbor sources shining into our shade.
                    for y in neighbor..own {
                        let pos = BlockPos::new(world_x, y, world_z);
                        if engine.storage.storing_light_for_section(pos.section()) {
                            engine.enqueue_increase(
                                direction.relative(pos),
                                QueueEntry::increase_sky_source_towards(direction.opposite()),
                            );
                        }
                    }
                }
            }
        }
    }
}
