//! Sky light source tracking for chunk columns.

use steel_utils::BlockPos;

use crate::{
    chunk::{LightChunk, LightState},
    light_engine::Direction,
};

/// Marks a column whose sky light reaches below the world.
pub const NEGATIVE_INFINITY: i32 = i32::MIN;

/// Tracks the lowest y where sky light enters each column of a chunk.
///
/// Every voxel of a column from the stored y up receives full sky light
/// straight from above. The stored value is the y of the lowest such voxel:
/// the voxel right above the first occluded edge when scanning down.
///
/// Values are kept relative to one below the world's bottom. Reaching that
/// value means nothing in the column occludes and is reported as
/// [`NEGATIVE_INFINITY`].
#[derive(Debug, Clone)]
pub struct ChunkSkyLightSources {
    /// One below the lowest block y of the world.
    min_y: i32,

    /// Lowest source y of each column, indexed `z * 16 + x`.
    heights: Box<[i32; 256]>,
}

/// Returns true if sky light cannot pass from `upper` straight down into the
/// block below it.
#[must_use]
pub fn is_edge_occluded(upper: &LightState, lower: &LightState) -> bool {
    lower.light_block != 0
        || upper
            .occlusion_shape(Direction::Down)
            .occludes_with(lower.occlusion_shape(Direction::Up))
}

#[inline]
const fn index(x: usize, z: usize) -> usize {
    z * 16 + x
}

impl ChunkSkyLightSources {
    /// Creates a tracker for a world whose blocks span
    /// `min_y..min_y + height`. Every column starts fully exposed.
    #[must_use]
    pub fn new(min_y: i32, height: i32) -> Self {
        debug_assert!(height > 0, "World height must be positive");
        Self {
            min_y: min_y - 1,
            heights: Box::new([min_y - 1; 256]),
        }
    }

    /// Recomputes every column from the chunk's blocks.
    pub fn fill_from(&mut self, chunk: &dyn LightChunk, max_section_y: i32) {
        let min_section_y = (self.min_y + 1) >> 4;
        let Some(top_section) = (min_section_y..max_section_y)
            .rev()
            .find(|&section_y| !chunk.is_section_empty(section_y))
        else {
            self.heights.fill(self.min_y);
            return;
        };

        let origin = chunk.pos();
        for z in 0..16 {
            for x in 0..16 {
                let pos = BlockPos::new(
                    origin.min_block_x() + x as i32,
                    (top_section + 1) << 4,
                    origin.min_block_z() + z as i32,
                );
                let lowest = self.find_lowest_source_y(chunk, pos, top_section, min_section_y);
                self.heights[index(x, z)] = lowest.max(self.min_y);
            }
        }
    }

    /// Scans down from the top of `top_section`, jumping over empty sections.
    fn find_lowest_source_y(
        &self,
        chunk: &dyn LightChunk,
        mut upper_pos: BlockPos,
        top_section: i32,
        min_section_y: i32,
    ) -> i32 {
        let mut upper = LightState::AIR;
        for section_y in (min_section_y..=top_section).rev() {
            if chunk.is_section_empty(section_y) {
                upper = LightState::AIR;
                upper_pos = BlockPos::new(upper_pos.x(), section_y << 4, upper_pos.z());
                continue;
            }
            for _ in 0..16 {
                let lower_pos = upper_pos.offset(0, -1, 0);
                let lower = chunk.light_state(lower_pos);
                if is_edge_occluded(&upper, &lower) {
                    return upper_pos.y();
                }
                upper = lower;
                upper_pos = lower_pos;
            }
        }
        self.min_y
    }

    /// Updates the column containing block `(x, y, z)` after that block
    /// changed. Returns true if the column's lowest source moved.
    pub fn update(&mut self, chunk: &dyn LightChunk, x: i32, y: i32, z: i32) -> bool {
        let index = index((x & 15) as usize, (z & 15) as usize);
        let lowest = self.heights[index];
        if y + 1 < lowest {
            return false;
        }

        let above_pos = BlockPos::new(x, y + 1, z);
        let above = chunk.light_state(above_pos);
        let pos = BlockPos::new(x, y, z);
        let state = chunk.light_state(pos);
        if self.update_edge(chunk, index, lowest, above_pos, &above, &state) {
            return true;
        }
        let below = chunk.light_state(BlockPos::new(x, y - 1, z));
        self.update_edge(chunk, index, lowest, pos, &state, &below)
    }

    fn update_edge(
        &mut self,
        chunk: &dyn LightChunk,
        index: usize,
        lowest: i32,
        upper_pos: BlockPos,
        upper: &LightState,
        lower: &LightState,
    ) -> bool {
        let y = upper_pos.y();
        if is_edge_occluded(upper, lower) {
            if y > lowest {
                self.heights[index] = y;
                return true;
            }
        } else if y == lowest {
            self.heights[index] = self.find_lowest_source_below(chunk, upper_pos.offset(0, -1, 0), *lower);
            return true;
        }
        false
    }

    fn find_lowest_source_below(&self, chunk: &dyn LightChunk, mut upper_pos: BlockPos, mut upper: LightState) -> i32 {
        while upper_pos.y() > self.min_y {
            let lower_pos = upper_pos.offset(0, -1, 0);
            let lower = chunk.light_state(lower_pos);
            if is_edge_occluded(&upper, &lower) {
                return upper_pos.y();
            }
            upper = lower;
            upper_pos = lower_pos;
        }
        self.min_y
    }

    #[inline]
    fn extend_below_world(&self, y: i32) -> i32 {
        if y == self.min_y { NEGATIVE_INFINITY } else { y }
    }

    /// Lowest y receiving direct sky light in the local column, or
    /// [`NEGATIVE_INFINITY`].
    #[inline]
    #[must_use]
    pub fn get_lowest_source_y(&self, x: usize, z: usize) -> i32 {
        debug_assert!(x < 16 && z < 16, "Column coordinates must be 0-15");
        self.extend_below_world(self.heights[index(x, z)])
    }

    /// Lowest source y over all columns.
    #[must_use]
    pub fn min_source_y(&self) -> i32 {
        let min = self.heights.iter().copied().min().unwrap_or(self.min_y);
        self.extend_below_world(min)
    }

    /// Highest of the columns' lowest source y. Every section fully above
    /// this is lit by the sky from top to bottom.
    #[must_use]
    pub fn max_source_y(&self) -> i32 {
        let max = self.heights.iter().copied().max().unwrap_or(self.min_y);
        self.extend_below_world(max)
    }
}
