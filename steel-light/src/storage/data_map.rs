//! One generation of light arrays.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use steel_utils::{BlockPos, ChunkPos, SectionPos};

use crate::{LightLayer, MAX_LIGHT, data_layer::DataLayer};

/// Light arrays of every section that stores light, plus the sky bookkeeping
/// needed to answer reads for sections without an array.
///
/// Arrays are shared between generations. Writers go through
/// [`Arc::make_mut`], so an array still referenced by a published generation
/// is copied before its first write and the published one never changes.
#[derive(Debug, Clone, Default)]
pub struct DataLayerStorageMap {
    layers: FxHashMap<SectionPos, Arc<DataLayer>>,
    /// Sky only: one above the highest section of each column that has an
    /// array. Everything from there up is open sky.
    top_sections: FxHashMap<ChunkPos, i32>,
}

impl DataLayerStorageMap {
    /// The array of `section`.
    #[must_use]
    pub fn layer(&self, section: SectionPos) -> Option<&Arc<DataLayer>> {
        self.layers.get(&section)
    }

    /// Returns true if `section` has an array.
    #[must_use]
    pub fn has_layer(&self, section: SectionPos) -> bool {
        self.layers.contains_key(&section)
    }

    /// Number of arrays.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns true if no section has an array.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Sky only: one above the highest section of `column` that has an array.
    #[must_use]
    pub fn top_section(&self, column: ChunkPos) -> Option<i32> {
        self.top_sections.get(&column).copied()
    }

    pub(super) fn layer_mut(&mut self, section: SectionPos) -> Option<&mut DataLayer> {
        self.layers.get_mut(&section).map(Arc::make_mut)
    }

    pub(super) fn set_layer(&mut self, section: SectionPos, layer: Arc<DataLayer>) {
        self.layers.insert(section, layer);
    }

    pub(super) fn remove_layer(&mut self, section: SectionPos) -> Option<Arc<DataLayer>> {
        self.layers.remove(&section)
    }

    pub(super) fn set_top_section(&mut self, column: ChunkPos, top: Option<i32>) {
        match top {
            Some(top) => self.top_sections.insert(column, top),
            None => self.top_sections.remove(&column),
        };
    }

    /// Light at `pos` in this generation.
    ///
    /// Block light without an array is dark. Sky light without an array is
    /// whatever reaches the bottom of the next section up that has one, and
    /// `above_top` at and above the column's top.
    #[must_use]
    pub fn light_value(&self, layer: LightLayer, pos: BlockPos, above_top: u8) -> u8 {
        let (x, y, z) = ((pos.x() & 15) as usize, (pos.y() & 15) as usize, (pos.z() & 15) as usize);
        let mut section = pos.section();
        match layer {
            LightLayer::Block => self.layer(section).map_or(0, |data| data.get(x, y, z)),
            LightLayer::Sky => {
                let Some(top) = self.top_section(section.chunk()) else {
                    return above_top;
                };
                let mut y = y;
                while section.y() < top {
                    if let Some(data) = self.layer(section) {
                        return data.get(x, y, z);
                    }
                    section = section.offset(0, 1, 0);
                    y = 0;
                }
                above_top
            }
        }
    }

    /// Light at `pos` as seen by readers: open sky is fully lit.
    #[must_use]
    pub fn get_light_value(&self, layer: LightLayer, pos: BlockPos) -> u8 {
        self.light_value(layer, pos, MAX_LIGHT)
    }
}
