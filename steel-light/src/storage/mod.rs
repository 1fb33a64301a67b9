//! Per-section light storage shared by the block and sky engines.
//!
//! The engine thread writes into the `updating` map. After every pass a copy
//! of it is published through an [`ArcSwap`], which is all readers on other
//! threads ever see. Arrays are shared between the two and copied on their
//! first write after a publish.

mod data_map;
mod section_tracker;

use std::sync::Arc;

use arc_swap::ArcSwap;
use rustc_hash::{FxHashMap, FxHashSet};
use steel_utils::{BlockPos, ChunkPos, SectionPos};

pub use data_map::DataLayerStorageMap;
pub use section_tracker::SectionTracker;

use crate::{
    LightChunkGetter, LightEngineConfig, LightError, LightLayer, MAX_LIGHT,
    data_layer::DataLayer,
};

/// Lock-free view of the published light of one layer.
///
/// Cheap to clone and safe to hand to other threads. Every read loads the
/// latest generation; use [`LightSectionReader::snapshot`] to read several
/// values from one generation.
#[derive(Debug, Clone)]
pub struct LightSectionReader {
    layer: LightLayer,
    visible: Arc<ArcSwap<DataLayerStorageMap>>,
}

impl LightSectionReader {
    /// The layer this reader sees.
    #[must_use]
    pub fn layer(&self) -> LightLayer {
        self.layer
    }

    /// The latest published generation.
    #[must_use]
    pub fn snapshot(&self) -> Arc<DataLayerStorageMap> {
        self.visible.load_full()
    }

    /// Published light at `pos`.
    #[must_use]
    pub fn get_light_value(&self, pos: BlockPos) -> u8 {
        self.visible.load().get_light_value(self.layer, pos)
    }

    /// Published array of `section`, if it stores light.
    #[must_use]
    pub fn get_data_layer(&self, section: SectionPos) -> Option<Arc<DataLayer>> {
        self.visible.load().layer(section).cloned()
    }
}

/// Light arrays of one layer plus the bookkeeping deciding which sections have
/// them.
pub struct LayerLightSectionStorage {
    layer: LightLayer,
    chunk_source: Arc<dyn LightChunkGetter>,
    min_section_y: i32,
    max_section_y: i32,
    tracker: SectionTracker,
    updating: DataLayerStorageMap,
    visible: Arc<ArcSwap<DataLayerStorageMap>>,
    /// Sections written since the last publish.
    changed_sections: FxHashSet<SectionPos>,
    /// Sections whose light listeners must hear about the next publish.
    sections_affected: FxHashSet<SectionPos>,
    /// Externally supplied arrays waiting for their section to store light.
    queued_sections: FxHashMap<SectionPos, Arc<DataLayer>>,
    columns_to_retain: FxHashSet<ChunkPos>,
    columns_with_light: FxHashSet<ChunkPos>,
    to_remove: FxHashSet<SectionPos>,
    has_inconsistencies: bool,
}

impl LayerLightSectionStorage {
    /// Creates empty storage for `layer`.
    pub fn new(
        layer: LightLayer,
        chunk_source: Arc<dyn LightChunkGetter>,
        config: &LightEngineConfig,
    ) -> Result<Self, LightError> {
        config.validate().map_err(LightError::InvalidConfig)?;
        Ok(Self {
            layer,
            chunk_source,
            min_section_y: config.min_section_y,
            max_section_y: config.min_section_y + config.section_count as i32,
            tracker: SectionTracker::new()?,
            updating: DataLayerStorageMap::default(),
            visible: Arc::new(ArcSwap::from_pointee(DataLayerStorageMap::default())),
            changed_sections: FxHashSet::default(),
            sections_affected: FxHashSet::default(),
            queued_sections: FxHashMap::default(),
            columns_to_retain: FxHashSet::default(),
            columns_with_light: FxHashSet::default(),
            to_remove: FxHashSet::default(),
            has_inconsistencies: false,
        })
    }

    /// The layer stored here.
    #[must_use]
    pub fn layer(&self) -> LightLayer {
        self.layer
    }

    /// The chunk getter notified about published changes.
    #[must_use]
    pub fn chunk_source(&self) -> &Arc<dyn LightChunkGetter> {
        &self.chunk_source
    }

    /// A reader of the published light.
    #[must_use]
    pub fn reader(&self) -> LightSectionReader {
        LightSectionReader {
            layer: self.layer,
            visible: Arc::clone(&self.visible),
        }
    }

    /// Lowest section y that can store light.
    #[must_use]
    pub fn bottom_section_y(&self) -> i32 {
        self.min_section_y - 1
    }

    /// One above the highest section y that can store light.
    #[must_use]
    pub fn top_section_y(&self) -> i32 {
        self.max_section_y + 1
    }

    /// Returns true if `section` currently has an array to write to.
    #[must_use]
    #[inline]
    pub fn storing_light_for_section(&self, section: SectionPos) -> bool {
        self.updating.has_layer(section)
    }

    /// Returns true if light has been enabled for the column of `section`.
    #[must_use]
    pub fn light_on_in_section(&self, section: SectionPos) -> bool {
        self.columns_with_light.contains(&section.chunk())
    }

    /// Returns true if `section` contains blocks.
    #[must_use]
    pub fn has_data(&self, section: SectionPos) -> bool {
        self.tracker.has_data(section)
    }

    /// Records whether block section `section` is empty and creates or drops
    /// the arrays around it.
    pub fn update_section_status(&mut self, section: SectionPos, is_empty: bool) {
        if section.y() < self.min_section_y || section.y() >= self.max_section_y {
            log::warn!("Ignoring status of section {section} outside of the world");
            return;
        }
        let mut flipped = self.tracker.set_has_data(section, !is_empty);
        // Top down, so new sky sections below can copy from the ones above.
        flipped.sort_unstable_by_key(|section| std::cmp::Reverse(section.y()));
        for section in flipped {
            if self.tracker.stores_light(section) {
                if !self.to_remove.remove(&section) && !self.updating.has_layer(section) {
                    self.initialize_section(section);
                }
            } else if self.updating.has_layer(section) && self.to_remove.insert(section) {
                log::debug!("Queued {:?} light of section {section} for removal", self.layer);
                self.has_inconsistencies = true;
            }
        }
    }

    fn initialize_section(&mut self, section: SectionPos) {
        let layer = self.create_data_layer(section);
        self.updating.set_layer(section, layer);
        self.changed_sections.insert(section);
        self.on_node_added(section);
        self.mark_section_and_neighbors_as_affected(section);
        self.has_inconsistencies = true;
    }

    fn create_data_layer(&self, section: SectionPos) -> Arc<DataLayer> {
        if let Some(queued) = self.queued_sections.get(&section) {
            return Arc::clone(queued);
        }
        if self.layer == LightLayer::Block {
            return Arc::new(DataLayer::empty());
        }

        if let Some(top) = self.updating.top_section(section.chunk()) {
            let mut above = section.offset(0, 1, 0);
            while above.y() < top {
                if let Some(layer) = self.updating.layer(above) {
                    return Arc::new(layer.repeat_first_layer());
                }
                above = above.offset(0, 1, 0);
            }
        }
        if self.light_on_in_section(section) {
            Arc::new(DataLayer::filled(MAX_LIGHT))
        } else {
            Arc::new(DataLayer::empty())
        }
    }

    fn on_node_added(&mut self, section: SectionPos) {
        if self.layer != LightLayer::Sky {
            return;
        }
        let column = section.chunk();
        if self.updating.top_section(column).is_none_or(|top| top <= section.y()) {
            self.updating.set_top_section(column, Some(section.y() + 1));
        }
    }

    fn on_node_removed(&mut self, section: SectionPos) {
        if self.layer != LightLayer::Sky {
            return;
        }
        let column = section.chunk();
        if self.updating.top_section(column) != Some(section.y() + 1) {
            return;
        }
        let top = (self.bottom_section_y()..section.y())
            .rev()
            .find(|&y| self.updating.has_layer(SectionPos::of_chunk(column, y)))
            .map(|y| y + 1);
        self.updating.set_top_section(column, top);
    }

    fn mark_section_and_neighbors_as_affected(&mut self, section: SectionPos) {
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    self.sections_affected.insert(section.offset(dx, dy, dz));
                }
            }
        }
    }

    /// Stored light at `pos`, or 0 where nothing is stored.
    #[must_use]
    #[inline]
    pub fn get_stored_level(&self, pos: BlockPos) -> u8 {
        self.updating.layer(pos.section()).map_or(0, |layer| {
            layer.get(
                (pos.x() & 15) as usize,
                (pos.y() & 15) as usize,
                (pos.z() & 15) as usize,
            )
        })
    }

    /// Stores light at `pos`. Writes to sections without an array are dropped.
    pub fn set_stored_level(&mut self, pos: BlockPos, level: u8) {
        let section = pos.section();
        let Some(layer) = self.updating.layer_mut(section) else {
            return;
        };
        layer.set(
            (pos.x() & 15) as usize,
            (pos.y() & 15) as usize,
            (pos.z() & 15) as usize,
            level,
        );
        self.changed_sections.insert(section);
        let affected = &mut self.sections_affected;
        SectionPos::around_and_at_block_pos(pos, |section| {
            affected.insert(section);
        });
    }

    /// Sets every voxel of `section` to `level` at once.
    pub fn fill_section(&mut self, section: SectionPos, level: u8) {
        let Some(layer) = self.updating.layer(section) else {
            return;
        };
        if layer.is_definitely_filled_with(level) {
            return;
        }
        self.updating
            .set_layer(section, Arc::new(DataLayer::filled(level)));
        self.changed_sections.insert(section);
        self.mark_section_and_neighbors_as_affected(section);
    }

    /// Light at `pos` in the updating map. Open sky counts as lit only in
    /// columns with light enabled.
    #[must_use]
    pub fn updating_light_value(&self, pos: BlockPos) -> u8 {
        let above_top = if self.light_on_in_section(pos.section()) {
            MAX_LIGHT
        } else {
            0
        };
        self.updating.light_value(self.layer, pos, above_top)
    }

    /// Published light at `pos`.
    #[must_use]
    pub fn get_light_value(&self, pos: BlockPos) -> u8 {
        self.visible.load().get_light_value(self.layer, pos)
    }

    /// Published array of `section`.
    #[must_use]
    pub fn get_data_layer_data(&self, section: SectionPos) -> Option<Arc<DataLayer>> {
        self.visible.load().layer(section).cloned()
    }

    /// Sky only: one above the highest section of `column` storing light.
    #[must_use]
    pub fn top_section_of(&self, column: ChunkPos) -> Option<i32> {
        self.updating.top_section(column)
    }

    /// Returns true if `section` is at or above its column's top, where open
    /// sky begins.
    #[must_use]
    pub fn is_above_data(&self, section: SectionPos) -> bool {
        self.updating
            .top_section(section.chunk())
            .is_none_or(|top| section.y() >= top)
    }

    /// Hands in externally loaded light for `section`, or withdraws it.
    pub fn queue_section_data(&mut self, section: SectionPos, data: Option<DataLayer>) {
        match data {
            Some(data) => {
                self.queued_sections.insert(section, Arc::new(data));
                self.has_inconsistencies = true;
            }
            None => {
                self.queued_sections.remove(&section);
            }
        }
    }

    /// Keeps the arrays of `column` around as queued data when its sections
    /// stop storing light.
    pub fn retain_data(&mut self, column: ChunkPos, retain: bool) {
        if retain {
            self.columns_to_retain.insert(column);
        } else {
            self.columns_to_retain.remove(&column);
        }
    }

    /// Enables or disables light for `column`.
    pub fn set_light_enabled(&mut self, column: ChunkPos, enabled: bool) {
        if enabled {
            self.columns_with_light.insert(column);
        } else {
            self.columns_with_light.remove(&column);
        }
    }

    /// Drops arrays of sections queued for removal and moves queued external
    /// data into sections that store light.
    pub fn mark_new_inconsistencies(&mut self) {
        if !self.has_inconsistencies {
            return;
        }
        self.has_inconsistencies = false;

        let removed: Vec<SectionPos> = self.to_remove.drain().collect();
        for &section in &removed {
            let queued = self.queued_sections.remove(&section);
            let layer = self.updating.remove_layer(section);
            if self.columns_to_retain.contains(&section.chunk()) {
                if let Some(data) = queued.or(layer) {
                    self.queued_sections.insert(section, data);
                }
            }
            self.changed_sections.insert(section);
        }
        for &section in &removed {
            self.on_node_removed(section);
        }
        if !removed.is_empty() {
            log::debug!("Removed {} {:?} light sections", removed.len(), self.layer);
        }

        let ready: Vec<SectionPos> = self
            .queued_sections
            .keys()
            .copied()
            .filter(|&section| self.updating.has_layer(section))
            .collect();
        for section in ready {
            let Some(data) = self.queued_sections.remove(&section) else {
                continue;
            };
            let current = self.updating.layer(section);
            if !current.is_some_and(|current| Arc::ptr_eq(current, &data)) {
                self.updating.set_layer(section, data);
                self.mark_section_and_neighbors_as_affected(section);
            }
            self.changed_sections.insert(section);
        }
    }

    /// Publishes the updating map if anything changed and notifies listeners
    /// of every affected section.
    pub fn swap_section_map(&mut self) {
        if !self.changed_sections.is_empty() {
            log::trace!(
                "Publishing {:?} light, {} sections changed",
                self.layer,
                self.changed_sections.len()
            );
            self.visible.store(Arc::new(self.updating.clone()));
            self.changed_sections.clear();
        }
        for section in self.sections_affected.drain() {
            self.chunk_source.on_light_update(self.layer, section);
        }
    }

    /// Returns true if sections wait for removal or queued data waits to be
    /// merged.
    #[must_use]
    pub fn has_inconsistencies(&self) -> bool {
        self.has_inconsistencies
    }

    /// Number of sections with an array in the updating map.
    #[must_use]
    pub fn section_count(&self) -> usize {
        self.updating.len()
    }

    /// Number of externally supplied arrays still waiting for their section.
    #[must_use]
    pub fn queued_section_count(&self) -> usize {
        self.queued_sections.len()
    }
}
