//! Two slot LRU cache of chunk lookups.

use std::sync::Arc;

use steel_utils::ChunkPos;

use crate::chunk::{LightChunk, LightChunkGetter};

/// Remembers the last two chunks a propagation pass looked up.
///
/// Flood fills mostly stay inside one chunk and cross into at most one other
/// at a time, so two slots catch nearly every lookup. Missing chunks are
/// cached too. The cache must be cleared whenever the set of loaded chunks may
/// have changed, which the engines do at the end of every pass.
#[derive(Default)]
pub struct ChunkCache {
    /// Cached positions, `None` for a free slot.
    positions: [Option<ChunkPos>; 2],
    chunks: [Option<Arc<dyn LightChunk>>; 2],
    /// Last use of each slot (higher = more recent).
    access_counter: [u64; 2],
    global_counter: u64,
}

impl ChunkCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the chunk at `pos`, asking `getter` only on a cache miss.
    pub fn get_or_load(
        &mut self,
        pos: ChunkPos,
        getter: &dyn LightChunkGetter,
    ) -> Option<Arc<dyn LightChunk>> {
        self.global_counter += 1;
        if let Some(slot) = self.positions.iter().position(|&cached| cached == Some(pos)) {
            self.access_counter[slot] = self.global_counter;
            return self.chunks[slot].clone();
        }

        let chunk = getter.chunk_for_lighting(pos.x(), pos.z());
        let slot = usize::from(self.access_counter[1] < self.access_counter[0]);
        self.positions[slot] = Some(pos);
        self.chunks[slot].clone_from(&chunk);
        self.access_counter[slot] = self.global_counter;
        chunk
    }

    /// Forgets every cached chunk.
    pub fn clear(&mut self) {
        self.positions = [None, None];
        self.chunks = [None, None];
        self.access_counter = [0, 0];
        self.global_counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LightLayer, LightState};
    use parking_lot::Mutex;
    use steel_utils::{BlockPos, SectionPos};

    struct Column(ChunkPos);

    impl LightChunk for Column {
        fn pos(&self) -> ChunkPos {
            self.0
        }

        fn light_state(&self, _: BlockPos) -> LightState {
            LightState::AIR
        }

        fn find_block_light_sources(&self, _: &mut dyn FnMut(BlockPos, LightState)) {}

        fn is_section_empty(&self, _: i32) -> bool {
            true
        }

        fn lowest_sky_source_y(&self, _: usize, _: usize) -> i32 {
            i32::MIN
        }
    }

    #[derive(Default)]
    struct CountingGetter {
        lookups: Mutex<Vec<ChunkPos>>,
    }

    impl LightChunkGetter for CountingGetter {
        fn chunk_for_lighting(&self, x: i32, z: i32) -> Option<Arc<dyn LightChunk>> {
            let pos = ChunkPos::new(x, z);
            self.lookups.lock().push(pos);
            (x >= 0).then(|| Arc::new(Column(pos)) as Arc<dyn LightChunk>)
        }

        fn on_light_update(&self, _: LightLayer, _: SectionPos) {}
    }

    #[test]
    fn test_hits_skip_the_getter() {
        let getter = CountingGetter::default();
        let mut cache = ChunkCache::new();
        let pos = ChunkPos::new(0, 0);

        let chunk = cache.get_or_load(pos, &getter);
        assert_eq!(chunk.map(|chunk| chunk.pos()), Some(pos));
        assert!(cache.get_or_load(pos, &getter).is_some());
        assert_eq!(getter.lookups.lock().len(), 1);
    }

    #[test]
    fn test_misses_are_cached() {
        let getter = CountingGetter::default();
        let mut cache = ChunkCache::new();
        let pos = ChunkPos::new(-1, 0);

        assert!(cache.get_or_load(pos, &getter).is_none());
        assert!(cache.get_or_load(pos, &getter).is_none());
        assert_eq!(getter.lookups.lock().len(), 1);
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let getter = CountingGetter::default();
        let mut cache = ChunkCache::new();
        let (a, b, c) = (ChunkPos::new(0, 0), ChunkPos::new(1, 0), ChunkPos::new(2, 0));

        cache.get_or_load(a, &getter);
        cache.get_or_load(b, &getter);
        cache.get_or_load(a, &getter);
        cache.get_or_load(c, &getter);
        // b was evicted, a is still there.
        cache.get_or_load(a, &getter);
        cache.get_or_load(b, &getter);
        assert_eq!(*getter.lookups.lock(), vec![a, b, c, b]);

        cache.clear();
        cache.get_or_load(a, &getter);
        assert_eq!(getter.lookups.lock().len(), 5);
    }
}
