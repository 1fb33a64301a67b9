//! An in-memory world for driving the light engines in tests.
#![allow(dead_code, missing_docs, clippy::unwrap_used)]

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use steel_light::{
    ChunkSkyLightSources, FaceShape, LevelLightEngine, LightChunk, LightChunkGetter, LightEngineConfig,
    LightLayer, LightState,
};
use steel_utils::{BlockPos, ChunkPos, SectionPos};

pub const TORCH: LightState = LightState::new(14, 0);
pub const GLOWSTONE: LightState = LightState {
    emission: 15,
    ..LightState::OPAQUE
};
pub const LANTERN: LightState = LightState::new(15, 0);
pub const STONE: LightState = LightState::OPAQUE;
/// Transparent but solid, like glass.
pub const GLASS: LightState = LightState::new(0, 0).with_faces([FaceShape::EMPTY; 6]);
/// Dims light passing through, like water.
pub const WATER: LightState = LightState::new(0, 1);

/// A chunk column with sparsely stored blocks.
pub struct TestChunk {
    pos: ChunkPos,
    max_section_y: i32,
    blocks: RwLock<FxHashMap<BlockPos, LightState>>,
    section_counts: RwLock<FxHashMap<i32, usize>>,
    sky_sources: RwLock<ChunkSkyLightSources>,
}

impl TestChunk {
    fn new(pos: ChunkPos, config: &LightEngineConfig) -> Self {
        Self {
            pos,
            max_section_y: config.min_section_y + config.section_count as i32,
            blocks: RwLock::new(FxHashMap::default()),
            section_counts: RwLock::new(FxHashMap::default()),
            sky_sources: RwLock::new(ChunkSkyLightSources::new(config.min_y(), config.height())),
        }
    }

    /// Sets the block at `pos` and keeps the sky sources current. Returns the
    /// previous state.
    pub fn set_block(&self, pos: BlockPos, state: LightState) -> LightState {
        let previous = if state == LightState::AIR {
            self.blocks.write().remove(&pos)
        } else {
            self.blocks.write().insert(pos, state)
        };
        let mut counts = self.section_counts.write();
        if previous.is_none() && state != LightState::AIR {
            *counts.entry(pos.y() >> 4).or_default() += 1;
        } else if previous.is_some() && state == LightState::AIR {
            let count = counts.entry(pos.y() >> 4).or_default();
            *count -= 1;
            if *count == 0 {
                counts.remove(&(pos.y() >> 4));
            }
        }
        drop(counts);
        self.sky_sources.write().update(self, pos.x(), pos.y(), pos.z());
        previous.unwrap_or(LightState::AIR)
    }

    /// Rebuilds the sky sources from scratch.
    pub fn refill_sky_sources(&self) {
        let mut sources = self.sky_sources.write();
        sources.fill_from(self, self.max_section_y);
    }
}

impl LightChunk for TestChunk {
    fn pos(&self) -> ChunkPos {
        self.pos
    }

    fn light_state(&self, pos: BlockPos) -> LightState {
        self.blocks.read().get(&pos).copied().unwrap_or(LightState::AIR)
    }

    fn find_block_light_sources(&self, visit: &mut dyn FnMut(BlockPos, LightState)) {
        let sources: Vec<_> = self
            .blocks
            .read()
            .iter()
            .filter(|(_, state)| state.emission > 0)
            .map(|(pos, state)| (*pos, *state))
            .collect();
        for (pos, state) in sources {
            visit(pos, state);
        }
    }

    fn is_section_empty(&self, section_y: i32) -> bool {
        !self.section_counts.read().contains_key(&section_y)
    }

    fn lowest_sky_source_y(&self, local_x: usize, local_z: usize) -> i32 {
        self.sky_sources.read().get_lowest_source_y(local_x, local_z)
    }
}

/// Loaded chunks plus a record of light update notifications.
pub struct TestWorld {
    config: LightEngineConfig,
    chunks: RwLock<FxHashMap<ChunkPos, Arc<TestChunk>>>,
    light_updates: Mutex<Vec<(LightLayer, SectionPos)>>,
}

impl TestWorld {
    pub fn new(config: LightEngineConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            chunks: RwLock::new(FxHashMap::default()),
            light_updates: Mutex::new(Vec::new()),
        })
    }

    /// A world with the default config and every chunk within `radius` of
    /// the origin loaded.
    pub fn with_chunks(radius: i32) -> Arc<Self> {
        let world = Self::new(LightEngineConfig::default());
        for x in -radius..=radius {
            for z in -radius..=radius {
                world.add_chunk(ChunkPos::new(x, z));
            }
        }
        world
    }

    pub fn config(&self) -> &LightEngineConfig {
        &self.config
    }

    pub fn add_chunk(&self, pos: ChunkPos) -> Arc<TestChunk> {
        let chunk = Arc::new(TestChunk::new(pos, &self.config));
        self.chunks.write().insert(pos, Arc::clone(&chunk));
        chunk
    }

    pub fn chunk(&self, pos: ChunkPos) -> Option<Arc<TestChunk>> {
        self.chunks.read().get(&pos).cloned()
    }

    pub fn chunk_positions(&self) -> Vec<ChunkPos> {
        let mut positions: Vec<_> = self.chunks.read().keys().copied().collect();
        positions.sort_unstable_by_key(|pos| (pos.x(), pos.z()));
        positions
    }

    pub fn block(&self, pos: BlockPos) -> LightState {
        self.chunk(pos.chunk())
            .map_or(LightState::OPAQUE, |chunk| chunk.light_state(pos))
    }

    /// Sets a block without telling any engine. Returns true if the section
    /// switched between empty and non-empty.
    pub fn set_block(&self, pos: BlockPos, state: LightState) -> bool {
        let chunk = self.chunk(pos.chunk()).unwrap();
        let section_y = pos.y() >> 4;
        let was_empty = chunk.is_section_empty(section_y);
        chunk.set_block(pos, state);
        was_empty != chunk.is_section_empty(section_y)
    }

    /// Fills the box `min..=max` with `state`.
    pub fn fill(&self, min: BlockPos, max: BlockPos, state: LightState) {
        for x in min.x()..=max.x() {
            for y in min.y()..=max.y() {
                for z in min.z()..=max.z() {
                    self.set_block(BlockPos::new(x, y, z), state);
                }
            }
        }
    }

    pub fn take_light_updates(&self) -> Vec<(LightLayer, SectionPos)> {
        std::mem::take(&mut *self.light_updates.lock())
    }
}

impl LightChunkGetter for TestWorld {
    fn chunk_for_lighting(&self, chunk_x: i32, chunk_z: i32) -> Option<Arc<dyn LightChunk>> {
        self.chunk(ChunkPos::new(chunk_x, chunk_z))
            .map(|chunk| chunk as Arc<dyn LightChunk>)
    }

    fn on_light_update(&self, layer: LightLayer, section: SectionPos) {
        self.light_updates.lock().push((layer, section));
    }
}

/// Creates an engine for `world` and lights every loaded chunk the way a
/// server does when chunks finish generating.
pub fn light_world(world: &Arc<TestWorld>) -> LevelLightEngine {
    let mut engine = LevelLightEngine::new(world.clone(), world.config()).unwrap();
    let config = world.config().clone();
    let positions = world.chunk_positions();
    for &pos in &positions {
        let chunk = world.chunk(pos).unwrap();
        for section_y in config.min_section_y..config.min_section_y + config.section_count as i32 {
            if !chunk.is_section_empty(section_y) {
                engine.update_section_status(SectionPos::of_chunk(pos, section_y), false);
            }
        }
    }
    for &pos in &positions {
        engine.propagate_light_sources(pos);
    }
    engine.run_light_updates();
    engine
}

/// Sets a block and tells `engine` about it like a level would.
pub fn place(engine: &mut LevelLightEngine, world: &TestWorld, pos: BlockPos, state: LightState) {
    let was_empty = world
        .chunk(pos.chunk())
        .unwrap()
        .is_section_empty(pos.y() >> 4);
    if world.set_block(pos, state) {
        engine.update_section_status(pos.section(), !was_empty);
    }
    engine.check_block(pos);
}

pub fn block_light(engine: &LevelLightEngine, pos: BlockPos) -> u8 {
    engine.get_light_value(LightLayer::Block, pos)
}

pub fn sky_light(engine: &LevelLightEngine, pos: BlockPos) -> u8 {
    engine.get_light_value(LightLayer::Sky, pos)
}

/// Reference block light: the least fixed point of
/// `light(p) = max(emission(p), max over neighbors n of light(n) - max(1, light_block(p)))`
/// over the box `min..=max`, with everything outside the box dark. Ignores
/// face shapes.
pub fn brute_force_block_light(
    world: &TestWorld,
    min: BlockPos,
    max: BlockPos,
) -> FxHashMap<BlockPos, u8> {
    brute_force(world, min, max, |_, state| state.emission)
}

/// Reference sky light over the box `min..=max`: every voxel at or above its
/// column's lowest source is 15, the rest is lit through neighbors.
pub fn brute_force_sky_light(
    world: &TestWorld,
    min: BlockPos,
    max: BlockPos,
) -> FxHashMap<BlockPos, u8> {
    brute_force(world, min, max, |pos, _| {
        let lowest = world
            .chunk(pos.chunk())
            .map_or(i32::MAX, |chunk| {
                chunk.lowest_sky_source_y((pos.x() & 15) as usize, (pos.z() & 15) as usize)
            });
        if pos.y() >= lowest { 15 } else { 0 }
    })
}

fn brute_force(
    world: &TestWorld,
    min: BlockPos,
    max: BlockPos,
    source: impl Fn(BlockPos, &LightState) -> u8,
) -> FxHashMap<BlockPos, u8> {
    let mut light: FxHashMap<BlockPos, u8> = FxHashMap::default();
    let mut states = FxHashMap::default();
    for x in min.x()..=max.x() {
        for y in min.y()..=max.y() {
            for z in min.z()..=max.z() {
                let pos = BlockPos::new(x, y, z);
                let state = world.block(pos);
                light.insert(pos, source(pos, &state));
                states.insert(pos, state);
            }
        }
    }

    let offsets = [(0, -1, 0), (0, 1, 0), (0, 0, -1), (0, 0, 1), (-1, 0, 0), (1, 0, 0)];
    let mut changed = true;
    while changed {
        changed = false;
        for (&pos, state) in &states {
            let brightest = offsets
                .iter()
                .filter_map(|&(dx, dy, dz)| light.get(&pos.offset(dx, dy, dz)).copied())
                .max()
                .unwrap_or(0);
            let candidate = brightest.saturating_sub(state.light_block.max(1));
            if candidate > light[&pos] {
                light.insert(pos, candidate);
                changed = true;
            }
        }
    }
    light
}
