#![allow(missing_docs, clippy::unwrap_used)]
//! Benchmarks for block and sky light propagation.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::{hint::black_box, sync::Arc};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use steel_light::{
    ChunkSkyLightSources, LevelLightEngine, LightChunk, LightChunkGetter, LightEngineConfig, LightLayer,
    LightState,
};
use steel_utils::{BlockPos, ChunkPos, SectionPos};

/// Blocks are only stored below this y. Everything above is air.
const TERRAIN_HEIGHT: i32 = 64;
const COLUMN: usize = TERRAIN_HEIGHT as usize * 256;

const STONE: LightState = LightState::OPAQUE;
const LANTERN: LightState = LightState::new(15, 0);

/// A chunk of stone hills with a tunnel and a few lanterns.
struct BenchChunk {
    pos: ChunkPos,
    blocks: RwLock<Vec<LightState>>,
    sky_sources: RwLock<ChunkSkyLightSources>,
}

#[inline]
fn block_index(x: i32, y: i32, z: i32) -> usize {
    ((y as usize) << 8) | (((z & 15) as usize) << 4) | (x & 15) as usize
}

impl BenchChunk {
    fn new(pos: ChunkPos, config: &LightEngineConfig) -> Self {
        let mut blocks = vec![LightState::AIR; COLUMN];
        for z in 0..16 {
            for x in 0..16 {
                let wx = pos.min_block_x() + x;
                let wz = pos.min_block_z() + z;
                let surface = 40 + ((wx * 7 + wz * 13).rem_euclid(17)) / 2;
                for y in 0..surface {
                    // Carve a tunnel through every chunk.
                    let tunnel = (20..24).contains(&y) && (6..10).contains(&z);
                    if !tunnel {
                        blocks[block_index(x, y, z)] = STONE;
                    }
                }
                if x % 8 == 4 && z % 8 == 4 {
                    blocks[block_index(x, 21, z)] = LANTERN;
                    blocks[block_index(x, surface, z)] = LANTERN;
                }
            }
        }

        let chunk = Self {
            pos,
            blocks: RwLock::new(blocks),
            sky_sources: RwLock::new(ChunkSkyLightSources::new(config.min_y(), config.height())),
        };
        let mut sources = ChunkSkyLightSources::new(config.min_y(), config.height());
        sources.fill_from(&chunk, config.min_section_y + config.section_count as i32);
        *chunk.sky_sources.write() = sources;
        chunk
    }

    fn set_block(&self, pos: BlockPos, state: LightState) {
        self.blocks.write()[block_index(pos.x(), pos.y(), pos.z())] = state;
        self.sky_sources.write().update(self, pos.x(), pos.y(), pos.z());
    }
}

impl LightChunk for BenchChunk {
    fn pos(&self) -> ChunkPos {
        self.pos
    }

    fn light_state(&self, pos: BlockPos) -> LightState {
        if (0..TERRAIN_HEIGHT).contains(&pos.y()) {
            self.blocks.read()[block_index(pos.x(), pos.y(), pos.z())]
        } else {
            LightState::AIR
        }
    }

    fn find_block_light_sources(&self, visit: &mut dyn FnMut(BlockPos, LightState)) {
        let blocks = self.blocks.read();
        for (index, state) in blocks.iter().enumerate() {
            if state.emission > 0 {
                let pos = BlockPos::new(
                    self.pos.min_block_x() + (index & 15) as i32,
                    (index >> 8) as i32,
                    self.pos.min_block_z() + ((index >> 4) & 15) as i32,
                );
                visit(pos, *state);
            }
        }
    }

    fn is_section_empty(&self, section_y: i32) -> bool {
        !(0..TERRAIN_HEIGHT >> 4).contains(&section_y)
    }

    fn lowest_sky_source_y(&self, local_x: usize, local_z: usize) -> i32 {
        self.sky_sources.read().get_lowest_source_y(local_x, local_z)
    }
}

struct BenchWorld {
    config: LightEngineConfig,
    chunks: FxHashMap<ChunkPos, Arc<BenchChunk>>,
}

impl BenchWorld {
    fn new(radius: i32) -> Arc<Self> {
        let config = LightEngineConfig::default();
        let mut chunks = FxHashMap::default();
        for x in -radius..=radius {
            for z in -radius..=radius {
                let pos = ChunkPos::new(x, z);
                chunks.insert(pos, Arc::new(BenchChunk::new(pos, &config)));
            }
        }
        Arc::new(Self { config, chunks })
    }

    fn set_block(&self, pos: BlockPos, state: LightState) {
        if let Some(chunk) = self.chunks.get(&pos.chunk()) {
            chunk.set_block(pos, state);
        }
    }
}

impl LightChunkGetter for BenchWorld {
    fn chunk_for_lighting(&self, chunk_x: i32, chunk_z: i32) -> Option<Arc<dyn LightChunk>> {
        self.chunks
            .get(&ChunkPos::new(chunk_x, chunk_z))
            .map(|chunk| Arc::clone(chunk) as Arc<dyn LightChunk>)
    }

    fn on_light_update(&self, _layer: LightLayer, _section: SectionPos) {}
}

fn light_world(world: &Arc<BenchWorld>) -> LevelLightEngine {
    let mut engine = LevelLightEngine::new(world.clone(), &world.config).unwrap();
    for &pos in world.chunks.keys() {
        for section_y in 0..TERRAIN_HEIGHT >> 4 {
            engine.update_section_status(SectionPos::of_chunk(pos, section_y), false);
        }
    }
    for &pos in world.chunks.keys() {
        engine.propagate_light_sources(pos);
    }
    engine.run_light_updates();
    engine
}

fn bench_initial_light(c: &mut Criterion) {
    let mut group = c.benchmark_group("initial_light");
    group.sample_size(10);

    for radius in [0, 1, 2] {
        let world = BenchWorld::new(radius);
        let chunks = (radius * 2 + 1) * (radius * 2 + 1);
        group.bench_with_input(BenchmarkId::new("chunks", chunks), &world, |b, world| {
            b.iter(|| black_box(light_world(world)));
        });
    }

    group.finish();
}

fn bench_block_update(c: &mut Criterion) {
    let world = BenchWorld::new(1);
    let mut engine = light_world(&world);

    let mut group = c.benchmark_group("block_update");

    // A lantern placed and removed inside the tunnel.
    let tunnel = BlockPos::new(8, 21, 7);
    group.bench_function("toggle_lantern", |b| {
        b.iter(|| {
            for state in [LANTERN, LightState::AIR] {
                world.set_block(tunnel, state);
                engine.check_block(tunnel);
                black_box(engine.run_light_updates());
            }
        });
    });

    // A hole punched through the tunnel roof and filled again.
    let roof = BlockPos::new(12, 24, 8);
    group.bench_function("open_tunnel_roof", |b| {
        b.iter(|| {
            for state in [LightState::AIR, STONE] {
                world.set_block(roof, state);
                engine.check_block(roof);
                black_box(engine.run_light_updates());
            }
        });
    });

    // A block placed high above the terrain shades its whole column.
    let high = BlockPos::new(3, 60, 3);
    group.bench_function("shade_column", |b| {
        b.iter(|| {
            for state in [STONE, LightState::AIR] {
                world.set_block(high, state);
                engine.check_block(high);
                black_box(engine.run_light_updates());
            }
        });
    });

    group.finish();
}

fn bench_read_light(c: &mut Criterion) {
    let world = BenchWorld::new(1);
    let engine = light_world(&world);
    let reader = engine.get_layer_listener(LightLayer::Block).unwrap();

    c.bench_function("read_block_light_column", |b| {
        b.iter(|| {
            let mut total = 0u32;
            for y in 0..TERRAIN_HEIGHT {
                total += u32::from(reader.get_light_value(BlockPos::new(4, y, 4)));
            }
            black_box(total)
        });
    });

    c.bench_function("raw_brightness", |b| {
        b.iter(|| black_box(engine.get_raw_brightness(black_box(BlockPos::new(4, 50, 4)), 4)));
    });
}

criterion_group!(benches, bench_initial_light, bench_block_update, bench_read_light);
criterion_main!(benches);
