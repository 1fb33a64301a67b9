//! Incremental block and sky light propagation over a sectioned voxel world.
//!
//! The crate is split into the generic leveled relaxation engine
//! ([`dynamic_graph`]), the per-section light storage ([`storage`]) and the
//! voxel flood fill engines ([`light_engine`]). Chunks are consumed through the
//! traits in [`chunk`].

pub mod chunk;
pub mod config;
pub mod data_layer;
pub mod dynamic_graph;
mod error;
pub mod leveled_queue;
pub mod light_engine;
pub mod sky_light_sources;
pub mod storage;

pub use chunk::{FaceShape, LightChunk, LightChunkGetter, LightLayer, LightState};
pub use config::LightEngineConfig;
pub use data_layer::DataLayer;
pub use error::LightError;
pub use light_engine::{
    BlockLightEngine, LevelLightEngine, SkyLightEngine, ThreadedLevelLightEngine,
};
pub use sky_light_sources::ChunkSkyLightSources;

/// Highest light value a voxel can hold.
pub const MAX_LIGHT: u8 = 15;
