//! Voxel light propagation.

mod base;
mod block_light_engine;
mod chunk_cache;
pub mod direction;
mod level_light_engine;
pub mod light_queue;
pub mod queue_entry;
mod sky_light_engine;
mod threaded_level_light_engine;

pub use base::{LightEngine, LightRules};
pub use block_light_engine::{BlockLightEngine, BlockLightRules};
pub use chunk_cache::ChunkCache;
pub use direction::Direction;
pub use level_light_engine::LevelLightEngine;
pub use light_queue::LightQueue;
pub use queue_entry::QueueEntry;
pub use sky_light_engine::{SkyLightEngine, SkyLightRules};
pub use threaded_level_light_engine::{TaskType, ThreadedLevelLightEngine};
