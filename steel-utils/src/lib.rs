//! Shared coordinate types for the steel lighting workspace.

pub mod math;
mod types;

pub use types::{BlockPos, ChunkPos, SectionPos};
