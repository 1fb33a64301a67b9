//! What the light engines need to know about the world.
//!
//! Block states and chunk storage live outside this crate. The engines only
//! see per-voxel [`LightState`]s through [`LightChunk`] and reach chunks
//! through a [`LightChunkGetter`].

use std::sync::Arc;

use steel_utils::{BlockPos, ChunkPos, SectionPos};

use crate::light_engine::Direction;

/// The two kinds of light a dimension can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightLayer {
    /// Light emitted by blocks.
    Block,
    /// Light coming down from the sky.
    Sky,
}

/// Coverage of one block face as a 4x4 grid of cells, one bit per cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FaceShape(pub u16);

impl FaceShape {
    /// A face with nothing on it.
    pub const EMPTY: Self = Self(0);
    /// A fully covered face.
    pub const FULL: Self = Self(u16::MAX);

    /// Returns true if the two faces together cover the whole face.
    #[must_use]
    #[inline]
    pub const fn occludes_with(self, other: Self) -> bool {
        self.0 | other.0 == u16::MAX
    }
}

/// Light relevant properties of a block state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightState {
    /// Light emitted by the block (0-15).
    pub emission: u8,
    /// How much light the block absorbs (0-15). Light passing through loses
    /// at least 1 per step regardless.
    pub light_block: u8,
    /// Occlusion shape of each face indexed by [`Direction`], or `None` for a
    /// block that uses no occlusion shapes at all.
    pub faces: Option<[FaceShape; 6]>,
}

impl LightState {
    /// Air: transparent, dark and without shapes.
    pub const AIR: Self = Self {
        emission: 0,
        light_block: 0,
        faces: None,
    };

    /// A full opaque cube. Its light block already stops all light, so it
    /// needs no occlusion shapes.
    pub const OPAQUE: Self = Self {
        emission: 0,
        light_block: 15,
        faces: None,
    };

    /// A shapeless block with the given emission and light block.
    #[must_use]
    pub const fn new(emission: u8, light_block: u8) -> Self {
        Self {
            emission,
            light_block,
            faces: None,
        }
    }

    /// Returns this state with the given face shapes.
    #[must_use]
    pub const fn with_faces(mut self, faces: [FaceShape; 6]) -> Self {
        self.faces = Some(faces);
        self
    }

    /// Returns true if the state has no occlusion shapes.
    #[must_use]
    #[inline]
    pub const fn is_empty_shape(&self) -> bool {
        self.faces.is_none()
    }

    /// Occlusion shape of the face pointing in `direction`.
    #[must_use]
    #[inline]
    pub fn occlusion_shape(&self, direction: Direction) -> FaceShape {
        self.faces
            .map_or(FaceShape::EMPTY, |faces| faces[direction as usize])
    }

    /// Returns true if light leaving `self` towards `direction` is blocked by
    /// the shapes of both blocks before it reaches `to`.
    #[must_use]
    pub fn shape_occludes(&self, to: &Self, direction: Direction) -> bool {
        if self.is_empty_shape() && to.is_empty_shape() {
            return false;
        }
        self.occlusion_shape(direction)
            .occludes_with(to.occlusion_shape(direction.opposite()))
    }
}

impl Default for LightState {
    fn default() -> Self {
        Self::AIR
    }
}

/// A chunk column as seen by the light engines.
pub trait LightChunk: Send + Sync {
    /// Position of the column.
    fn pos(&self) -> ChunkPos;

    /// Light properties of the block at `pos` (world coordinates). Positions
    /// outside the column's height are air.
    fn light_state(&self, pos: BlockPos) -> LightState;

    /// Calls `visit` for every block in the column that emits light.
    fn find_block_light_sources(&self, visit: &mut dyn FnMut(BlockPos, LightState));

    /// Returns true if the block section at `section_y` only contains air.
    fn is_section_empty(&self, section_y: i32) -> bool;

    /// Lowest y receiving direct sky light in the given local column, as kept
    /// by the chunk's [`ChunkSkyLightSources`](crate::ChunkSkyLightSources).
    /// `i32::MIN` when sky light reaches below the world.
    fn lowest_sky_source_y(&self, local_x: usize, local_z: usize) -> i32;
}

/// Gives the light engines access to loaded chunks.
pub trait LightChunkGetter: Send + Sync {
    /// The chunk at the given chunk coordinates, if it is loaded far enough
    /// to be lit.
    fn chunk_for_lighting(&self, chunk_x: i32, chunk_z: i32) -> Option<Arc<dyn LightChunk>>;

    /// Called after a published light change touched `section`.
    fn on_light_update(&self, layer: LightLayer, section: SectionPos);
}
