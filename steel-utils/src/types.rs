// Wrapper types making it harder to accidentaly use the wrong underlying type.

use std::fmt::{self, Display};

use crate::math::{vector2::Vector2, vector3::Vector3};

/// A chunk position. `0.y` is the world z coordinate of the column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkPos(pub Vector2<i32>);

/// A block position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockPos(pub Vector3<i32>);

/// A 16x16x16 section position (block coordinates shifted right by 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionPos(pub Vector3<i32>);

impl BlockPos {
    const PACKED_X_LENGTH: u32 = 26;
    const PACKED_Z_LENGTH: u32 = 26;
    const PACKED_Y_LENGTH: u32 = 64 - Self::PACKED_X_LENGTH - Self::PACKED_Z_LENGTH;
    const X_MASK: i64 = (1 << Self::PACKED_X_LENGTH) - 1;
    const Y_MASK: i64 = (1 << Self::PACKED_Y_LENGTH) - 1;
    const Z_MASK: i64 = (1 << Self::PACKED_Z_LENGTH) - 1;
    const Z_OFFSET: u32 = Self::PACKED_Y_LENGTH;
    const X_OFFSET: u32 = Self::PACKED_Y_LENGTH + Self::PACKED_Z_LENGTH;

    /// Creates a new block position.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self(Vector3::new(x, y, z))
    }

    /// The x coordinate.
    #[must_use]
    #[inline]
    pub const fn x(self) -> i32 {
        self.0.x
    }

    /// The y coordinate.
    #[must_use]
    #[inline]
    pub const fn y(self) -> i32 {
        self.0.y
    }

    /// The z coordinate.
    #[must_use]
    #[inline]
    pub const fn z(self) -> i32 {
        self.0.z
    }

    /// Returns this position moved by the given amounts.
    #[must_use]
    #[inline]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.0.x + dx, self.0.y + dy, self.0.z + dz)
    }

    /// Packs the position into a single `i64` (26 bits x, 26 bits z, 12 bits y).
    #[must_use]
    #[inline]
    pub const fn as_long(self) -> i64 {
        ((self.0.x as i64 & Self::X_MASK) << Self::X_OFFSET)
            | (self.0.y as i64 & Self::Y_MASK)
            | ((self.0.z as i64 & Self::Z_MASK) << Self::Z_OFFSET)
    }

    /// Unpacks a position produced by [`BlockPos::as_long`].
    #[must_use]
    #[inline]
    pub const fn from_long(packed: i64) -> Self {
        let x = packed >> Self::X_OFFSET;
        let y = (packed << (64 - Self::PACKED_Y_LENGTH)) >> (64 - Self::PACKED_Y_LENGTH);
        let z = (packed << (64 - Self::X_OFFSET)) >> (64 - Self::PACKED_Z_LENGTH);
        Self::new(x as i32, y as i32, z as i32)
    }

    /// The section containing this block.
    #[must_use]
    #[inline]
    pub const fn section(self) -> SectionPos {
        SectionPos::new(self.0.x >> 4, self.0.y >> 4, self.0.z >> 4)
    }

    /// The chunk column containing this block.
    #[must_use]
    #[inline]
    pub const fn chunk(self) -> ChunkPos {
        ChunkPos::new(self.0.x >> 4, self.0.z >> 4)
    }
}

impl Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.0.x, self.0.y, self.0.z)
    }
}

impl SectionPos {
    const X_MASK: i64 = (1 << 22) - 1;
    const Y_MASK: i64 = (1 << 20) - 1;
    const Z_MASK: i64 = (1 << 22) - 1;

    /// Creates a new section position from section coordinates.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self(Vector3::new(x, y, z))
    }

    /// Creates the section position of a chunk column at the given section y.
    #[must_use]
    pub const fn of_chunk(chunk: ChunkPos, section_y: i32) -> Self {
        Self::new(chunk.0.x, section_y, chunk.0.y)
    }

    /// The section x coordinate.
    #[must_use]
    #[inline]
    pub const fn x(self) -> i32 {
        self.0.x
    }

    /// The section y coordinate.
    #[must_use]
    #[inline]
    pub const fn y(self) -> i32 {
        self.0.y
    }

    /// The section z coordinate.
    #[must_use]
    #[inline]
    pub const fn z(self) -> i32 {
        self.0.z
    }

    /// Returns this section moved by the given amount of sections.
    #[must_use]
    #[inline]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.0.x + dx, self.0.y + dy, self.0.z + dz)
    }

    /// The chunk column this section belongs to.
    #[must_use]
    #[inline]
    pub const fn chunk(self) -> ChunkPos {
        ChunkPos::new(self.0.x, self.0.z)
    }

    /// The lowest block y inside this section.
    #[must_use]
    #[inline]
    pub const fn min_block_y(self) -> i32 {
        self.0.y << 4
    }

    /// The block at the minimum corner of this section.
    #[must_use]
    pub const fn origin(self) -> BlockPos {
        BlockPos::new(self.0.x << 4, self.0.y << 4, self.0.z << 4)
    }

    /// Packs the section into a single `i64` (22 bits x, 22 bits z, 20 bits y).
    #[must_use]
    #[inline]
    pub const fn as_long(self) -> i64 {
        ((self.0.x as i64 & Self::X_MASK) << 42)
            | (self.0.y as i64 & Self::Y_MASK)
            | ((self.0.z as i64 & Self::Z_MASK) << 20)
    }

    /// Unpacks a section produced by [`SectionPos::as_long`].
    #[must_use]
    #[inline]
    pub const fn from_long(packed: i64) -> Self {
        let x = packed >> 42;
        let y = (packed << 44) >> 44;
        let z = (packed << 22) >> 42;
        Self::new(x as i32, y as i32, z as i32)
    }

    /// Calls `f` once for every section that contains a block within one block
    /// of `pos` (including the section of `pos` itself).
    pub fn around_and_at_block_pos(pos: BlockPos, mut f: impl FnMut(SectionPos)) {
        for x in (pos.0.x - 1) >> 4..=(pos.0.x + 1) >> 4 {
            for z in (pos.0.z - 1) >> 4..=(pos.0.z + 1) >> 4 {
                for y in (pos.0.y - 1) >> 4..=(pos.0.y + 1) >> 4 {
                    f(SectionPos::new(x, y, z));
                }
            }
        }
    }
}

impl Display for SectionPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.0.x, self.0.y, self.0.z)
    }
}

impl ChunkPos {
    /// Creates a new chunk position.
    #[must_use]
    pub const fn new(x: i32, z: i32) -> Self {
        Self(Vector2::new(x, z))
    }

    /// The chunk x coordinate.
    #[must_use]
    #[inline]
    pub const fn x(self) -> i32 {
        self.0.x
    }

    /// The chunk z coordinate.
    #[must_use]
    #[inline]
    pub const fn z(self) -> i32 {
        self.0.y
    }

    /// The lowest block x inside this chunk.
    #[must_use]
    #[inline]
    pub const fn min_block_x(self) -> i32 {
        self.0.x << 4
    }

    /// The lowest block z inside this chunk.
    #[must_use]
    #[inline]
    pub const fn min_block_z(self) -> i32 {
        self.0.y << 4
    }
}

impl Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.0.x, self.0.y)
    }
}
