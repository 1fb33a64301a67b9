//! Propagation metadata packed into one word.
//!
//! ```text
//! bit  11        10           9..4              3..0
//!      emission  empty shape  direction flags   level
//! ```
//!
//! Direction bit `4 + d` is set when light should travel in direction `d`
//! (see [`Direction`]).

use super::direction::Direction;

/// A queued light change at some voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEntry(u64);

impl QueueEntry {
    const LEVEL_MASK: u64 = 0x0F;
    const DIRECTIONS_MASK: u64 = 0x3F0;
    const EMPTY_SHAPE_FLAG: u64 = 0x400;
    const EMISSION_FLAG: u64 = 0x800;

    /// Asks every neighbor to push its light back into the voxel.
    pub const PULL_LIGHT_IN: Self = Self::decrease_all_directions(1);

    /// Full sky light spreading down and sideways from a source voxel.
    pub const ADD_SKY_SOURCE: Self = Self::increase_sky_source_in_directions(true, true, true, true, true);

    /// A sky source voxel that lost its sky access.
    pub const REMOVE_SKY_SOURCE: Self = Self::decrease_all_directions(15);

    /// The topmost voxel of a run of former sky sources. The voxel above it is
    /// still a source and must not be darkened.
    pub const REMOVE_TOP_SKY_SOURCE: Self = Self::decrease_skip_one_direction(15, Direction::Up);

    #[inline]
    const fn with_level(bits: u64, level: u8) -> Self {
        debug_assert!(level <= 15, "Light level must be 0-15");
        Self((bits & !Self::LEVEL_MASK) | (level as u64 & Self::LEVEL_MASK))
    }

    #[inline]
    const fn shape_bit(from_empty_shape: bool) -> u64 {
        if from_empty_shape { Self::EMPTY_SHAPE_FLAG } else { 0 }
    }

    /// Light level carried by the entry.
    #[must_use]
    #[inline]
    pub const fn level(self) -> u8 {
        (self.0 & Self::LEVEL_MASK) as u8
    }

    /// Returns true if the change travels towards `direction`.
    #[must_use]
    #[inline]
    pub const fn should_propagate(self, direction: Direction) -> bool {
        self.0 & direction.mask() != 0
    }

    /// Returns true if the voxel the change starts at has no occlusion shape,
    /// which saves looking its state up again.
    #[must_use]
    #[inline]
    pub const fn is_from_empty_shape(self) -> bool {
        self.0 & Self::EMPTY_SHAPE_FLAG != 0
    }

    /// Returns true if the change is a light source switching on.
    #[must_use]
    #[inline]
    pub const fn is_from_emission(self) -> bool {
        self.0 & Self::EMISSION_FLAG != 0
    }

    /// Removal of `level` light in every direction.
    #[must_use]
    pub const fn decrease_all_directions(level: u8) -> Self {
        Self::with_level(Self::DIRECTIONS_MASK, level)
    }

    /// Removal of `level` light in every direction but `skip`.
    #[must_use]
    pub const fn decrease_skip_one_direction(level: u8, skip: Direction) -> Self {
        Self::with_level(Self::DIRECTIONS_MASK & !skip.mask(), level)
    }

    /// A source emitting `level` light.
    #[must_use]
    pub const fn increase_from_emission(level: u8, from_empty_shape: bool) -> Self {
        Self::with_level(
            Self::DIRECTIONS_MASK | Self::EMISSION_FLAG | Self::shape_bit(from_empty_shape),
            level,
        )
    }

    /// `level` light spreading in every direction but `skip`, usually the one
    /// it came from.
    #[must_use]
    pub const fn increase_skip_one_direction(level: u8, from_empty_shape: bool, skip: Direction) -> Self {
        Self::with_level(
            (Self::DIRECTIONS_MASK & !skip.mask()) | Self::shape_bit(from_empty_shape),
            level,
        )
    }

    /// `level` light spreading towards `direction` only.
    #[must_use]
    pub const fn increase_only_one_direction(level: u8, from_empty_shape: bool, direction: Direction) -> Self {
        Self::with_level(direction.mask() | Self::shape_bit(from_empty_shape), level)
    }

    /// Full sky light spreading in the selected directions. Sky light never
    /// needs to travel up.
    #[must_use]
    #[allow(clippy::fn_params_excessive_bools)]
    pub const fn increase_sky_source_in_directions(
        down: bool,
        north: bool,
        south: bool,
        west: bool,
        east: bool,
    ) -> Self {
        let mut bits = 0;
        if down {
            bits |= Direction::Down.mask();
        }
        if north {
            bits |= Direction::North.mask();
        }
        if south {
            bits |= Direction::South.mask();
        }
        if west {
            bits |= Direction::West.mask();
        }
        if east {
            bits |= Direction::East.mask();
        }
        Self::with_level(bits, 15)
    }

    /// Full sky light spreading towards `direction` only.
    #[must_use]
    pub const fn increase_sky_source_towards(direction: Direction) -> Self {
        Self::increase_only_one_direction(15, false, direction)
    }
}
