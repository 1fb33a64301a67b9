//! Nibble array holding the light of one 16x16x16 section.
//!
//! Light values are 4 bits, two per byte, indexed `y * 256 + z * 16 + x` with
//! the even index in the low nibble. A layer whose voxels all share one value
//! is kept as that single value until the first differing write.

use crate::LightError;

/// Bytes of a full light array (4096 voxels at 4 bits).
pub const LAYER_SIZE: usize = 2048;

/// Light values of one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLayer {
    /// Every voxel has this value.
    Homogeneous(u8),
    /// Packed nibbles.
    Heterogeneous(Box<[u8; LAYER_SIZE]>),
}

#[inline]
const fn index(x: usize, y: usize, z: usize) -> usize {
    (y << 8) | (z << 4) | x
}

#[inline]
const fn pack(level: u8) -> u8 {
    (level & 0x0F) | ((level & 0x0F) << 4)
}

impl DataLayer {
    /// A layer with every voxel at `level`.
    #[must_use]
    pub const fn filled(level: u8) -> Self {
        debug_assert!(level <= 15, "Light level must be 0-15");
        Self::Homogeneous(level)
    }

    /// A dark layer.
    #[must_use]
    pub const fn empty() -> Self {
        Self::Homogeneous(0)
    }

    /// Light at local coordinates (each 0-15).
    #[must_use]
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> u8 {
        debug_assert!(x < 16 && y < 16 && z < 16, "Coordinates must be 0-15");
        match self {
            Self::Homogeneous(level) => *level,
            Self::Heterogeneous(data) => {
                let index = index(x, y, z);
                (data[index >> 1] >> ((index & 1) << 2)) & 0x0F
            }
        }
    }

    /// Sets the light at local coordinates (each 0-15).
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, level: u8) {
        debug_assert!(x < 16 && y < 16 && z < 16, "Coordinates must be 0-15");
        debug_assert!(level <= 15, "Light level must be 0-15");
        if let Self::Homogeneous(current) = *self {
            if current == level {
                return;
            }
            *self = Self::Heterogeneous(Box::new([pack(current); LAYER_SIZE]));
        }
        let Self::Heterogeneous(data) = self else {
            return;
        };
        let index = index(x, y, z);
        let shift = (index & 1) << 2;
        let byte = &mut data[index >> 1];
        *byte = (*byte & !(0x0F << shift)) | ((level & 0x0F) << shift);
    }

    /// Returns true if every voxel is known to hold `level` without scanning.
    #[must_use]
    pub fn is_definitely_filled_with(&self, level: u8) -> bool {
        matches!(self, Self::Homogeneous(current) if *current == level)
    }

    /// Returns true if every voxel is dark.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Homogeneous(level) => *level == 0,
            Self::Heterogeneous(data) => data.iter().all(|&byte| byte == 0),
        }
    }

    /// A layer with the bottom slice (y = 0) of this one repeated through all
    /// 16 slices.
    ///
    /// Sky light sections below the column's top section start from this:
    /// whatever reaches the bottom of the section above falls straight down.
    #[must_use]
    pub fn repeat_first_layer(&self) -> Self {
        match self {
            Self::Homogeneous(level) => Self::Homogeneous(*level),
            Self::Heterogeneous(data) => {
                let mut repeated = Box::new([0u8; LAYER_SIZE]);
                let slice = &data[..128];
                for chunk in repeated.chunks_exact_mut(128) {
                    chunk.copy_from_slice(slice);
                }
                Self::Heterogeneous(repeated)
            }
        }
    }

    /// The 2048 byte payload sent to clients and written to disk.
    #[must_use]
    pub fn to_packet_data(&self) -> Vec<u8> {
        match self {
            Self::Homogeneous(level) => vec![pack(*level); LAYER_SIZE],
            Self::Heterogeneous(data) => data.to_vec(),
        }
    }

    /// Parses a payload produced by [`DataLayer::to_packet_data`].
    pub fn from_packet_data(data: &[u8]) -> Result<Self, LightError> {
        let data: &[u8; LAYER_SIZE] = data
            .try_into()
            .map_err(|_| LightError::InvalidDataLayer { len: data.len() })?;
        let first = data[0];
        if first >> 4 == first & 0x0F && data.iter().all(|&byte| byte == first) {
            return Ok(Self::Homogeneous(first & 0x0F));
        }
        Ok(Self::Heterogeneous(Box::new(*data)))
    }
}

impl Default for DataLayer {
    fn default() -> Self {
        Self::empty()
    }
}
