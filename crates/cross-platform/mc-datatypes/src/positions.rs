use std::fmt;
use std::{fmt::{Display, Formatter}, hash::{Hash, Hasher}};

#[cfg(feature = "derive_serde")]
use serde::{Deserialize, Serialize};


/// The horizontal width of a chunk, along both the X and Z axes.
pub const CHUNK_WIDTH: i32 = 16;


/// The location of a chunk in a dimension of a world.
///
/// Note that this is not the block position;
/// multiply this position by 16 to find the positions of its blocks. For example
/// `ChunkPosition { x: 1, z: 2 }` refers to the chunk from `(16, 32)` to `(31, 47)`.
#[cfg_attr(feature = "derive_serde",    derive(Serialize, Deserialize))]
#[cfg_attr(feature = "derive_standard", derive(PartialEq, Eq, PartialOrd, Ord, Hash))]
#[derive(Debug, Clone, Copy)]
pub struct ChunkPosition {
    pub x: i32,
    pub z: i32,
}

impl ChunkPosition {
    #[inline]
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The world position of the block at height `y` in this chunk's lowest X and Z corner.
    ///
    /// Only chunks whose `x` and `z` are in `i32::MIN / 16..=i32::MAX / 16` have such a block;
    /// see [`checked_block_origin`](Self::checked_block_origin).
    #[inline]
    pub fn block_origin(self, y: i32) -> BlockPosition {
        BlockPosition {
            x: self.x * CHUNK_WIDTH,
            y,
            z: self.z * CHUNK_WIDTH,
        }
    }

    /// Returns `None` if the blocks of this chunk have no `i32` world coordinates.
    #[inline]
    pub fn checked_block_origin(self, y: i32) -> Option<BlockPosition> {
        Some(BlockPosition {
            x: self.x.checked_mul(CHUNK_WIDTH)?,
            y,
            z: self.z.checked_mul(CHUNK_WIDTH)?,
        })
    }
}

impl Display for ChunkPosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "chunk ({}, {})", self.x, self.z)
    }
}

/// The world position of a block.
#[cfg_attr(feature = "derive_serde",    derive(Serialize, Deserialize))]
#[cfg_attr(feature = "derive_standard", derive(PartialEq, Eq, PartialOrd, Ord, Hash))]
#[derive(Debug, Clone, Copy)]
pub struct BlockPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPosition {
    #[inline]
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The chunk containing this block. Negative coordinates round towards negative infinity,
    /// so `x = -1` is in chunk `-1`, not chunk `0`.
    #[inline]
    pub fn chunk_position(self) -> ChunkPosition {
        ChunkPosition {
            x: self.x.div_euclid(CHUNK_WIDTH),
            z: self.z.div_euclid(CHUNK_WIDTH),
        }
    }

    /// This block's position relative to the chunk containing it.
    #[inline]
    pub fn in_chunk(self) -> BlockPosInChunk {
        BlockPosInChunk {
            // `rem_euclid(16)` is always in `0..16`, so the casts are lossless
            x: self.x.rem_euclid(CHUNK_WIDTH) as u8,
            y: self.y,
            z: self.z.rem_euclid(CHUNK_WIDTH) as u8,
        }
    }

    #[inline]
    pub fn offset(self, offset: BlockOffset) -> Self {
        Self {
            x: self.x + offset.dx,
            y: self.y + offset.dy,
            z: self.z + offset.dz,
        }
    }

    /// Returns `None` if the displaced position does not fit in `i32` coordinates.
    #[inline]
    pub fn checked_offset(self, offset: BlockOffset) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(offset.dx)?,
            y: self.y.checked_add(offset.dy)?,
            z: self.z.checked_add(offset.dz)?,
        })
    }
}

impl Display for BlockPosition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// A displacement between two block positions.
#[cfg_attr(feature = "derive_serde",    derive(Serialize, Deserialize))]
#[cfg_attr(feature = "derive_standard", derive(PartialEq, Eq, PartialOrd, Ord, Hash))]
#[derive(Debug, Clone, Copy)]
pub struct BlockOffset {
    pub dx: i32,
    pub dy: i32,
    pub dz: i32,
}

impl BlockOffset {
    pub const ABOVE: Self = Self::new(0, 1, 0);
    pub const BELOW: Self = Self::new(0, -1, 0);
    pub const NORTH: Self = Self::new(0, 0, -1);
    pub const SOUTH: Self = Self::new(0, 0, 1);
    pub const WEST: Self  = Self::new(-1, 0, 0);
    pub const EAST: Self  = Self::new(1, 0, 0);

    #[inline]
    pub const fn new(dx: i32, dy: i32, dz: i32) -> Self {
        Self { dx, dy, dz }
    }
}

impl From<[i32; 3]> for BlockOffset {
    #[inline]
    fn from(value: [i32; 3]) -> Self {
        Self::new(value[0], value[1], value[2])
    }
}

/// A block position within a chunk. `x` and `z` are in `0..16`; `y` is the block's world height.
#[cfg_attr(feature = "derive_serde",    derive(Serialize, Deserialize))]
#[cfg_attr(feature = "derive_standard", derive(PartialEq, Eq, PartialOrd, Ord, Hash))]
#[derive(Debug, Clone, Copy)]
pub struct BlockPosInChunk {
    pub x: u8,
    pub y: i32,
    pub z: u8,
}

impl BlockPosInChunk {
    /// Returns `None` if `x` or `z` is not less than 16.
    #[inline]
    pub fn new(x: u8, y: i32, z: u8) -> Option<Self> {
        let width = CHUNK_WIDTH as u8;
        if x < width && z < width {
            Some(Self { x, y, z })
        } else {
            None
        }
    }

    /// The world position of this block, if it is in the chunk at `chunk`.
    #[inline]
    pub fn to_world(self, chunk: ChunkPosition) -> BlockPosition {
        let origin = chunk.block_origin(self.y);
        BlockPosition {
            x: origin.x + i32::from(self.x),
            y: self.y,
            z: origin.z + i32::from(self.z),
        }
    }

    /// Returns `None` if the blocks of `chunk` have no `i32` world coordinates.
    #[inline]
    pub fn checked_to_world(self, chunk: ChunkPosition) -> Option<BlockPosition> {
        let origin = chunk.checked_block_origin(self.y)?;
        Some(BlockPosition {
            x: origin.x + i32::from(self.x),
            y: self.y,
            z: origin.z + i32::from(self.z),
        })
    }
}

/// A position of something, such as an entity, which is not aligned to the block grid.
///
/// Comparison and hashing are performed on the bit patterns of the coordinates,
/// so that positions can be used inside hashed collections; in particular, `NaN` equals itself,
/// and `0.0` does not equal `-0.0`.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy)]
pub struct FloatingWorldPos {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl FloatingWorldPos {
    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    fn bits(self) -> [u64; 3] {
        [self.x.to_bits(), self.y.to_bits(), self.z.to_bits()]
    }
}

impl PartialEq for FloatingWorldPos {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for FloatingWorldPos {}

impl Hash for FloatingWorldPos {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_of_negative_blocks() {
        let block = BlockPosition::new(-1, 70, -17);
        let chunk = block.chunk_position();
        assert_eq!((chunk.x, chunk.z), (-1, -2));

        let local = block.in_chunk();
        assert_eq!((local.x, local.y, local.z), (15, 70, 15));

        let back = local.to_world(chunk);
        assert_eq!((back.x, back.y, back.z), (-1, 70, -17));
    }

    #[test]
    fn edge_chunks_have_block_origins() {
        let edge = ChunkPosition::new(i32::MAX / 16, i32::MIN / 16);
        let origin = edge.checked_block_origin(0).map(|origin| (origin.x, origin.z));
        assert_eq!(origin, Some((i32::MAX - 15, i32::MIN)));

        assert!(ChunkPosition::new(i32::MAX / 8, 0).checked_block_origin(0).is_none());
        assert!(ChunkPosition::new(0, i32::MIN / 16 - 1).checked_block_origin(0).is_none());

        let corner = BlockPosInChunk { x: 15, y: 0, z: 0 };
        let world = corner.checked_to_world(edge).map(|world| world.x);
        assert_eq!(world, Some(i32::MAX));
        assert!(corner.checked_to_world(ChunkPosition::new(i32::MAX / 8, 0)).is_none());
    }

    #[test]
    fn offsets_past_the_world_edge() {
        let last = BlockPosition::new(i32::MAX, 0, 0);
        assert!(last.checked_offset(BlockOffset::EAST).is_none());

        let west = last.checked_offset(BlockOffset::WEST).map(|west| west.x);
        assert_eq!(west, Some(i32::MAX - 1));
        assert!(BlockPosition::new(0, i32::MIN, 0).checked_offset(BlockOffset::BELOW).is_none());
    }

    #[test]
    fn in_chunk_bounds() {
        assert!(BlockPosInChunk::new(15, -64, 0).is_some());
        assert!(BlockPosInChunk::new(16, 0, 0).is_none());
        assert!(BlockPosInChunk::new(0, 0, 16).is_none());
    }

    #[test]
    fn floating_positions_compare_bitwise() {
        let nan = FloatingWorldPos::new(f64::NAN, 0.0, 0.0);
        assert_eq!(nan, nan);
        assert_ne!(FloatingWorldPos::new(0.0, 0.0, 0.0), FloatingWorldPos::new(-0.0, 0.0, 0.0));
    }
}
