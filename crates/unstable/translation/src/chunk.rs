use indexmap::IndexSet;
use thiserror::Error;

use lodestone_mc_datatypes::{BlockPosInChunk, ChunkPosition, CHUNK_WIDTH};

use crate::datatypes::{BlockEntity, Entity};


/// The number of voxels in one horizontal layer of a chunk.
pub const LAYER_AREA: usize = (CHUNK_WIDTH * CHUNK_WIDTH) as usize;
/// The number of biome columns in a chunk using one biome per block column.
pub const BIOME_COLUMNS: usize = LAYER_AREA;
/// The number of biome cells in one vertical slice of a chunk using 4x4x4 biome cells.
pub const BIOME_CELLS_PER_LAYER: usize = 16;


/// A column of 16x16 voxels, `height` voxels tall, starting at height `min_y`, together with
/// everything else stored in it.
///
/// The voxels hold indices into a palette which is stored separately; see
/// [`Palette`](crate::palette::Palette).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub position:       ChunkPosition,
    pub blocks:         BlockIndices,
    pub biomes:         Biomes,
    pub block_entities: Vec<BlockEntity>,
    pub entities:       Vec<Entity>,
}

impl Chunk {
    /// Create a chunk without any block entities or entities, checking its shape with
    /// [`check_shape`](Self::check_shape).
    pub fn new(
        position: ChunkPosition,
        blocks:   BlockIndices,
        biomes:   Biomes,
    ) -> Result<Self, ChunkShapeError> {
        let chunk = Self {
            position,
            blocks,
            biomes,
            block_entities: Vec::new(),
            entities:       Vec::new(),
        };
        chunk.check_shape()?;
        Ok(chunk)
    }

    /// Check that every voxel of this chunk has a world position in `i32` coordinates,
    /// and that `biomes` has a shape valid for chunks.
    pub fn check_shape(&self) -> Result<(), ChunkShapeError> {
        if self.position.checked_block_origin(self.blocks.min_y).is_none() {
            return Err(ChunkShapeError::Position(self.position));
        }
        self.blocks.check_extent()?;
        self.biomes.check_shape()
    }

    /// The block entity located at `position`, if any.
    pub fn block_entity_at(&self, position: BlockPosInChunk) -> Option<&BlockEntity> {
        let world = position.checked_to_world(self.position)?;
        self.block_entities
            .iter()
            .find(|block_entity| block_entity.position == world)
    }
}

// ================================================================
//  Block indices
// ================================================================

/// A dense array of palette indices, one per voxel of a chunk.
///
/// The voxel at `(x, y, z)` is stored at `x + 16 * z + 256 * (y - min_y)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockIndices {
    min_y:   i32,
    height:  u32,
    indices: Vec<u32>,
}

impl BlockIndices {
    /// A chunk column whose voxels all hold index `0`.
    pub fn new(min_y: i32, height: u32) -> Self {
        Self {
            min_y,
            height,
            indices: vec![0; LAYER_AREA * height as usize],
        }
    }

    /// Use the indices in `indices`, in the layout described on [`BlockIndices`].
    pub fn from_indices(
        min_y:   i32,
        height:  u32,
        indices: Vec<u32>,
    ) -> Result<Self, ChunkShapeError> {
        let expected = LAYER_AREA * height as usize;
        if indices.len() != expected {
            return Err(ChunkShapeError::BlockCount {
                expected,
                actual: indices.len(),
            });
        }
        Ok(Self { min_y, height, indices })
    }

    #[inline]
    pub fn min_y(&self) -> i32 {
        self.min_y
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    fn check_extent(&self) -> Result<(), ChunkShapeError> {
        let top = i64::from(self.min_y) + i64::from(self.height);
        if top > i64::from(i32::MAX) + 1 {
            return Err(ChunkShapeError::Height {
                min_y:  self.min_y,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Whether the world height `y` is within this column.
    #[inline]
    pub fn contains_y(&self, y: i32) -> bool {
        let offset = i64::from(y) - i64::from(self.min_y);
        0 <= offset && offset < i64::from(self.height)
    }

    fn flat_index(&self, pos: BlockPosInChunk) -> Option<usize> {
        if !self.contains_y(pos.y) {
            return None;
        }
        let layer = (i64::from(pos.y) - i64::from(self.min_y)) as usize;
        Some(usize::from(pos.x) + usize::from(pos.z) * CHUNK_WIDTH as usize + layer * LAYER_AREA)
    }

    fn position_of(&self, flat_index: usize) -> BlockPosInChunk {
        let width = CHUNK_WIDTH as usize;
        BlockPosInChunk {
            x: (flat_index % width) as u8,
            y: self.min_y + (flat_index / LAYER_AREA) as i32,
            z: ((flat_index / width) % width) as u8,
        }
    }

    /// The palette index of the voxel at `pos`, or `None` if `pos` is above or below this column.
    #[inline]
    pub fn get(&self, pos: BlockPosInChunk) -> Option<u32> {
        self.flat_index(pos).map(|index| self.indices[index])
    }

    /// Set the palette index of the voxel at `pos`, returning the previous index, or `None`
    /// (without changing anything) if `pos` is above or below this column.
    pub fn set(&mut self, pos: BlockPosInChunk, index: u32) -> Option<u32> {
        let flat = self.flat_index(pos)?;
        Some(std::mem::replace(&mut self.indices[flat], index))
    }

    /// Every voxel position with its palette index, in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (BlockPosInChunk, u32)> + '_ {
        self.indices
            .iter()
            .enumerate()
            .map(|(flat, &index)| (self.position_of(flat), index))
    }

    /// The positions of every voxel holding `index`.
    pub fn positions_of(&self, index: u32) -> impl Iterator<Item = BlockPosInChunk> + '_ {
        self.iter()
            .filter(move |&(_, voxel)| voxel == index)
            .map(|(pos, _)| pos)
    }

    /// The greatest palette index used by any voxel, or `None` if the column has no voxels.
    #[inline]
    pub fn max_index(&self) -> Option<u32> {
        self.indices.iter().copied().max()
    }

    /// The first voxel whose index is not less than `palette_len`.
    pub fn first_out_of_range(&self, palette_len: usize) -> Option<(BlockPosInChunk, u32)> {
        self.iter()
            .find(|&(_, index)| index as usize >= palette_len)
    }

    /// Replace every index `i` with `mapping(i)`. Each voxel is read and written once, so
    /// a mapping such as `0 -> 1, 1 -> 2` never sends `0` to `2`.
    pub fn remap<F: FnMut(u32) -> u32>(&mut self, mut mapping: F) {
        for index in &mut self.indices {
            *index = mapping(*index);
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.indices
    }
}

// ================================================================
//  Biomes
// ================================================================

/// The biome indices of a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Biomes {
    /// The chunk does not store biomes.
    Empty,
    /// One biome per block column, indexed by `x + 16 * z`.
    Columns(Vec<u32>),
    /// One biome per 4x4x4 cell, indexed by `x + 4 * z + 16 * y` in cell coordinates.
    Cells(Vec<u32>),
}

impl Biomes {
    pub fn check_shape(&self) -> Result<(), ChunkShapeError> {
        match self {
            Self::Empty => Ok(()),
            Self::Columns(ids) if ids.len() == BIOME_COLUMNS => Ok(()),
            Self::Columns(ids) => Err(ChunkShapeError::BiomeColumns(ids.len())),
            Self::Cells(ids) if ids.len() % BIOME_CELLS_PER_LAYER == 0 => Ok(()),
            Self::Cells(ids) => Err(ChunkShapeError::BiomeCells(ids.len())),
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        match self {
            Self::Empty => &[],
            Self::Columns(ids) | Self::Cells(ids) => ids,
        }
    }

    /// Translate the biomes with `translate`, which is called exactly once per distinct biome,
    /// in the order in which the biomes first appear. The returned biomes have the same shape.
    pub fn map_distinct<E, F>(&self, mut translate: F) -> Result<Self, E>
    where
        F: FnMut(u32) -> Result<u32, E>,
    {
        let (ids, rebuild): (&Vec<u32>, fn(Vec<u32>) -> Self) = match self {
            Self::Empty        => return Ok(Self::Empty),
            Self::Columns(ids) => (ids, Self::Columns),
            Self::Cells(ids)   => (ids, Self::Cells),
        };

        let mut distinct = IndexSet::new();
        let inverse: Vec<usize> = ids
            .iter()
            .map(|&id| distinct.insert_full(id).0)
            .collect();

        let translated = distinct
            .into_iter()
            .map(&mut translate)
            .collect::<Result<Vec<u32>, E>>()?;

        Ok(rebuild(inverse.into_iter().map(|index| translated[index]).collect()))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkShapeError {
    #[error("expected {expected} block indices, but received {actual}")]
    BlockCount {
        expected: usize,
        actual:   usize,
    },
    #[error("expected {BIOME_COLUMNS} biome columns, but received {0}")]
    BiomeColumns(usize),
    #[error("expected a multiple of {BIOME_CELLS_PER_LAYER} biome cells, but received {0}")]
    BiomeCells(usize),
    #[error("the blocks of {0} have no representable world position")]
    Position(ChunkPosition),
    #[error("a column of {height} blocks starting at height {min_y} extends past i32::MAX")]
    Height {
        min_y:  i32,
        height: u32,
    },
}


#[cfg(test)]
mod tests {
    use super::*;

    fn pos(x: u8, y: i32, z: u8) -> BlockPosInChunk {
        BlockPosInChunk::new(x, y, z).unwrap()
    }

    #[test]
    fn index_layout() {
        let mut blocks = BlockIndices::new(-64, 2);
        assert_eq!(blocks.as_slice().len(), 512);

        assert_eq!(blocks.set(pos(1, -63, 2), 7), Some(0));
        assert_eq!(blocks.as_slice()[1 + 2 * 16 + 256], 7);
        assert_eq!(blocks.get(pos(1, -63, 2)), Some(7));

        assert_eq!(blocks.get(pos(0, -65, 0)), None);
        assert_eq!(blocks.get(pos(0, -62, 0)), None);
        assert_eq!(blocks.set(pos(0, -62, 0), 1), None);

        assert_eq!(blocks.positions_of(7).collect::<Vec<_>>(), [pos(1, -63, 2)]);
        assert_eq!(blocks.max_index(), Some(7));
        assert_eq!(blocks.first_out_of_range(7), Some((pos(1, -63, 2), 7)));
        assert_eq!(blocks.first_out_of_range(8), None);
    }

    #[test]
    fn wrong_shapes_are_rejected() {
        assert_eq!(
            BlockIndices::from_indices(0, 1, vec![0; 255]),
            Err(ChunkShapeError::BlockCount { expected: 256, actual: 255 }),
        );

        let blocks = BlockIndices::new(0, 1);
        let position = ChunkPosition::new(0, 0);
        assert!(Chunk::new(position, blocks.clone(), Biomes::Columns(vec![0; 256])).is_ok());
        assert_eq!(
            Chunk::new(position, blocks.clone(), Biomes::Columns(vec![0; 16])).map(|_| ()),
            Err(ChunkShapeError::BiomeColumns(16)),
        );
        assert_eq!(
            Chunk::new(position, blocks, Biomes::Cells(vec![0; 17])).map(|_| ()),
            Err(ChunkShapeError::BiomeCells(17)),
        );
    }

    #[test]
    fn unrepresentable_chunks_are_rejected() {
        let blocks = BlockIndices::new(0, 1);
        let far = ChunkPosition::new(i32::MAX / 8, 0);
        assert_eq!(
            Chunk::new(far, blocks.clone(), Biomes::Empty).map(|_| ()),
            Err(ChunkShapeError::Position(far)),
        );

        let edge = ChunkPosition::new(i32::MAX / 16, i32::MIN / 16);
        assert!(Chunk::new(edge, blocks, Biomes::Empty).is_ok());

        let tall = BlockIndices::new(i32::MAX - 1, 3);
        assert_eq!(
            Chunk::new(ChunkPosition::new(0, 0), tall, Biomes::Empty).map(|_| ()),
            Err(ChunkShapeError::Height { min_y: i32::MAX - 1, height: 3 }),
        );
        let topmost = BlockIndices::new(i32::MAX - 1, 2);
        assert!(Chunk::new(ChunkPosition::new(0, 0), topmost, Biomes::Empty).is_ok());
    }

    #[test]
    fn block_entities_of_far_chunks_are_not_found() {
        let far = Chunk {
            position:       ChunkPosition::new(i32::MAX / 8, 0),
            blocks:         BlockIndices::new(0, 1),
            biomes:         Biomes::Empty,
            block_entities: Vec::new(),
            entities:       Vec::new(),
        };
        assert!(far.check_shape().is_err());
        assert!(far.block_entity_at(pos(0, 0, 0)).is_none());
    }

    #[test]
    fn remapping_is_simultaneous() {
        let mut blocks = BlockIndices::from_indices(0, 1, [0, 1, 2].repeat(86)[..256].to_vec())
            .unwrap();
        blocks.remap(|index| [1, 2, 0][index as usize]);
        assert_eq!(&blocks.as_slice()[..3], [1, 2, 0]);
    }

    #[test]
    fn distinct_biomes_translated_once_each() {
        let biomes = Biomes::Cells([1, 1, 2, 1].repeat(4));
        let mut calls = Vec::new();

        let translated = biomes
            .map_distinct(|id| {
                calls.push(id);
                Ok::<_, ()>(id * 10)
            })
            .unwrap();

        assert_eq!(calls, [1, 2]);
        assert_eq!(translated, Biomes::Cells([10, 10, 20, 10].repeat(4)));
    }

    #[test]
    fn biome_shape_is_kept() {
        let columns = Biomes::Columns((0..256).collect());
        let translated = columns.map_distinct(|id| Ok::<_, ()>(id + 1)).unwrap();
        assert_eq!(translated, Biomes::Columns((1..257).collect()));

        let cells = Biomes::Cells(vec![4; 32]);
        assert_eq!(cells.map_distinct(|id| Ok::<_, ()>(id)), Ok(Biomes::Cells(vec![4; 32])));
    }

    #[test]
    fn biome_translation_failure_propagates() {
        let biomes = Biomes::Columns(vec![3; 256]);
        assert_eq!(biomes.map_distinct(|_| Err("no mapping")), Err("no mapping"));
        assert_eq!(Biomes::Empty.map_distinct(|_| Err("unused")), Ok(Biomes::Empty));
    }
}
