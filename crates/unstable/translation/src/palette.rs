use indexmap::IndexSet;

use crate::datatypes::WorldValue;


/// An insertion-ordered set of the distinct values referenced by a chunk's voxel indices.
///
/// Each value is stored once, and its index never changes. Palettes have no removal;
/// a translation pass builds a fresh palette instead.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Palette {
    values: IndexSet<WorldValue>,
}

impl Palette {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: IndexSet::with_capacity(capacity),
        }
    }

    /// Get the index of `value`, inserting it at the end if it is not yet present.
    pub fn get_or_add(&mut self, value: WorldValue) -> u32 {
        let (index, _) = self.values.insert_full(value);
        // Palettes are built from the values of one chunk, which has far fewer than
        // `u32::MAX` voxels.
        index as u32
    }

    #[inline]
    pub fn get(&self, index: u32) -> Option<&WorldValue> {
        self.values.get_index(index as usize)
    }

    #[inline]
    pub fn index_of(&self, value: &WorldValue) -> Option<u32> {
        self.values
            .get_index_of(value)
            .and_then(|index| u32::try_from(index).ok())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The values in the order they were first added.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &WorldValue> {
        self.values.iter()
    }

    #[inline]
    pub fn into_values(self) -> Vec<WorldValue> {
        self.values.into_iter().collect()
    }
}

impl FromIterator<WorldValue> for Palette {
    fn from_iter<T: IntoIterator<Item = WorldValue>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Palette {
    type Item = &'a WorldValue;
    type IntoIter = indexmap::set::Iter<'a, WorldValue>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

/// One entry of a palette as stored by a particular game version, before it is unpacked.
///
/// Old versions refer to blocks by a numeric id and a data value rather than by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawPaletteEntry {
    Value(WorldValue),
    Numeric { id: u16, data: u8 },
}

impl From<WorldValue> for RawPaletteEntry {
    #[inline]
    fn from(value: WorldValue) -> Self {
        Self::Value(value)
    }
}
