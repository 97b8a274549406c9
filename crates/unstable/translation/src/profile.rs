use std::collections::HashMap;

use anyhow::bail;

use lodestone_mc_datatypes::{BlockOffset, BlockPosition, GameVersion, NamespacedIdentifier};

use crate::resolver::ResolveError;
use crate::datatypes::{Block, BlockEntity, BlockEntityName, BlockState, Entity, WorldValue};
use crate::palette::{Palette, RawPaletteEntry};


/// The translation tables of one game version, which translate granular game data between
/// that version's representation and the universal representation.
///
/// Translating a whole chunk is done by [`ChunkTranslator`](crate::ChunkTranslator), which
/// calls into a profile once per distinct value where possible.
///
/// Errors are returned as [`anyhow::Error`]s. A [`ResolveError`] returned by a
/// [`BlockLookup`] should be propagated unchanged (for instance, with `?`), so that it is
/// reported as a neighbor failure instead of a profile failure.
pub trait VersionProfile: Send + Sync {
    /// The version whose data this profile translates.
    fn version(&self) -> &GameVersion;

    /// Translate one block layer into the universal representation.
    ///
    /// `lookup` is `None` for the first, context-free attempt. If the result depends on
    /// neighboring blocks, set [`SingleTranslation::context_dependent`]; the block will then be
    /// translated again for each voxel holding it, with a lookup for that voxel, if neighbors
    /// are available.
    fn block_to_universal(
        &self,
        block:  &BlockState,
        lookup: Option<&dyn BlockLookup>,
    ) -> anyhow::Result<SingleTranslation>;

    /// Translate one universal block layer into this version's representation.
    ///
    /// See [`VersionProfile::block_to_universal`] for the meaning of `lookup`.
    fn block_from_universal(
        &self,
        block:  &BlockState,
        lookup: Option<&dyn BlockLookup>,
    ) -> anyhow::Result<SingleTranslation>;

    #[inline]
    fn entity_to_universal(&self, entity: &Entity) -> anyhow::Result<SingleTranslation> {
        Ok(SingleTranslation::entity(entity.clone()))
    }

    #[inline]
    fn entity_from_universal(&self, entity: &Entity) -> anyhow::Result<SingleTranslation> {
        Ok(SingleTranslation::entity(entity.clone()))
    }

    fn biome_to_universal(&self, biome: u32) -> anyhow::Result<u32>;
    fn biome_from_universal(&self, biome: u32) -> anyhow::Result<u32>;

    /// Convert a legacy numeric block into a named block of this version.
    fn unpack_numeric(&self, id: u16, data: u8) -> anyhow::Result<WorldValue> {
        bail!("{} has no numeric block mapping for {id}:{data}", self.version())
    }

    /// Convert a block of this version into its legacy numeric form, if it should use one.
    #[inline]
    fn pack_numeric(&self, _value: &WorldValue) -> Option<(u16, u8)> {
        None
    }

    /// Convert a palette as stored by this version into values of this version.
    ///
    /// The returned values correspond one-to-one with `raw`, so that voxel indices into `raw`
    /// remain valid.
    fn unpack_palette(&self, raw: Vec<RawPaletteEntry>) -> anyhow::Result<Vec<WorldValue>> {
        raw.into_iter()
            .map(|entry| match entry {
                RawPaletteEntry::Value(value)          => Ok(value),
                RawPaletteEntry::Numeric { id, data }  => self.unpack_numeric(id, data),
            })
            .collect()
    }

    /// Convert a palette of values of this version into the form stored by this version.
    /// The returned entries correspond one-to-one with `palette`.
    fn pack_palette(&self, palette: Palette) -> anyhow::Result<Vec<RawPaletteEntry>> {
        Ok(palette
            .into_values()
            .into_iter()
            .map(|value| match self.pack_numeric(&value) {
                Some((id, data)) => RawPaletteEntry::Numeric { id, data },
                None             => RawPaletteEntry::Value(value),
            })
            .collect())
    }

    /// The block entity names which this version stores without a namespace.
    #[inline]
    fn block_entity_renames(&self) -> Option<&BlockEntityRenames> {
        None
    }
}

/// The result of translating one block layer or one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleTranslation {
    pub output:            BlockOrEntity,
    /// Free-floating entities created by the translation, such as the entity form of an item
    /// frame block.
    pub entities:          Vec<Entity>,
    /// Whether the translation depends on the neighbors of the block.
    pub context_dependent: bool,
}

impl SingleTranslation {
    #[inline]
    pub fn block<B: Into<Block>>(block: B) -> Self {
        Self {
            output:            BlockOrEntity::Block(block.into(), None),
            entities:          Vec::new(),
            context_dependent: false,
        }
    }

    #[inline]
    pub fn entity(entity: Entity) -> Self {
        Self {
            output:            BlockOrEntity::Entity(entity),
            entities:          Vec::new(),
            context_dependent: false,
        }
    }

    /// Attach a block entity to a block output. The block entity's position is replaced with
    /// the position of each voxel the block is placed at.
    #[must_use]
    pub fn with_block_entity(mut self, block_entity: BlockEntity) -> Self {
        if let BlockOrEntity::Block(_, slot) = &mut self.output {
            *slot = Some(block_entity);
        }
        self
    }

    #[inline]
    #[must_use]
    pub fn context_dependent(mut self) -> Self {
        self.context_dependent = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOrEntity {
    Block(Block, Option<BlockEntity>),
    Entity(Entity),
}

/// Read access to the voxels around the one being translated.
pub trait BlockLookup {
    /// The world position of the voxel being translated.
    fn position(&self) -> BlockPosition;

    /// The value and block entity at `offset` from the voxel being translated.
    ///
    /// Returns `Ok(None)` if there is no voxel there, such as if the neighboring chunk does not
    /// exist or the offset leaves the vertical extent of the world.
    fn block_at(&self, offset: BlockOffset) -> Result<Option<Neighbor>, ResolveError>;
}

/// A voxel returned by a [`BlockLookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbor {
    pub value:        WorldValue,
    pub block_entity: Option<BlockEntity>,
}

impl Neighbor {
    #[inline]
    pub fn block(&self) -> Option<&Block> {
        self.value.as_block()
    }
}

/// Maps block entity names which a version stores without namespace to their full names,
/// and back.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BlockEntityRenames {
    forward: HashMap<Box<str>, NamespacedIdentifier>,
    inverse: HashMap<NamespacedIdentifier, Box<str>>,
}

impl BlockEntityRenames {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rename from `base_name` to `namespaced`.
    ///
    /// If either side was already present, the older rename involving it is replaced.
    pub fn insert<N: Into<Box<str>>>(&mut self, base_name: N, namespaced: NamespacedIdentifier) {
        let base_name = base_name.into();
        if let Some(old) = self.forward.insert(base_name.clone(), namespaced.clone()) {
            self.inverse.remove(&old);
        }
        if let Some(old) = self.inverse.insert(namespaced, base_name) {
            self.forward.remove(&old);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// The full name of a name stored without namespace. Names which already have a namespace
    /// are never renamed.
    pub fn to_namespaced(&self, name: &BlockEntityName) -> Option<BlockEntityName> {
        if name.namespace.is_some() {
            return None;
        }
        self.forward
            .get(&name.base_name)
            .map(|namespaced| BlockEntityName::from(namespaced.clone()))
    }

    /// The stored form of a full name, if this version stores it without namespace.
    pub fn to_unnamespaced(&self, name: &BlockEntityName) -> Option<BlockEntityName> {
        let namespaced = name.namespaced()?;
        self.inverse
            .get(&namespaced)
            .map(|base_name| BlockEntityName::unnamespaced(base_name.clone()))
    }
}

impl<N: Into<Box<str>>> FromIterator<(N, NamespacedIdentifier)> for BlockEntityRenames {
    fn from_iter<T: IntoIterator<Item = (N, NamespacedIdentifier)>>(iter: T) -> Self {
        let mut renames = Self::new();
        for (base_name, namespaced) in iter {
            renames.insert(base_name, namespaced);
        }
        renames
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renames_go_both_ways() {
        let renames: BlockEntityRenames = [
            ("Chest", NamespacedIdentifier::universal("chest")),
            ("Sign", NamespacedIdentifier::universal("sign")),
        ]
        .into_iter()
        .collect();

        let stored = BlockEntityName::unnamespaced("Chest");
        let full = renames.to_namespaced(&stored).unwrap();
        assert!(full.is(&NamespacedIdentifier::universal("chest")));
        assert_eq!(renames.to_unnamespaced(&full), Some(stored));

        assert_eq!(renames.to_namespaced(&BlockEntityName::unnamespaced("Furnace")), None);
        assert_eq!(renames.to_namespaced(&full), None);
        assert_eq!(renames.to_unnamespaced(&BlockEntityName::unnamespaced("Chest")), None);
    }

    #[test]
    fn reinserting_replaces_both_directions() {
        let mut renames = BlockEntityRenames::new();
        renames.insert("Chest", NamespacedIdentifier::universal("chest"));
        renames.insert("Chest", NamespacedIdentifier::universal("trapped_chest"));
        assert_eq!(renames.len(), 1);

        let old = BlockEntityName::from(NamespacedIdentifier::universal("chest"));
        assert_eq!(renames.to_unnamespaced(&old), None);
    }
}
