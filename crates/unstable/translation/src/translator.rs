use std::cell::Cell;

use lodestone_mc_datatypes::{GameVersion, MINECRAFT_NAMESPACE, UNIVERSAL_NAMESPACE};

use crate::chunk::Chunk;
use crate::engine::{self, ValueTranslation, ValueTranslator};
use crate::error::{TranslationError, TranslationStage};
use crate::datatypes::{Block, BlockEntity, BlockEntityName, BlockState, Entity, WorldValue};
use crate::palette::{Palette, RawPaletteEntry};
use crate::profile::{BlockLookup, BlockOrEntity, SingleTranslation, VersionProfile};
use crate::registry::ProfileRegistry;
use crate::resolver::{NeighborChunk, NeighborResolver};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationDirection {
    ToUniversal,
    FromUniversal,
}

impl TranslationDirection {
    /// The namespace of the air block used for a voxel whose translation produced no block.
    #[inline]
    pub fn air_namespace(self) -> &'static str {
        match self {
            Self::ToUniversal   => UNIVERSAL_NAMESPACE,
            Self::FromUniversal => MINECRAFT_NAMESPACE,
        }
    }

    /// Whether a block in the output of this direction should be in a universal namespace.
    #[inline]
    fn output_is_universal(self) -> bool {
        matches!(self, Self::ToUniversal)
    }
}

/// How [`ChunkTranslator`] picks a profile for a requested version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionLookup {
    /// Only use a profile registered for exactly the requested version.
    Exact,
    /// Fall back to [`ProfileRegistry::get_nearest`].
    Nearest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslationOptions {
    /// Log a warning for each block whose namespace does not match the direction of translation,
    /// such as a universal block given to [`ChunkTranslator::to_universal`].
    pub check_namespaces: bool,
    pub version_lookup:   VersionLookup,
}

impl Default for TranslationOptions {
    /// Namespaces are only checked in debug builds.
    #[inline]
    fn default() -> Self {
        Self {
            check_namespaces: cfg!(debug_assertions),
            version_lookup:   VersionLookup::Exact,
        }
    }
}

/// The result of translating a chunk, along with its new palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOutput<P> {
    pub palette:  P,
    /// Free-floating entities produced by translating blocks. Their positions are whatever the
    /// profile gave them; they are not moved to the voxels that produced them.
    pub entities: Vec<Entity>,
}

/// A chunk translated into the universal representation.
pub type TranslatedChunk = TranslationOutput<Palette>;
/// A chunk translated into some version, with that version's stored palette.
pub type PackedChunk = TranslationOutput<Vec<RawPaletteEntry>>;

/// Translates whole chunks between game versions and the universal representation, using the
/// profiles of a [`ProfileRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct ChunkTranslator<'r> {
    registry: &'r ProfileRegistry,
    options:  TranslationOptions,
}

impl<'r> ChunkTranslator<'r> {
    #[inline]
    pub fn new(registry: &'r ProfileRegistry) -> Self {
        Self::with_options(registry, TranslationOptions::default())
    }

    #[inline]
    pub fn with_options(registry: &'r ProfileRegistry, options: TranslationOptions) -> Self {
        Self { registry, options }
    }

    #[inline]
    pub fn options(&self) -> TranslationOptions {
        self.options
    }

    fn profile(&self, version: &GameVersion) -> Result<&'r dyn VersionProfile, TranslationError> {
        let profile = match self.options.version_lookup {
            VersionLookup::Exact   => self.registry.get(version)?,
            VersionLookup::Nearest => self.registry.get_nearest(version)?,
        };
        Ok(profile)
    }

    /// Translate a chunk of `version` into the universal representation.
    ///
    /// `raw_palette` is the palette as stored by `version`, which the chunk's voxels index into.
    /// Neighboring chunks from `resolver` should also be in `version`'s representation, with
    /// unpacked palettes.
    ///
    /// If `full_translate` is false, the palette is only unpacked and the chunk's biomes and
    /// block entity names are translated; the voxels keep their values.
    ///
    /// On error, `chunk` is unchanged.
    pub fn to_universal(
        &self,
        version:        &GameVersion,
        chunk:          &mut Chunk,
        raw_palette:    Vec<RawPaletteEntry>,
        resolver:       Option<&mut dyn NeighborResolver>,
        full_translate: bool,
    ) -> Result<TranslatedChunk, TranslationError> {
        let profile = self.profile(version)?;
        let translator = DirectionalTranslator::new(
            profile,
            TranslationDirection::ToUniversal,
            self.options,
        );

        let values = profile
            .unpack_palette(raw_palette)
            .map_err(|error| {
                TranslationError::from_profile(version, TranslationStage::UnpackPalette, error)
            })?;
        let biomes = chunk
            .biomes
            .map_distinct(|biome| profile.biome_to_universal(biome))
            .map_err(|error| TranslationError::from_profile(version, TranslationStage::Biome, error))?;

        // Lookups into this chunk should see the full names of its block entities.
        let renamed = match profile.block_entity_renames() {
            Some(renames) => rename_all(&mut chunk.block_entities, |name| renames.to_namespaced(name)),
            None          => Vec::new(),
        };

        let plan = engine::plan_translation(chunk, &values, &translator, resolver, full_translate);
        let plan = match plan {
            Ok(plan) => plan,
            Err(error) => {
                restore_names(&mut chunk.block_entities, renamed);
                return Err(error);
            }
        };

        chunk.biomes = biomes;
        let output = match plan {
            Some(plan) => {
                let output = plan.apply(chunk);
                TranslationOutput {
                    palette:  output.palette,
                    entities: output.entities,
                }
            }
            None => TranslationOutput {
                palette:  reindex_values(chunk, values),
                entities: Vec::new(),
            },
        };

        log::debug!(
            "translated {} from {version} to universal: {} palette entries, {} produced entities, \
             {} namespace mismatches",
            chunk.position,
            output.palette.len(),
            output.entities.len(),
            translator.namespace_mismatches(),
        );
        Ok(output)
    }

    /// Prepare a stored chunk of `version` to be served as a neighbor of chunks translated by
    /// [`to_universal`](Self::to_universal).
    ///
    /// Its palette is unpacked, and its block entities are renamed as those of the chunk being
    /// translated are, so lookups see the same names on either side of a chunk border.
    pub fn prepare_neighbor(
        &self,
        version:     &GameVersion,
        mut chunk:   Chunk,
        raw_palette: Vec<RawPaletteEntry>,
    ) -> Result<NeighborChunk, TranslationError> {
        let output = self.to_universal(version, &mut chunk, raw_palette, None, false)?;
        Ok(NeighborChunk::new(chunk, output.palette.into_values()))
    }

    /// Translate a universal chunk into the representation of `version`.
    ///
    /// Neighboring chunks from `resolver` should also be universal.
    ///
    /// If `full_translate` is false, the palette is only packed and the chunk's biomes and
    /// block entity names are translated; the voxels keep their values.
    ///
    /// On error, `chunk` is unchanged.
    pub fn from_universal(
        &self,
        version:        &GameVersion,
        chunk:          &mut Chunk,
        palette:        Palette,
        resolver:       Option<&mut dyn NeighborResolver>,
        full_translate: bool,
    ) -> Result<PackedChunk, TranslationError> {
        let profile = self.profile(version)?;
        let translator = DirectionalTranslator::new(
            profile,
            TranslationDirection::FromUniversal,
            self.options,
        );
        let pack_error = |error: anyhow::Error| {
            TranslationError::from_profile(version, TranslationStage::PackPalette, error)
        };

        let values = palette.into_values();
        let plan = engine::plan_translation(chunk, &values, &translator, resolver, full_translate)?;
        let biomes = chunk
            .biomes
            .map_distinct(|biome| profile.biome_from_universal(biome))
            .map_err(|error| TranslationError::from_profile(version, TranslationStage::Biome, error))?;

        let output = match plan {
            Some(mut plan) => {
                let raw_palette = profile.pack_palette(plan.take_palette()).map_err(pack_error)?;
                let output = plan.apply(chunk);
                TranslationOutput {
                    palette:  raw_palette,
                    entities: output.entities,
                }
            }
            None => TranslationOutput {
                palette:  profile.pack_palette(values.into_iter().collect()).map_err(pack_error)?,
                entities: Vec::new(),
            },
        };
        chunk.biomes = biomes;

        if let Some(renames) = profile.block_entity_renames() {
            rename_all(&mut chunk.block_entities, |name| renames.to_unnamespaced(name));
        }

        log::debug!(
            "translated {} from universal to {version}: {} palette entries, {} produced entities, \
             {} namespace mismatches",
            chunk.position,
            output.palette.len(),
            output.entities.len(),
            translator.namespace_mismatches(),
        );
        Ok(output)
    }
}

/// Rename every block entity for which `rename` returns a new name, returning the index and
/// previous name of each renamed block entity.
fn rename_all<F>(block_entities: &mut [BlockEntity], rename: F) -> Vec<(usize, BlockEntityName)>
where
    F: Fn(&BlockEntityName) -> Option<BlockEntityName>,
{
    block_entities
        .iter_mut()
        .enumerate()
        .filter_map(|(index, block_entity)| {
            let new_name = rename(&block_entity.name)?;
            Some((index, block_entity.rename(new_name)))
        })
        .collect()
}

fn restore_names(block_entities: &mut [BlockEntity], renamed: Vec<(usize, BlockEntityName)>) {
    for (index, name) in renamed {
        if let Some(block_entity) = block_entities.get_mut(index) {
            block_entity.rename(name);
        }
    }
}

/// Build a palette from `values`, which may contain duplicates, and point the voxels of
/// `chunk` at the deduplicated entries.
fn reindex_values(chunk: &mut Chunk, values: Vec<WorldValue>) -> Palette {
    let mut palette = Palette::with_capacity(values.len());
    let mapping: Vec<u32> = values
        .into_iter()
        .map(|value| palette.get_or_add(value))
        .collect();

    let is_identity = mapping
        .iter()
        .enumerate()
        .all(|(old, &new)| old == new as usize);
    if !is_identity {
        chunk.blocks.remap(|old| mapping.get(old as usize).copied().unwrap_or(old));
    }
    palette
}

/// Translates each palette value with one profile in one direction, one block layer at a time.
struct DirectionalTranslator<'p> {
    profile:              &'p dyn VersionProfile,
    direction:            TranslationDirection,
    options:              TranslationOptions,
    namespace_mismatches: Cell<usize>,
}

impl<'p> DirectionalTranslator<'p> {
    fn new(
        profile:   &'p dyn VersionProfile,
        direction: TranslationDirection,
        options:   TranslationOptions,
    ) -> Self {
        Self {
            profile,
            direction,
            options,
            namespace_mismatches: Cell::new(0),
        }
    }

    /// The number of blocks so far whose namespace did not match the direction of translation.
    /// Always zero unless [`TranslationOptions::check_namespaces`] is set.
    #[inline]
    fn namespace_mismatches(&self) -> usize {
        self.namespace_mismatches.get()
    }

    fn translate_layer(
        &self,
        layer:  &BlockState,
        lookup: Option<&dyn BlockLookup>,
    ) -> Result<SingleTranslation, TranslationError> {
        if self.options.check_namespaces {
            self.check_namespace(layer, false);
        }

        let translated = match self.direction {
            TranslationDirection::ToUniversal   => self.profile.block_to_universal(layer, lookup),
            TranslationDirection::FromUniversal => self.profile.block_from_universal(layer, lookup),
        };
        translated.map_err(|error| {
            TranslationError::from_profile(self.profile.version(), TranslationStage::Block, error)
        })
    }

    fn translate_entity(&self, entity: &Entity) -> Result<SingleTranslation, TranslationError> {
        let translated = match self.direction {
            TranslationDirection::ToUniversal   => self.profile.entity_to_universal(entity),
            TranslationDirection::FromUniversal => self.profile.entity_from_universal(entity),
        };
        translated.map_err(|error| {
            TranslationError::from_profile(self.profile.version(), TranslationStage::Entity, error)
        })
    }

    /// Warn if `block` is on the wrong side of the translation.
    fn check_namespace(&self, block: &BlockState, is_output: bool) {
        let should_be_universal = self.direction.output_is_universal() == is_output;
        if block.identifier.is_universal() != should_be_universal {
            self.namespace_mismatches.set(self.namespace_mismatches.get() + 1);
            log::warn!(
                "while translating {:?} with the {} profile, the {} block {block} {} be universal",
                self.direction,
                self.profile.version(),
                if is_output { "output" } else { "input" },
                if should_be_universal { "should" } else { "should not" },
            );
        }
    }

    fn translate_block(
        &self,
        block:  &Block,
        lookup: Option<&dyn BlockLookup>,
    ) -> Result<ValueTranslation, TranslationError> {
        let mut output: Option<Block> = None;
        let mut block_entity = None;
        let mut entities = Vec::new();
        let mut context_dependent = false;

        for (depth, layer) in block.layers().enumerate() {
            let translated = self.translate_layer(layer, lookup)?;
            context_dependent |= translated.context_dependent;
            entities.extend(translated.entities);

            match translated.output {
                BlockOrEntity::Block(layer_output, layer_block_entity) => {
                    if self.options.check_namespaces {
                        for output_layer in layer_output.layers() {
                            self.check_namespace(output_layer, true);
                        }
                    }
                    output = Some(match output {
                        Some(accumulated) => accumulated + layer_output,
                        None              => layer_output,
                    });
                    if depth == 0 {
                        block_entity = layer_block_entity;
                    }
                }
                BlockOrEntity::Entity(entity) => entities.push(entity),
            }
        }

        let value = output.unwrap_or_else(|| Block::air(self.direction.air_namespace()));
        Ok(ValueTranslation {
            value: WorldValue::Block(value),
            block_entity,
            entities,
            context_dependent,
        })
    }
}

impl ValueTranslator for DirectionalTranslator<'_> {
    fn translate(
        &self,
        value:  &WorldValue,
        lookup: Option<&dyn BlockLookup>,
    ) -> Result<ValueTranslation, TranslationError> {
        match value {
            WorldValue::Block(block) => self.translate_block(block, lookup),
            WorldValue::Entity(entity) => {
                let translated = self.translate_entity(entity)?;
                let (value, block_entity) = match translated.output {
                    BlockOrEntity::Block(block, block_entity) => (WorldValue::Block(block), block_entity),
                    BlockOrEntity::Entity(entity)             => (WorldValue::Entity(entity), None),
                };
                Ok(ValueTranslation {
                    value,
                    block_entity,
                    entities:          translated.entities,
                    context_dependent: translated.context_dependent,
                })
            }
        }
    }
}
