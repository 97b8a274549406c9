//! A [`VersionProfile`] driven by translation tables stored as JSON.
//!
//! Each block mapping names an input block, optionally with properties it must have, and the
//! output block it becomes. A mapping may copy properties from its input, add extra layers,
//! attach a block entity, or depend on one neighboring block.

mod json;
mod mappings;


use std::collections::{BTreeMap, HashMap};

use anyhow::anyhow;
use serde_json::Error as JsonError;
use thiserror::Error;

use lodestone_mc_datatypes::{
    GameVersion, IdentifierParseError, IdentifierParseOptions, NamespacedIdentifier,
    VersionParseError,
};
use lodestone_translation::{
    BlockEntityRenames, BlockLookup, SingleTranslation, TranslationDirection, VersionProfile,
};
use lodestone_translation::datatypes::{Block, BlockState, Entity, WorldValue};

use self::json::{parse_identifier, parse_mapping, parse_properties, ProfileJson};

pub use self::mappings::{BlockMapping, BlockMappings, CopyProperties, NeighborRule};


// ================================================================
//  Options and Error
// ================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingParseOptions {
    pub identifier_options: IdentifierParseOptions,
}

impl Default for MappingParseOptions {
    /// Table files may use Bedrock's looser identifiers, but must always give a namespace.
    #[inline]
    fn default() -> Self {
        Self {
            identifier_options: IdentifierParseOptions {
                default_namespace:          None,
                java_character_constraints: false,
            },
        }
    }
}

#[derive(Error, Debug)]
pub enum MappingParseError {
    #[error(transparent)]
    Json(#[from] JsonError),
    #[error(transparent)]
    Identifier(#[from] IdentifierParseError),
    #[error(transparent)]
    Version(#[from] VersionParseError),
    #[error("a translation table cannot be for the universal representation")]
    UniversalVersion,
    #[error("the numeric block {id}:{data} is mapped more than once")]
    DuplicateNumeric {
        id:   u16,
        data: u8,
    },
}

// ================================================================
//  Table profile
// ================================================================

#[derive(Debug)]
pub struct TableProfile {
    version:              GameVersion,
    to_universal:         BlockMappings,
    from_universal:       BlockMappings,
    biomes_to:            HashMap<u32, u32>,
    biomes_from:          HashMap<u32, u32>,
    entities_to:          HashMap<NamespacedIdentifier, NamespacedIdentifier>,
    entities_from:        HashMap<NamespacedIdentifier, NamespacedIdentifier>,
    renames:              Option<BlockEntityRenames>,
    numeric_to_value:     HashMap<(u16, u8), WorldValue>,
    /// Only filled if the version stores its palettes numerically.
    value_to_numeric:     HashMap<WorldValue, (u16, u8)>,
    passthrough_unmapped: bool,
}

impl TableProfile {
    /// Parse a translation table from JSON.
    pub fn from_json(json: &str, opts: MappingParseOptions) -> Result<Self, MappingParseError> {
        parse_profile(serde_json::from_str(json)?, opts)
    }

    #[inline]
    pub fn block_mappings(&self, direction: TranslationDirection) -> &BlockMappings {
        match direction {
            TranslationDirection::ToUniversal   => &self.to_universal,
            TranslationDirection::FromUniversal => &self.from_universal,
        }
    }

    /// Move `identifier` into the namespace on the other side of `direction`.
    fn passthrough_identifier(
        identifier: &NamespacedIdentifier,
        direction:  TranslationDirection,
    ) -> NamespacedIdentifier {
        NamespacedIdentifier::new(direction.air_namespace(), &*identifier.path)
    }

    fn translate_block(
        &self,
        block:     &BlockState,
        lookup:    Option<&dyn BlockLookup>,
        direction: TranslationDirection,
    ) -> anyhow::Result<SingleTranslation> {
        if let Some(mapping) = self.block_mappings(direction).find(block) {
            return Ok(mapping.apply(block, lookup)?);
        }

        if self.passthrough_unmapped {
            log::trace!("passing through unmapped block {block} ({})", self.version);
            let identifier = Self::passthrough_identifier(&block.identifier, direction);
            Ok(SingleTranslation::block(BlockState::with_properties(
                identifier,
                block.properties.clone(),
            )))
        } else {
            Err(anyhow!("{} has no mapping for the block {block}", self.version))
        }
    }

    fn translate_entity(
        &self,
        entity:    &Entity,
        direction: TranslationDirection,
    ) -> anyhow::Result<SingleTranslation> {
        let map = match direction {
            TranslationDirection::ToUniversal   => &self.entities_to,
            TranslationDirection::FromUniversal => &self.entities_from,
        };

        let identifier = match map.get(&entity.identifier) {
            Some(identifier) => identifier.clone(),
            None if self.passthrough_unmapped => {
                Self::passthrough_identifier(&entity.identifier, direction)
            }
            None => {
                return Err(anyhow!(
                    "{} has no mapping for the entity {}",
                    self.version,
                    entity.identifier,
                ));
            }
        };

        Ok(SingleTranslation::entity(Entity {
            identifier,
            ..entity.clone()
        }))
    }

    fn translate_biome(&self, biome: u32, direction: TranslationDirection) -> anyhow::Result<u32> {
        let map = match direction {
            TranslationDirection::ToUniversal   => &self.biomes_to,
            TranslationDirection::FromUniversal => &self.biomes_from,
        };
        match map.get(&biome) {
            Some(&translated) => Ok(translated),
            None if self.passthrough_unmapped => Ok(biome),
            None => Err(anyhow!("{} has no mapping for the biome {biome}", self.version)),
        }
    }
}

impl VersionProfile for TableProfile {
    #[inline]
    fn version(&self) -> &GameVersion {
        &self.version
    }

    fn block_to_universal(
        &self,
        block:  &BlockState,
        lookup: Option<&dyn BlockLookup>,
    ) -> anyhow::Result<SingleTranslation> {
        self.translate_block(block, lookup, TranslationDirection::ToUniversal)
    }

    fn block_from_universal(
        &self,
        block:  &BlockState,
        lookup: Option<&dyn BlockLookup>,
    ) -> anyhow::Result<SingleTranslation> {
        self.translate_block(block, lookup, TranslationDirection::FromUniversal)
    }

    fn entity_to_universal(&self, entity: &Entity) -> anyhow::Result<SingleTranslation> {
        self.translate_entity(entity, TranslationDirection::ToUniversal)
    }

    fn entity_from_universal(&self, entity: &Entity) -> anyhow::Result<SingleTranslation> {
        self.translate_entity(entity, TranslationDirection::FromUniversal)
    }

    fn biome_to_universal(&self, biome: u32) -> anyhow::Result<u32> {
        self.translate_biome(biome, TranslationDirection::ToUniversal)
    }

    fn biome_from_universal(&self, biome: u32) -> anyhow::Result<u32> {
        self.translate_biome(biome, TranslationDirection::FromUniversal)
    }

    fn unpack_numeric(&self, id: u16, data: u8) -> anyhow::Result<WorldValue> {
        self.numeric_to_value
            .get(&(id, data))
            .cloned()
            .ok_or_else(|| anyhow!("{} has no numeric block {id}:{data}", self.version))
    }

    #[inline]
    fn pack_numeric(&self, value: &WorldValue) -> Option<(u16, u8)> {
        self.value_to_numeric.get(value).copied()
    }

    #[inline]
    fn block_entity_renames(&self) -> Option<&BlockEntityRenames> {
        self.renames.as_ref()
    }
}

fn parse_profile(
    json: ProfileJson,
    opts: MappingParseOptions,
) -> Result<TableProfile, MappingParseError> {
    let version: GameVersion = json.version.parse()?;
    if version.is_universal() {
        return Err(MappingParseError::UniversalVersion);
    }

    let parse_mappings = |mappings: Vec<_>| {
        mappings
            .into_iter()
            .map(|mapping| parse_mapping(mapping, opts))
            .collect::<Result<Vec<_>, _>>()
            .map(BlockMappings::new)
    };
    let to_universal = parse_mappings(json.to_universal)?;
    let from_universal = parse_mappings(json.from_universal)?;

    let biomes_from = match json.biomes_from_universal {
        Some(biomes_from) => biomes_from.into_iter().collect(),
        None => {
            let mut inverse = BTreeMap::new();
            for (&biome, &universal) in &json.biomes {
                inverse.entry(universal).or_insert(biome);
            }
            inverse.into_iter().collect()
        }
    };
    let biomes_to = json.biomes.into_iter().collect();

    let mut entities_to = HashMap::new();
    let mut entities_from = HashMap::new();
    for (entity, universal) in &json.entities {
        let entity = parse_identifier(entity, opts)?;
        let universal = parse_identifier(universal, opts)?;
        entities_from.entry(universal.clone()).or_insert_with(|| entity.clone());
        entities_to.insert(entity, universal);
    }

    let renames = if json.block_entities.is_empty() {
        None
    } else {
        let mut renames = BlockEntityRenames::new();
        for (base_name, namespaced) in json.block_entities {
            renames.insert(base_name, parse_identifier(&namespaced, opts)?);
        }
        Some(renames)
    };

    let mut numeric_to_value = HashMap::new();
    let mut value_to_numeric = HashMap::new();
    for numeric in json.numeric_blocks {
        let block = BlockState::with_properties(
            parse_identifier(&numeric.block, opts)?,
            parse_properties(numeric.properties),
        );
        let value = WorldValue::Block(Block::new(block));
        let key = (numeric.id, numeric.data);

        if numeric_to_value.contains_key(&key) {
            return Err(MappingParseError::DuplicateNumeric {
                id:   numeric.id,
                data: numeric.data,
            });
        }
        if json.numeric_palette {
            value_to_numeric.entry(value.clone()).or_insert(key);
        }
        numeric_to_value.insert(key, value);
    }

    log::debug!(
        "parsed the translation table for {version}: {} mappings to universal, {} from universal",
        to_universal.len(),
        from_universal.len(),
    );

    Ok(TableProfile {
        version,
        to_universal,
        from_universal,
        biomes_to,
        biomes_from,
        entities_to,
        entities_from,
        renames,
        numeric_to_value,
        value_to_numeric,
        passthrough_unmapped: json.passthrough_unmapped,
    })
}
