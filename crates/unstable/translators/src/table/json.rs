use std::collections::BTreeMap;

use serde::Deserialize;

use lodestone_mc_datatypes::{BlockOffset, NamespacedIdentifier};
use lodestone_translation::datatypes::{BlockProperties, BlockProperty, BlockState};

use super::{MappingParseError, MappingParseOptions};
use super::mappings::{BlockMapping, CopyProperties, NeighborRule};


// ================================================================
//  JSON parsing
// ================================================================

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub(super) struct ProfileJson {
    pub version:               String,
    #[serde(default)]
    pub to_universal:          Vec<MappingJson>,
    #[serde(default)]
    pub from_universal:        Vec<MappingJson>,
    /// Biome ids of this version, mapped to universal biome ids.
    #[serde(default)]
    pub biomes:                BTreeMap<u32, u32>,
    /// Defaults to the inverse of `biomes`, preferring the smallest version id.
    #[serde(default)]
    pub biomes_from_universal: Option<BTreeMap<u32, u32>>,
    /// Block entity names stored without namespace, mapped to their full names.
    #[serde(default)]
    pub block_entities:        BTreeMap<String, String>,
    #[serde(default)]
    pub entities:              BTreeMap<String, String>,
    #[serde(default)]
    pub numeric_blocks:        Vec<NumericJson>,
    /// Whether palettes of this version are stored numerically, where possible.
    #[serde(default)]
    pub numeric_palette:       bool,
    /// Whether values without a mapping are moved to the other namespace unchanged,
    /// instead of causing an error.
    #[serde(default)]
    pub passthrough_unmapped:  bool,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub(super) struct MappingJson {
    input:             String,
    #[serde(default)]
    properties:        BTreeMap<String, PropertyJson>,
    output:            String,
    #[serde(default)]
    output_properties: BTreeMap<String, PropertyJson>,
    #[serde(default)]
    copy_properties:   CopyJson,
    #[serde(default)]
    extra_layers:      Vec<LayerJson>,
    #[serde(default)]
    block_entity:      Option<String>,
    #[serde(default)]
    neighbor:          Option<NeighborJson>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct NeighborJson {
    offset:     [i32; 3],
    matches:    String,
    #[serde(default)]
    properties: BTreeMap<String, PropertyJson>,
    #[serde(default)]
    otherwise:  BTreeMap<String, PropertyJson>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub(super) struct NumericJson {
    pub id:     u16,
    pub data:   u8,
    pub block:  String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyJson>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum CopyJson {
    All(bool),
    Only(Vec<String>),
}

impl Default for CopyJson {
    #[inline]
    fn default() -> Self {
        Self::All(false)
    }
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum LayerJson {
    Name(String),
    State {
        name:       String,
        #[serde(default)]
        properties: BTreeMap<String, PropertyJson>,
    },
}

/// A property value: a string, an integer (an Int if it fits, else a Long), or a tagged
/// integer such as `{"byte": 1}`.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub(super) enum PropertyJson {
    String(String),
    Integer(i64),
    Tagged(TaggedPropertyJson),
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "snake_case")]
pub(super) enum TaggedPropertyJson {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
}

impl From<PropertyJson> for BlockProperty {
    fn from(value: PropertyJson) -> Self {
        match value {
            PropertyJson::String(string) => Self::String(string),
            PropertyJson::Integer(n)     => i32::try_from(n).map_or(Self::Long(n), Self::Int),
            PropertyJson::Tagged(tagged) => match tagged {
                TaggedPropertyJson::Byte(n)  => Self::Byte(n),
                TaggedPropertyJson::Short(n) => Self::Short(n),
                TaggedPropertyJson::Int(n)   => Self::Int(n),
                TaggedPropertyJson::Long(n)  => Self::Long(n),
            },
        }
    }
}

pub(super) fn parse_properties(properties: BTreeMap<String, PropertyJson>) -> BlockProperties {
    properties
        .into_iter()
        .map(|(name, value)| (name, BlockProperty::from(value)))
        .collect()
}

#[inline]
pub(super) fn parse_identifier(
    identifier: &str,
    opts:       MappingParseOptions,
) -> Result<NamespacedIdentifier, MappingParseError> {
    Ok(NamespacedIdentifier::parse(identifier, opts.identifier_options)?)
}

pub(super) fn parse_mapping(
    mapping: MappingJson,
    opts:    MappingParseOptions,
) -> Result<BlockMapping, MappingParseError> {
    let copy_properties = match mapping.copy_properties {
        CopyJson::All(true)    => CopyProperties::All,
        CopyJson::All(false)   => CopyProperties::None,
        CopyJson::Only(names)  => CopyProperties::Only(names),
    };

    let extra_layers = mapping
        .extra_layers
        .into_iter()
        .map(|layer| {
            let (name, properties) = match layer {
                LayerJson::Name(name)               => (name, BTreeMap::new()),
                LayerJson::State { name, properties } => (name, properties),
            };
            Ok(BlockState::with_properties(
                parse_identifier(&name, opts)?,
                parse_properties(properties),
            ))
        })
        .collect::<Result<Vec<_>, MappingParseError>>()?;

    let neighbor = mapping
        .neighbor
        .map(|neighbor| {
            Ok::<_, MappingParseError>(NeighborRule {
                offset:     BlockOffset::from(neighbor.offset),
                matches:    parse_identifier(&neighbor.matches, opts)?,
                properties: parse_properties(neighbor.properties),
                otherwise:  parse_properties(neighbor.otherwise),
            })
        })
        .transpose()?;

    Ok(BlockMapping {
        input:        parse_identifier(&mapping.input, opts)?,
        required:     parse_properties(mapping.properties),
        output:       parse_identifier(&mapping.output, opts)?,
        properties:   parse_properties(mapping.output_properties),
        copy_properties,
        extra_layers,
        block_entity: mapping
            .block_entity
            .map(|name| parse_identifier(&name, opts))
            .transpose()?,
        neighbor,
    })
}
