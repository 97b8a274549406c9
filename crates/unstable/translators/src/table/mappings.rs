use std::collections::HashMap;

use lodestone_mc_datatypes::{BlockOffset, BlockPosition, NamespacedIdentifier};
use lodestone_translation::{BlockLookup, ResolveError, SingleTranslation};
use lodestone_translation::datatypes::{
    Block, BlockEntity, BlockEntityName, BlockProperties, BlockState,
};


// ================================================================
//  Final data structures
// ================================================================

/// The block mappings of one direction, grouped by input identifier.
#[derive(Debug, Default, Clone)]
pub struct BlockMappings {
    by_input: HashMap<NamespacedIdentifier, Vec<BlockMapping>>,
}

impl BlockMappings {
    pub fn new(mappings: Vec<BlockMapping>) -> Self {
        let mut by_input: HashMap<_, Vec<_>> = HashMap::new();
        for mapping in mappings {
            by_input.entry(mapping.input.clone()).or_default().push(mapping);
        }
        Self { by_input }
    }

    /// The first mapping, in file order, for `block`'s identifier whose required properties
    /// are all present on `block` with the same values.
    pub fn find(&self, block: &BlockState) -> Option<&BlockMapping> {
        self.by_input
            .get(&block.identifier)?
            .iter()
            .find(|mapping| mapping.matches(block))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.by_input.values().map(Vec::len).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_input.is_empty()
    }
}

/// Which properties of the input block are kept on the output block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyProperties {
    All,
    Only(Vec<String>),
    None,
}

#[derive(Debug, Clone)]
pub struct BlockMapping {
    pub input:           NamespacedIdentifier,
    /// Properties the input block must have for this mapping to apply.
    pub required:        BlockProperties,
    pub output:          NamespacedIdentifier,
    /// Properties set on the output, after any copied properties.
    pub properties:      BlockProperties,
    pub copy_properties: CopyProperties,
    pub extra_layers:    Vec<BlockState>,
    pub block_entity:    Option<NamespacedIdentifier>,
    pub neighbor:        Option<NeighborRule>,
}

/// Sets some properties of the output depending on whether a neighboring block has a
/// certain identifier.
#[derive(Debug, Clone)]
pub struct NeighborRule {
    pub offset:     BlockOffset,
    pub matches:    NamespacedIdentifier,
    pub properties: BlockProperties,
    pub otherwise:  BlockProperties,
}

impl BlockMapping {
    pub fn matches(&self, block: &BlockState) -> bool {
        self.required
            .iter()
            .all(|(name, value)| block.properties.get(name) == Some(value))
    }

    /// Translate `block`, which this mapping [`matches`](BlockMapping::matches).
    ///
    /// Without a lookup, a neighbor rule takes its `otherwise` branch. Mappings with a neighbor
    /// rule are always context dependent.
    pub fn apply(
        &self,
        block:  &BlockState,
        lookup: Option<&dyn BlockLookup>,
    ) -> Result<SingleTranslation, ResolveError> {
        let mut properties = match &self.copy_properties {
            CopyProperties::All         => block.properties.clone(),
            CopyProperties::None        => BlockProperties::new(),
            CopyProperties::Only(names) => block
                .properties
                .iter()
                .filter(|(name, _)| names.contains(name))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        };
        properties.extend(self.properties.iter().map(|(k, v)| (k.clone(), v.clone())));

        if let Some(rule) = &self.neighbor {
            let neighbor = match lookup {
                Some(lookup) => lookup.block_at(rule.offset)?,
                None         => None,
            };
            let matched = neighbor
                .as_ref()
                .and_then(|neighbor| neighbor.block())
                .is_some_and(|neighbor| neighbor.identifier() == &rule.matches);
            let set = if matched { &rule.properties } else { &rule.otherwise };
            properties.extend(set.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let base = BlockState::with_properties(self.output.clone(), properties);
        let mut translation = SingleTranslation::block(
            Block::with_layers(base, self.extra_layers.clone()),
        );

        if let Some(name) = &self.block_entity {
            let position = lookup.map_or(BlockPosition::new(0, 0, 0), |lookup| lookup.position());
            translation = translation.with_block_entity(BlockEntity::new(
                BlockEntityName::from(name.clone()),
                position,
            ));
        }
        if self.neighbor.is_some() {
            translation = translation.context_dependent();
        }
        Ok(translation)
    }
}
