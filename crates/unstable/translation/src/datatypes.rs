use std::{fmt, mem, ops::Add};
use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
    hash::{Hash, Hasher},
};

use lodestone_mc_datatypes::{BlockPosition, FloatingWorldPos, NamespacedIdentifier};


// A BTreeMap is used instead of HashMap in order to make caching of Blocks simpler
// (HashMaps do not implement Hash or Ord, BTreeMaps implement both).
pub type BlockProperties = BTreeMap<String, BlockProperty>;

/// Arbitrary auxiliary data carried by entities and block entities.
pub type AuxData = serde_json::Map<String, serde_json::Value>;


/// The possible variants of block properties in the Universal format
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlockProperty {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    String(String),
}

impl Display for BlockProperty {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte(n)   => write!(f, "{n}b"),
            Self::Short(n)  => write!(f, "{n}s"),
            Self::Int(n)    => write!(f, "{n}"),
            Self::Long(n)   => write!(f, "{n}L"),
            Self::String(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<&str> for BlockProperty {
    #[inline]
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for BlockProperty {
    #[inline]
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i32> for BlockProperty {
    #[inline]
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

/// A single block, without any layers: an identifier and its properties.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockState {
    pub identifier: NamespacedIdentifier,
    pub properties: BlockProperties,
}

impl BlockState {
    #[inline]
    pub fn new(identifier: NamespacedIdentifier) -> Self {
        Self {
            identifier,
            properties: BlockProperties::new(),
        }
    }

    #[inline]
    pub fn with_properties(identifier: NamespacedIdentifier, properties: BlockProperties) -> Self {
        Self { identifier, properties }
    }

    /// Builder-style method for adding or replacing one property.
    #[must_use]
    pub fn with_property<V: Into<BlockProperty>>(mut self, name: &str, value: V) -> Self {
        self.properties.insert(name.to_owned(), value.into());
        self
    }

    #[inline]
    pub fn namespace(&self) -> &str {
        &self.identifier.namespace
    }

    #[inline]
    pub fn base_name(&self) -> &str {
        &self.identifier.path
    }
}

impl Display for BlockState {
    /// Displays the block in the usual `namespace:name[property=value,...]` form.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier)?;
        if !self.properties.is_empty() {
            f.write_str("[")?;
            for (idx, (name, value)) in self.properties.iter().enumerate() {
                if idx > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{name}={value}")?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

/// The contents of one voxel: a base block, plus any number of extra blocks occupying the
/// same voxel (for instance, a waterlogged block has a water layer after its base).
///
/// The layers are always kept flat; an extra layer never has layers of its own.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Block {
    base:         BlockState,
    extra_layers: Vec<BlockState>,
}

impl Block {
    #[inline]
    pub fn new(base: BlockState) -> Self {
        Self {
            base,
            extra_layers: Vec::new(),
        }
    }

    #[inline]
    pub fn with_layers(base: BlockState, extra_layers: Vec<BlockState>) -> Self {
        Self { base, extra_layers }
    }

    /// An air block, with no properties, in the given namespace.
    #[inline]
    pub fn air(namespace: &str) -> Self {
        Self::new(BlockState::new(NamespacedIdentifier::new(namespace, "air")))
    }

    #[inline]
    pub fn base(&self) -> &BlockState {
        &self.base
    }

    #[inline]
    pub fn extra_layers(&self) -> &[BlockState] {
        &self.extra_layers
    }

    /// The base block followed by every extra layer, in order.
    pub fn layers(&self) -> impl Iterator<Item = &BlockState> {
        std::iter::once(&self.base).chain(&self.extra_layers)
    }

    #[inline]
    pub fn layer_count(&self) -> usize {
        1 + self.extra_layers.len()
    }

    #[inline]
    pub fn identifier(&self) -> &NamespacedIdentifier {
        &self.base.identifier
    }

    #[inline]
    pub fn namespace(&self) -> &str {
        self.base.namespace()
    }

    #[inline]
    pub fn base_name(&self) -> &str {
        self.base.base_name()
    }

    #[inline]
    pub fn properties(&self) -> &BlockProperties {
        &self.base.properties
    }

    /// Push one more layer onto the end of this block.
    #[inline]
    pub fn push_layer(&mut self, layer: BlockState) {
        self.extra_layers.push(layer);
    }

    /// Consume the block, returning its layers in order.
    pub fn into_layers(self) -> (BlockState, Vec<BlockState>) {
        (self.base, self.extra_layers)
    }
}

impl From<BlockState> for Block {
    #[inline]
    fn from(base: BlockState) -> Self {
        Self::new(base)
    }
}

impl Add for Block {
    type Output = Self;

    /// Layer `rhs` on top of `self`: the result has the base of `self`, then the extra layers of
    /// `self`, then the base of `rhs`, then the extra layers of `rhs`.
    fn add(mut self, rhs: Self) -> Self::Output {
        let (rhs_base, rhs_layers) = rhs.into_layers();
        self.extra_layers.reserve(1 + rhs_layers.len());
        self.extra_layers.push(rhs_base);
        self.extra_layers.extend(rhs_layers);
        self
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        for layer in &self.extra_layers {
            write!(f, " + {layer}")?;
        }
        Ok(())
    }
}

/// The name of a block entity. Some game versions store block entity names without any
/// namespace (such as `Chest`), which are given a namespace later by renaming.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockEntityName {
    pub namespace: Option<Box<str>>,
    pub base_name: Box<str>,
}

impl BlockEntityName {
    #[inline]
    pub fn unnamespaced<N: Into<Box<str>>>(base_name: N) -> Self {
        Self {
            namespace: None,
            base_name: base_name.into(),
        }
    }

    /// The full `namespace:name` identifier, if the namespace is known.
    pub fn namespaced(&self) -> Option<NamespacedIdentifier> {
        let namespace = self.namespace.as_deref()?;
        Some(NamespacedIdentifier::new(namespace, &*self.base_name))
    }

    /// Whether this name is `identifier`. An unnamespaced name is never equal to an identifier.
    pub fn is(&self, identifier: &NamespacedIdentifier) -> bool {
        self.namespace.as_deref() == Some(&*identifier.namespace)
            && self.base_name == identifier.path
    }
}

impl From<NamespacedIdentifier> for BlockEntityName {
    #[inline]
    fn from(identifier: NamespacedIdentifier) -> Self {
        Self {
            namespace: Some(identifier.namespace),
            base_name: identifier.path,
        }
    }
}

impl Display for BlockEntityName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{namespace}:{}", self.base_name),
            None            => write!(f, "{}", self.base_name),
        }
    }
}

/// Extra data associated with exactly one block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEntity {
    pub name:     BlockEntityName,
    pub position: BlockPosition,
    pub data:     AuxData,
}

impl BlockEntity {
    #[inline]
    pub fn new(name: BlockEntityName, position: BlockPosition) -> Self {
        Self {
            name,
            position,
            data: AuxData::new(),
        }
    }

    #[inline]
    pub fn new_with_data(name: BlockEntityName, position: BlockPosition, data: AuxData) -> Self {
        Self { name, position, data }
    }

    /// Replace the name of this block entity, returning the previous name.
    #[inline]
    pub fn rename(&mut self, name: BlockEntityName) -> BlockEntityName {
        mem::replace(&mut self.name, name)
    }
}

/// A free-floating entity, which is not aligned to the block grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub identifier: NamespacedIdentifier,
    pub position:   FloatingWorldPos,
    pub data:       AuxData,
}

impl Entity {
    #[inline]
    pub fn new(identifier: NamespacedIdentifier, position: FloatingWorldPos, data: AuxData) -> Self {
        Self {
            identifier,
            position,
            data,
        }
    }
}

impl Hash for Entity {
    /// The auxiliary data is not hashed; entities which are equal have equal identifiers and
    /// positions, so this is consistent with `Eq`.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identifier.hash(state);
        self.position.hash(state);
    }
}

/// Anything which may be stored in a chunk's palette.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WorldValue {
    Block(Block),
    Entity(Entity),
}

impl WorldValue {
    #[inline]
    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Self::Block(block) => Some(block),
            Self::Entity(_)    => None,
        }
    }

    #[inline]
    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Self::Block(_)       => None,
            Self::Entity(entity) => Some(entity),
        }
    }
}

impl From<Block> for WorldValue {
    #[inline]
    fn from(block: Block) -> Self {
        Self::Block(block)
    }
}

impl From<BlockState> for WorldValue {
    #[inline]
    fn from(block: BlockState) -> Self {
        Self::Block(Block::new(block))
    }
}

impl From<Entity> for WorldValue {
    #[inline]
    fn from(entity: Entity) -> Self {
        Self::Entity(entity)
    }
}

impl Display for WorldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Block(block)   => Display::fmt(block, f),
            Self::Entity(entity) => write!(f, "entity {}", entity.identifier),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn state(name: &str) -> BlockState {
        BlockState::new(NamespacedIdentifier::minecraft(name))
    }

    #[test]
    fn addition_concatenates_layer_chains() {
        let left = Block::with_layers(state("a"), vec![state("b")]);
        let right = Block::with_layers(state("c"), vec![state("d")]);

        let sum = left + right;
        assert_eq!(sum.base(), &state("a"));
        assert_eq!(sum.extra_layers(), [state("b"), state("c"), state("d")]);
        assert_eq!(sum.layer_count(), 4);
    }

    #[test]
    fn equality_includes_layers_and_properties() {
        let plain = Block::new(state("stone"));
        let layered = Block::with_layers(state("stone"), vec![state("water")]);
        assert_ne!(plain, layered);
        assert_eq!(plain.clone() + Block::new(state("water")), layered);

        let with_property = Block::new(state("stone").with_property("variant", "granite"));
        assert_ne!(plain, with_property);
    }

    #[test]
    fn display_forms() {
        let block = Block::with_layers(
            state("oak_stairs").with_property("facing", "north").with_property("half", 1),
            vec![state("water")],
        );
        assert_eq!(
            block.to_string(),
            "minecraft:oak_stairs[facing=\"north\",half=1] + minecraft:water",
        );

        let name = BlockEntityName::unnamespaced("Chest");
        assert_eq!(name.to_string(), "Chest");
        assert_eq!(name.namespaced(), None);

        let name = BlockEntityName::from(NamespacedIdentifier::minecraft("chest"));
        assert!(name.is(&NamespacedIdentifier::minecraft("chest")));
        assert_eq!(name.to_string(), "minecraft:chest");
    }
}
