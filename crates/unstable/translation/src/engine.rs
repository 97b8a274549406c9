//! A single translation pass over a chunk.
//!
//! Every palette entry is first translated without any context. Entries whose translation
//! depends on their neighbors are then translated again once per voxel holding them, if
//! neighboring chunks are available. The chunk is only rewritten after every translation
//! succeeded.

use std::cell::RefCell;

use lodestone_mc_datatypes::{BlockOffset, BlockPosInChunk, BlockPosition};
use lodestone_util::InspectNone as _;

use crate::error::TranslationError;
use crate::chunk::Chunk;
use crate::palette::Palette;
use crate::datatypes::{BlockEntity, Entity, WorldValue};
use crate::profile::{BlockLookup, Neighbor};
use crate::resolver::{NeighborResolver, ResolveError};


/// Translates one palette value, which may be a composite block, in one direction.
pub trait ValueTranslator {
    fn translate(
        &self,
        value:  &WorldValue,
        lookup: Option<&dyn BlockLookup>,
    ) -> Result<ValueTranslation, TranslationError>;
}

impl<F> ValueTranslator for F
where
    F: Fn(&WorldValue, Option<&dyn BlockLookup>) -> Result<ValueTranslation, TranslationError>,
{
    #[inline]
    fn translate(
        &self,
        value:  &WorldValue,
        lookup: Option<&dyn BlockLookup>,
    ) -> Result<ValueTranslation, TranslationError> {
        self(value, lookup)
    }
}

/// The translation of one palette value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueTranslation {
    pub value:             WorldValue,
    /// Copied to every voxel the value is placed at, with the voxel's position.
    pub block_entity:      Option<BlockEntity>,
    pub entities:          Vec<Entity>,
    pub context_dependent: bool,
}

impl ValueTranslation {
    #[inline]
    pub fn new(value: WorldValue) -> Self {
        Self {
            value,
            block_entity:      None,
            entities:          Vec::new(),
            context_dependent: false,
        }
    }
}

/// What a translation pass produced, other than the rewritten chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOutput {
    pub palette:  Palette,
    /// Free-floating entities created while translating blocks, at the positions the
    /// translator gave them.
    pub entities: Vec<Entity>,
}

/// Translate every voxel of `chunk`, whose indices refer to `palette`.
///
/// On success, the voxel indices of `chunk` refer to the returned palette, and its block
/// entities are replaced with those produced by translation. Returns `Ok(None)` without
/// changing the chunk if `full_translate` is false.
///
/// Entries which report that their translation is context dependent are translated again
/// for each voxel, with a lookup into `chunk` and its neighbors from `resolver`. Without a
/// resolver, their context-free translation is used.
///
/// On error, `chunk` is unchanged.
pub fn translate_chunk<T: ValueTranslator + ?Sized>(
    chunk:          &mut Chunk,
    palette:        &[WorldValue],
    translator:     &T,
    resolver:       Option<&mut dyn NeighborResolver>,
    full_translate: bool,
) -> Result<Option<PassOutput>, TranslationError> {
    let plan = plan_translation(chunk, palette, translator, resolver, full_translate)?;
    Ok(plan.map(|plan| plan.apply(chunk)))
}

/// Compute the changes [`translate_chunk`] would make to `chunk`, without making them.
pub(crate) fn plan_translation<T: ValueTranslator + ?Sized>(
    chunk:          &Chunk,
    palette:        &[WorldValue],
    translator:     &T,
    resolver:       Option<&mut dyn NeighborResolver>,
    full_translate: bool,
) -> Result<Option<PassPlan>, TranslationError> {
    chunk.check_shape()?;
    if !full_translate {
        return Ok(None);
    }

    if let Some((position, index)) = chunk.blocks.first_out_of_range(palette.len()) {
        return Err(TranslationError::PaletteIndexOutOfRange {
            position:    position.to_world(chunk.position),
            index,
            palette_len: palette.len(),
        });
    }

    plan_pass(chunk, palette, translator, resolver).map(Some)
}

/// The changes a pass makes to a chunk, computed without modifying it.
#[derive(Debug)]
pub(crate) struct PassPlan {
    palette:        Palette,
    /// The new index of each old palette index, or `None` if every voxel holding it has an
    /// entry in `overrides`.
    bulk:           Vec<Option<u32>>,
    overrides:      Vec<(BlockPosInChunk, u32)>,
    block_entities: Vec<BlockEntity>,
    entities:       Vec<Entity>,
}

impl PassPlan {
    /// Take the new palette out of the plan, leaving an empty palette behind.
    #[inline]
    pub(crate) fn take_palette(&mut self) -> Palette {
        std::mem::take(&mut self.palette)
    }

    pub(crate) fn apply(self, chunk: &mut Chunk) -> PassOutput {
        let bulk = self.bulk;
        chunk.blocks.remap(|old| bulk.get(old as usize).copied().flatten().unwrap_or(old));
        for (position, new) in self.overrides {
            chunk.blocks.set(position, new);
        }
        chunk.block_entities = self.block_entities;

        PassOutput {
            palette:  self.palette,
            entities: self.entities,
        }
    }
}

fn plan_pass<T: ValueTranslator + ?Sized>(
    chunk:      &Chunk,
    palette:    &[WorldValue],
    translator: &T,
    resolver:   Option<&mut dyn NeighborResolver>,
) -> Result<PassPlan, TranslationError> {
    let mut plan = PassPlan {
        palette:        Palette::with_capacity(palette.len()),
        bulk:           Vec::with_capacity(palette.len()),
        overrides:      Vec::new(),
        block_entities: Vec::new(),
        entities:       Vec::new(),
    };
    let mut deferred = vec![false; palette.len()];

    for (old_index, value) in palette.iter().enumerate() {
        let translated = translator.translate(value, None)?;

        if translated.context_dependent && resolver.is_some() {
            deferred[old_index] = true;
            plan.bulk.push(None);
            continue;
        }

        let voxels: Vec<BlockPosInChunk> = chunk.blocks.positions_of(old_index as u32).collect();
        for &position in &voxels {
            if let Some(block_entity) = &translated.block_entity {
                plan.block_entities.push(placed(block_entity, position.to_world(chunk.position)));
            }
            plan.entities.extend(translated.entities.iter().cloned());
        }
        plan.bulk.push(Some(plan.palette.get_or_add(translated.value)));
    }

    let deferred_count = deferred.iter().filter(|&&deferred| deferred).count();
    log::trace!(
        "{}: {} palette entries, {deferred_count} context dependent",
        chunk.position,
        palette.len(),
    );

    let Some(resolver) = resolver else {
        return Ok(plan);
    };
    if deferred_count == 0 {
        return Ok(plan);
    }

    let resolver = RefCell::new(resolver);
    for (position, old_index) in chunk.blocks.iter() {
        if !deferred[old_index as usize] {
            continue;
        }

        let world = position.to_world(chunk.position);
        let lookup = ChunkLookup {
            chunk,
            palette,
            resolver: &resolver,
            position: world,
        };
        let translated = translator.translate(&palette[old_index as usize], Some(&lookup))?;

        if let Some(block_entity) = &translated.block_entity {
            plan.block_entities.push(placed(block_entity, world));
        }
        plan.entities.extend(translated.entities);
        let new_index = plan.palette.get_or_add(translated.value);
        plan.overrides.push((position, new_index));
    }

    Ok(plan)
}

fn placed(block_entity: &BlockEntity, position: BlockPosition) -> BlockEntity {
    BlockEntity {
        position,
        ..block_entity.clone()
    }
}

/// The values around one voxel of a chunk, from before the chunk is translated.
struct ChunkLookup<'a, 'r> {
    chunk:    &'a Chunk,
    palette:  &'a [WorldValue],
    resolver: &'a RefCell<&'r mut dyn NeighborResolver>,
    position: BlockPosition,
}

impl BlockLookup for ChunkLookup<'_, '_> {
    #[inline]
    fn position(&self) -> BlockPosition {
        self.position
    }

    fn block_at(&self, offset: BlockOffset) -> Result<Option<Neighbor>, ResolveError> {
        let Some(target) = self.position.checked_offset(offset) else {
            return Ok(None);
        };
        let chunk_position = target.chunk_position();
        let local = target.in_chunk();

        if chunk_position == self.chunk.position {
            return Ok(neighbor_in(self.chunk, self.palette, local));
        }

        let mut resolver = self.resolver.borrow_mut();
        Ok(resolver
            .resolve(chunk_position)?
            .and_then(|neighbor| neighbor_in(&neighbor.chunk, &neighbor.palette, local)))
    }
}

fn neighbor_in(chunk: &Chunk, palette: &[WorldValue], position: BlockPosInChunk) -> Option<Neighbor> {
    let index = chunk.blocks.get(position)?;
    let value = palette.get(index as usize).inspect_none(|| {
        log::warn!(
            "{} refers to palette index {index} at ({}, {}, {}) within it, \
             but its palette has {} values",
            chunk.position,
            position.x,
            position.y,
            position.z,
            palette.len(),
        );
    })?;

    Some(Neighbor {
        value:        value.clone(),
        block_entity: chunk.block_entity_at(position).cloned(),
    })
}


#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use lodestone_mc_datatypes::{ChunkPosition, NamespacedIdentifier};

    use crate::chunk::{Biomes, BlockIndices, ChunkShapeError};
    use crate::datatypes::{Block, BlockEntityName, BlockState};
    use crate::resolver::NeighborChunk;
    use super::*;

    fn block(name: &str) -> WorldValue {
        WorldValue::from(BlockState::new(NamespacedIdentifier::minecraft(name)))
    }

    fn chunk_with(position: ChunkPosition, voxels: &[(u8, i32, u8, u32)]) -> Chunk {
        let mut blocks = BlockIndices::new(0, 4);
        for &(x, y, z, index) in voxels {
            blocks.set(BlockPosInChunk::new(x, y, z).unwrap(), index);
        }
        Chunk::new(position, blocks, Biomes::Empty).unwrap()
    }

    fn get(chunk: &Chunk, palette: &Palette, x: u8, y: i32, z: u8) -> WorldValue {
        let index = chunk.blocks.get(BlockPosInChunk::new(x, y, z).unwrap()).unwrap();
        palette.get(index).unwrap().clone()
    }

    fn as_translator<F>(translator: F) -> F
    where
        F: Fn(&WorldValue, Option<&dyn BlockLookup>) -> Result<ValueTranslation, TranslationError>,
    {
        translator
    }

    /// Renames `minecraft:x` to `universal_minecraft:x`; `fence` becomes `fence_connected` or
    /// `fence_alone` depending on whether there is a fence to its east.
    fn fence_translator(
        value:  &WorldValue,
        lookup: Option<&dyn BlockLookup>,
    ) -> Result<ValueTranslation, TranslationError> {
        let WorldValue::Block(block) = value else {
            return Ok(ValueTranslation::new(value.clone()));
        };
        let universal = |name: &str| WorldValue::from(BlockState::new(NamespacedIdentifier::universal(name)));

        if block.base_name() != "fence" {
            return Ok(ValueTranslation::new(universal(block.base_name())));
        }

        let east = match lookup {
            Some(lookup) => lookup.block_at(BlockOffset::EAST)?,
            None         => None,
        };
        let connected = east
            .as_ref()
            .and_then(Neighbor::block)
            .is_some_and(|east| east.base_name() == "fence");

        let mut translation = ValueTranslation::new(universal(if connected {
            "fence_connected"
        } else {
            "fence_alone"
        }));
        translation.context_dependent = true;
        Ok(translation)
    }

    #[test]
    fn disabled_pass_changes_nothing() {
        let mut chunk = chunk_with(ChunkPosition::new(0, 0), &[(0, 0, 0, 1)]);
        let original = chunk.clone();
        let output = translate_chunk(
            &mut chunk, &[block("air"), block("stone")], &fence_translator, None, false,
        );
        assert_eq!(output.unwrap(), None);
        assert_eq!(chunk, original);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut chunk = chunk_with(ChunkPosition::new(1, 0), &[(2, 3, 4, 5)]);
        let original = chunk.clone();

        let error = translate_chunk(&mut chunk, &[block("air")], &fence_translator, None, true)
            .unwrap_err();
        assert!(matches!(
            error,
            TranslationError::PaletteIndexOutOfRange { position, index: 5, palette_len: 1 }
                if position == BlockPosition::new(18, 3, 4),
        ));
        assert_eq!(chunk, original);
    }

    #[test]
    fn unrepresentable_chunk_is_rejected() {
        let far = ChunkPosition::new(i32::MAX / 8, 0);
        let mut chunk = chunk_with(ChunkPosition::new(0, 0), &[(15, 0, 0, 1)]);
        chunk.position = far;
        let original = chunk.clone();

        let mut neighbors = HashMap::new();
        let error = translate_chunk(
            &mut chunk, &[block("air"), block("fence")], &fence_translator, Some(&mut neighbors), true,
        )
        .unwrap_err();
        assert!(matches!(
            error,
            TranslationError::Shape(ChunkShapeError::Position(position)) if position == far,
        ));
        assert_eq!(chunk, original);
    }

    #[test]
    fn lookups_past_the_world_edge_find_nothing() {
        let palette = [block("air"), block("fence")];
        // The fence at x = 15 sits on the largest representable X coordinate.
        let mut chunk = chunk_with(ChunkPosition::new(i32::MAX / 16, 0), &[(15, 0, 0, 1)]);

        let mut neighbors = HashMap::new();
        let output = translate_chunk(
            &mut chunk, &palette, &fence_translator, Some(&mut neighbors), true,
        )
        .unwrap()
        .unwrap();

        assert_eq!(
            get(&chunk, &output.palette, 15, 0, 0),
            WorldValue::from(BlockState::new(NamespacedIdentifier::universal("fence_alone"))),
        );
    }

    #[test]
    fn translated_palette_is_deduplicated() {
        // Two raw entries which translate to the same value.
        let palette = [block("air"), block("stone"), block("stone")];
        let mut chunk = chunk_with(ChunkPosition::new(0, 0), &[(0, 0, 0, 1), (1, 0, 0, 2)]);

        let output = translate_chunk(&mut chunk, &palette, &fence_translator, None, true)
            .unwrap()
            .unwrap();

        assert_eq!(output.palette.len(), 2);
        let stone = output.palette.index_of(&WorldValue::from(BlockState::new(
            NamespacedIdentifier::universal("stone"),
        )));
        assert_eq!(chunk.blocks.get(BlockPosInChunk::new(0, 0, 0).unwrap()), stone);
        assert_eq!(chunk.blocks.get(BlockPosInChunk::new(1, 0, 0).unwrap()), stone);
        assert!(chunk.blocks.max_index().unwrap() < output.palette.len() as u32);
    }

    #[test]
    fn deferred_values_depend_on_neighbors() {
        let palette = [block("air"), block("fence")];
        // The fence at x = 15 has a neighbor to its east in the next chunk;
        // the fence at x = 3 does not.
        let mut chunk = chunk_with(ChunkPosition::new(0, 0), &[(3, 1, 0, 1), (15, 1, 0, 1)]);

        let east_position = ChunkPosition::new(1, 0);
        let mut neighbors = HashMap::new();
        neighbors.insert(
            east_position,
            NeighborChunk::new(chunk_with(east_position, &[(0, 1, 0, 1)]), palette.to_vec()),
        );

        let output = translate_chunk(
            &mut chunk, &palette, &fence_translator, Some(&mut neighbors), true,
        )
        .unwrap()
        .unwrap();

        let alone = get(&chunk, &output.palette, 3, 1, 0);
        let connected = get(&chunk, &output.palette, 15, 1, 0);
        assert_ne!(alone, connected);
        assert_eq!(
            connected,
            WorldValue::from(BlockState::new(NamespacedIdentifier::universal("fence_connected"))),
        );
    }

    #[test]
    fn without_resolver_context_free_result_is_used() {
        let palette = [block("air"), block("fence")];
        let mut chunk = chunk_with(ChunkPosition::new(0, 0), &[(3, 1, 0, 1), (4, 1, 0, 1)]);

        let output = translate_chunk(&mut chunk, &palette, &fence_translator, None, true)
            .unwrap()
            .unwrap();

        let alone = WorldValue::from(BlockState::new(NamespacedIdentifier::universal("fence_alone")));
        assert_eq!(get(&chunk, &output.palette, 3, 1, 0), alone);
        assert_eq!(get(&chunk, &output.palette, 4, 1, 0), alone);
    }

    #[test]
    fn resolver_unused_without_context_dependence() {
        let palette = [block("air"), block("stone"), block("dirt")];
        let voxels = [(0, 0, 0, 1), (15, 3, 15, 2), (7, 2, 1, 1)];
        let mut plain = chunk_with(ChunkPosition::new(-3, 2), &voxels);
        let mut with_resolver = plain.clone();

        let plain_output = translate_chunk(&mut plain, &palette, &fence_translator, None, true)
            .unwrap();
        let mut neighbors = HashMap::new();
        let resolver_output = translate_chunk(
            &mut with_resolver, &palette, &fence_translator, Some(&mut neighbors), true,
        )
        .unwrap();

        assert_eq!(plain, with_resolver);
        assert_eq!(plain_output, resolver_output);
    }

    #[test]
    fn per_voxel_results_are_applied_after_bulk_results() {
        // The stone becomes index 0 of the new palette and the first deferred fence becomes
        // index 1, which was the old index of the stone; the bulk substitution must not see
        // the fences' new indices.
        let palette = [block("fence"), block("stone")];
        let calls = AtomicUsize::new(0);
        let translator = as_translator(|value, lookup| {
            calls.fetch_add(1, Ordering::Relaxed);
            fence_translator(value, lookup)
        });

        let mut chunk = chunk_with(ChunkPosition::new(0, 0), &[(1, 0, 0, 1)]);
        let mut neighbors = HashMap::new();
        let output = translate_chunk(&mut chunk, &palette, &translator, Some(&mut neighbors), true)
            .unwrap()
            .unwrap();

        let universal = |name: &str| WorldValue::from(BlockState::new(NamespacedIdentifier::universal(name)));
        assert_eq!(output.palette.get(0), Some(&universal("stone")));
        assert_eq!(get(&chunk, &output.palette, 0, 0, 0), universal("fence_alone"));
        assert_eq!(get(&chunk, &output.palette, 1, 0, 0), universal("stone"));
        assert_eq!(get(&chunk, &output.palette, 2, 0, 0), universal("fence_connected"));
        // The eastern neighbor chunk does not exist.
        assert_eq!(get(&chunk, &output.palette, 15, 0, 0), universal("fence_alone"));

        // One context-free call per entry, then one call per fence voxel.
        assert_eq!(calls.load(Ordering::Relaxed), 2 + (16 * 16 * 4 - 1));
    }

    #[test]
    fn block_entities_are_placed_on_each_voxel() {
        let palette = [block("air"), block("chest")];
        let translator = as_translator(|value, _| {
            let mut translation = ValueTranslation::new(value.clone());
            if value == &block("chest") {
                translation.block_entity = Some(BlockEntity::new(
                    BlockEntityName::from(NamespacedIdentifier::universal("chest")),
                    BlockPosition::new(0, 0, 0),
                ));
            }
            Ok(translation)
        });

        let mut chunk = chunk_with(ChunkPosition::new(-1, 2), &[(0, 1, 0, 1), (15, 2, 3, 1)]);
        chunk.block_entities.push(BlockEntity::new(
            BlockEntityName::unnamespaced("Stale"),
            BlockPosition::new(0, 0, 0),
        ));
        translate_chunk(&mut chunk, &palette, &translator, None, true).unwrap();

        let positions: Vec<BlockPosition> = chunk
            .block_entities
            .iter()
            .map(|block_entity| block_entity.position)
            .collect();
        assert_eq!(positions, [BlockPosition::new(-16, 1, 32), BlockPosition::new(-1, 2, 35)]);
        assert!(
            chunk.block_entities
                .iter()
                .all(|block_entity| block_entity.position.chunk_position() == chunk.position),
        );
    }

    #[test]
    fn lookups_outside_vertical_extent_find_nothing() {
        let palette = [block("air")];
        let translator = as_translator(|value, lookup| {
            let mut translation = ValueTranslation::new(value.clone());
            translation.context_dependent = true;
            if let Some(lookup) = lookup {
                if lookup.position().y == 3 {
                    assert!(lookup.block_at(BlockOffset::ABOVE)?.is_none());
                }
                if lookup.position().y == 0 {
                    assert!(lookup.block_at(BlockOffset::BELOW)?.is_none());
                    assert!(lookup.block_at(BlockOffset::ABOVE)?.is_some());
                }
            }
            Ok(translation)
        });

        let mut chunk = chunk_with(ChunkPosition::new(0, 0), &[]);
        let mut neighbors = HashMap::new();
        translate_chunk(&mut chunk, &palette, &translator, Some(&mut neighbors), true).unwrap();
    }

    #[test]
    fn layered_neighbors_are_visible() {
        let waterlogged = WorldValue::Block(
            Block::new(BlockState::new(NamespacedIdentifier::minecraft("fence")))
                + Block::new(BlockState::new(NamespacedIdentifier::minecraft("water"))),
        );
        let palette = [block("air"), block("fence"), waterlogged.clone()];
        let seen = RefCell::new(Vec::new());
        let translator = as_translator(|value, lookup| {
            if let Some(lookup) = lookup {
                if let Some(neighbor) = lookup.block_at(BlockOffset::EAST)? {
                    seen.borrow_mut().push(neighbor.value);
                }
            }
            let mut translation = ValueTranslation::new(value.clone());
            translation.context_dependent = value == &block("fence");
            Ok(translation)
        });

        let mut chunk = chunk_with(ChunkPosition::new(0, 0), &[(0, 0, 0, 1), (1, 0, 0, 2)]);
        let mut neighbors = HashMap::new();
        translate_chunk(&mut chunk, &palette, &translator, Some(&mut neighbors), true).unwrap();

        assert_eq!(seen.into_inner(), [waterlogged]);
    }
}
