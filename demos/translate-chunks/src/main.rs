use std::{fs, iter, thread};
use std::collections::{BTreeMap, HashMap};
use std::{path::Path, sync::{Mutex, PoisonError}};

use anyhow::{anyhow, Context as _};
use crossbeam::channel;
use serde::Deserialize;

use lodestone_mc_datatypes::{
    BlockPosInChunk, ChunkPosition, GameVersion, IdentifierParseOptions, NamespacedIdentifier,
};
use lodestone_util::LockOrPanic as _;

// Unstable
use lodestone_translation::{
    ChunkSource, ChunkTranslator, NeighborCache, NeighborChunk, NeighborResolver, Palette,
    ProfileRegistry, RawPaletteEntry, TranslationOptions, VersionLookup,
};
use lodestone_translation::chunk::{Biomes, BlockIndices, Chunk};
use lodestone_translation::datatypes::{
    BlockEntity, BlockEntityName, BlockProperty, BlockState, WorldValue,
};
use lodestone_translators::{MappingParseOptions, TableProfile};


const TRANSLATION_THREADS: usize = 3;

const WORLD_IDENTIFIERS: IdentifierParseOptions = IdentifierParseOptions {
    default_namespace:          Some("minecraft"),
    java_character_constraints: false,
};


/// Pass the path of a JSON world file, followed by the paths of the translation tables to use.
///
/// Every chunk of the world is translated to the universal representation and back, and the
/// number of voxels which did not survive the round trip is printed.
fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(world_path) = args.next() else {
        println!("Usage: translate-chunks <world.json> <table.json>...");
        return;
    };

    let mut registry = ProfileRegistry::new();
    for table_path in args {
        let registered = load_table(Path::new(&table_path))
            .and_then(|profile| Ok(registry.register(Box::new(profile))?));
        if let Err(err) = registered {
            println!("Skipping the table at {table_path}: {err:#}");
        }
    }

    let world = match WorldFile::open(Path::new(&world_path)) {
        Ok(world) => world,
        Err(err) => {
            println!("Could not open the world at {world_path}: {err:#}");
            return;
        }
    };
    println!("Opened {} chunks of {} at {world_path}", world.chunks.len(), world.version);

    match round_trip(&world, &registry) {
        Ok(stats) => println!(
            "Translated {} chunks ({} failed), producing {} entities; \
             {} voxels changed over the round trip",
            stats.translated,
            stats.failed,
            stats.produced_entities,
            stats.changed_voxels,
        ),
        Err(err) => println!("Could not translate {}: {err:#}", world.version),
    }
}

fn load_table(path: &Path) -> anyhow::Result<TableProfile> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("could not read {}", path.display()))?;
    Ok(TableProfile::from_json(&json, MappingParseOptions::default())?)
}

// ================================================================
//  Round trip
// ================================================================

#[derive(Debug, Default, Clone, Copy)]
struct Stats {
    translated:        usize,
    failed:            usize,
    produced_entities: usize,
    changed_voxels:    usize,
}

fn round_trip(world: &WorldFile, registry: &ProfileRegistry) -> anyhow::Result<Stats> {
    let translator = ChunkTranslator::with_options(registry, TranslationOptions {
        version_lookup: VersionLookup::Nearest,
        ..TranslationOptions::default()
    });
    // Fail early if no table can translate the world.
    registry.get_nearest(&world.version)?;
    let versioned = VersionedChunks {
        world,
        translator,
    };

    let stats = Mutex::new(Stats::default());
    let universal = Mutex::new(HashMap::new());

    // Neighbors of a chunk being translated to universal are read in the world's version.
    in_parallel(&world.chunks, &versioned, |cache, stored| {
        let position = stored.chunk.position;
        let mut chunk = stored.chunk.clone();
        let translated = translator.to_universal(
            &world.version,
            &mut chunk,
            stored.palette.clone(),
            Some(cache),
            true,
        );

        match translated {
            Ok(output) => {
                stats.lock_or_panic().produced_entities += output.entities.len();
                let palette = output.palette.into_values();
                universal.lock_or_panic().insert(position, NeighborChunk::new(chunk, palette));
            }
            Err(err) => {
                println!("Could not translate {position} to universal: {err}");
                stats.lock_or_panic().failed += 1;
            }
        }
    });

    let universal = universal.into_inner().unwrap_or_else(PoisonError::into_inner);
    let universal = UniversalChunks(&universal);

    let translated: Vec<_> = world
        .chunks
        .iter()
        .filter_map(|stored| Some((stored, universal.0.get(&stored.chunk.position)?)))
        .collect();

    // Neighbors of a universal chunk are themselves universal.
    in_parallel(&translated, &universal, |cache, &(stored, neighbor)| {
        let position = stored.chunk.position;
        let mut chunk = neighbor.chunk.clone();
        let palette: Palette = neighbor.palette.iter().cloned().collect();
        let packed = translator.from_universal(
            &world.version,
            &mut chunk,
            palette,
            Some(cache),
            true,
        );

        match packed {
            Ok(output) => {
                let changed = changed_voxels(stored, &chunk, &output.palette);
                if changed > 0 {
                    log::info!("{changed} voxels of {position} changed over the round trip");
                }

                let mut stats = stats.lock_or_panic();
                stats.translated += 1;
                stats.produced_entities += output.entities.len();
                stats.changed_voxels += changed;
            }
            Err(err) => {
                println!("Could not translate {position} from universal: {err}");
                stats.lock_or_panic().failed += 1;
            }
        }
    });

    Ok(stats.into_inner().unwrap_or_else(PoisonError::into_inner))
}

/// Run `task` on each of `items` across `TRANSLATION_THREADS` threads. Each thread keeps its
/// own neighbor cache over `source`.
fn in_parallel<'s, T, S, F>(items: &[T], source: &'s S, task: F)
where
    T: Sync,
    S: ChunkSource + Sync,
    F: Fn(&mut NeighborCache<'s, S>, &T) + Sync,
{
    let (item_sender, item_receiver) = channel::bounded(TRANSLATION_THREADS);

    thread::scope(|scope| {
        for _ in 0..TRANSLATION_THREADS {
            // Give type hint for the above channel creation
            let item_receiver: channel::Receiver<&T> = item_receiver.clone();
            let task = &task;

            scope.spawn(move || {
                let mut cache = NeighborCache::new(source);
                while let Ok(item) = item_receiver.recv() {
                    task(&mut cache, item);
                }
                log::debug!("a worker loaded {} neighboring chunks", cache.loaded_count());
            });
        }

        for item in items {
            if item_sender.send(item).is_err() {
                break;
            }
        }
        drop(item_sender);
    });
}

/// The number of voxels whose raw palette entry differs between `original` and the
/// round-tripped `chunk`.
fn changed_voxels(original: &StoredChunk, chunk: &Chunk, packed: &[RawPaletteEntry]) -> usize {
    original
        .chunk
        .blocks
        .iter()
        .filter(|&(pos, index)| {
            let before = original.palette.get(index as usize);
            let after = chunk
                .blocks
                .get(pos)
                .and_then(|index| packed.get(index as usize));
            before != after
        })
        .count()
}

// ================================================================
//  Chunk sources
// ================================================================

/// Chunks of the world in its own version, with their palettes unpacked and block entities
/// renamed the way `translator` renames those of the chunk being translated.
struct VersionedChunks<'a> {
    world:      &'a WorldFile,
    translator: ChunkTranslator<'a>,
}

impl ChunkSource for VersionedChunks<'_> {
    fn load(
        &self,
        position:  ChunkPosition,
        _resolver: &mut dyn NeighborResolver,
    ) -> anyhow::Result<Option<NeighborChunk>> {
        let Some(stored) = self.world.chunk(position) else {
            return Ok(None);
        };
        let neighbor = self.translator.prepare_neighbor(
            &self.world.version,
            stored.chunk.clone(),
            stored.palette.clone(),
        )?;
        Ok(Some(neighbor))
    }
}

/// Chunks which have already been translated to the universal representation.
struct UniversalChunks<'a>(&'a HashMap<ChunkPosition, NeighborChunk>);

impl ChunkSource for UniversalChunks<'_> {
    fn load(
        &self,
        position:  ChunkPosition,
        _resolver: &mut dyn NeighborResolver,
    ) -> anyhow::Result<Option<NeighborChunk>> {
        Ok(self.0.get(&position).cloned())
    }
}

// ================================================================
//  World files
// ================================================================

#[derive(Debug)]
struct WorldFile {
    version: GameVersion,
    chunks:  Vec<StoredChunk>,
}

#[derive(Debug)]
struct StoredChunk {
    chunk:   Chunk,
    palette: Vec<RawPaletteEntry>,
}

impl WorldFile {
    fn open(path: &Path) -> anyhow::Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("could not read {}", path.display()))?;
        let world: WorldJson = serde_json::from_str(&json)?;

        let chunks = world
            .chunks
            .into_iter()
            .map(|chunk| StoredChunk::parse(chunk, world.min_y, world.height))
            .collect::<anyhow::Result<_>>()?;

        Ok(Self {
            version: world.version.parse()?,
            chunks,
        })
    }

    fn chunk(&self, position: ChunkPosition) -> Option<&StoredChunk> {
        self.chunks.iter().find(|stored| stored.chunk.position == position)
    }
}

impl StoredChunk {
    fn parse(json: ChunkJson, min_y: i32, height: u32) -> anyhow::Result<Self> {
        let position = ChunkPosition::new(json.x, json.z);

        let mut indices = Vec::new();
        for (count, index) in json.blocks {
            indices.extend(iter::repeat_n(index, count));
        }
        let blocks = BlockIndices::from_indices(min_y, height, indices)
            .with_context(|| format!("invalid blocks in {position}"))?;

        let biomes = match json.biomes {
            None                           => Biomes::Empty,
            Some(BiomesJson::Columns(ids)) => Biomes::Columns(ids),
            Some(BiomesJson::Cells(ids))   => Biomes::Cells(ids),
        };
        let mut chunk = Chunk::new(position, blocks, biomes)
            .with_context(|| format!("invalid shape of {position}"))?;

        for block_entity in json.block_entities {
            let local = BlockPosInChunk::new(block_entity.x, block_entity.y, block_entity.z)
                .ok_or_else(|| anyhow!("a block entity in {position} is outside of its chunk"))?;
            let name = if block_entity.name.contains(':') {
                BlockEntityName::from(NamespacedIdentifier::parse(
                    &block_entity.name,
                    WORLD_IDENTIFIERS,
                )?)
            } else {
                BlockEntityName::unnamespaced(block_entity.name)
            };
            chunk.block_entities.push(BlockEntity::new(name, local.to_world(position)));
        }

        let palette = json
            .palette
            .into_iter()
            .map(PaletteEntryJson::into_raw)
            .collect::<anyhow::Result<_>>()?;

        Ok(Self { chunk, palette })
    }
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct WorldJson {
    version: String,
    #[serde(default)]
    min_y:   i32,
    height:  u32,
    chunks:  Vec<ChunkJson>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct ChunkJson {
    x:              i32,
    z:              i32,
    palette:        Vec<PaletteEntryJson>,
    /// Run-length encoded palette indices, as `[count, index]` pairs.
    blocks:         Vec<(usize, u32)>,
    #[serde(default)]
    biomes:         Option<BiomesJson>,
    #[serde(default)]
    block_entities: Vec<BlockEntityJson>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "snake_case")]
enum BiomesJson {
    Columns(Vec<u32>),
    Cells(Vec<u32>),
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum PaletteEntryJson {
    Numeric {
        id:   u16,
        data: u8,
    },
    Block {
        block:      String,
        #[serde(default)]
        properties: BTreeMap<String, String>,
    },
}

impl PaletteEntryJson {
    fn into_raw(self) -> anyhow::Result<RawPaletteEntry> {
        Ok(match self {
            Self::Numeric { id, data } => RawPaletteEntry::Numeric { id, data },
            Self::Block { block, properties } => {
                let properties = properties
                    .into_iter()
                    .map(|(name, value)| (name, BlockProperty::String(value)))
                    .collect();
                let identifier = NamespacedIdentifier::parse(&block, WORLD_IDENTIFIERS)?;
                RawPaletteEntry::Value(WorldValue::from(
                    BlockState::with_properties(identifier, properties),
                ))
            }
        })
    }
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct BlockEntityJson {
    name: String,
    x:    u8,
    y:    i32,
    z:    u8,
}
