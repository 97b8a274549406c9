use std::collections::HashMap;
use std::{error::Error as StdError, hash::BuildHasher};

use thiserror::Error;

use lodestone_mc_datatypes::ChunkPosition;

use crate::{chunk::Chunk, datatypes::WorldValue, error::TranslationError};


/// A chunk read by a [`BlockLookup`](crate::profile::BlockLookup), along with the values its
/// voxel indices refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborChunk {
    pub chunk:   Chunk,
    pub palette: Vec<WorldValue>,
}

impl NeighborChunk {
    #[inline]
    pub fn new(chunk: Chunk, palette: Vec<WorldValue>) -> Self {
        Self { chunk, palette }
    }
}

/// Provides the chunks neighboring a chunk being translated.
pub trait NeighborResolver {
    /// Get the chunk at `position`, or `Ok(None)` if no chunk exists there.
    fn resolve(&mut self, position: ChunkPosition) -> Result<Option<&NeighborChunk>, ResolveError>;
}

impl<S: BuildHasher> NeighborResolver for HashMap<ChunkPosition, NeighborChunk, S> {
    #[inline]
    fn resolve(&mut self, position: ChunkPosition) -> Result<Option<&NeighborChunk>, ResolveError> {
        Ok(self.get(&position))
    }
}

/// Loads chunks on demand, for instance from a world's storage.
///
/// Loading a chunk may need to translate it, which may in turn need its own neighbors;
/// those should be requested from `resolver`.
pub trait ChunkSource {
    fn load(
        &self,
        position: ChunkPosition,
        resolver: &mut dyn NeighborResolver,
    ) -> anyhow::Result<Option<NeighborChunk>>;
}

/// A [`NeighborResolver`] which loads chunks from a [`ChunkSource`] at most once each.
///
/// A chunk requested again while it is still being loaded fails with [`ResolveError::Cycle`],
/// and nested loads deeper than `max_depth` fail with [`ResolveError::DepthExceeded`],
/// so that mutually dependent chunks cannot recurse forever.
#[derive(Debug)]
pub struct NeighborCache<'s, S: ?Sized> {
    source:    &'s S,
    loaded:    HashMap<ChunkPosition, Option<NeighborChunk>>,
    in_flight: Vec<ChunkPosition>,
    max_depth: usize,
}

impl<'s, S: ChunkSource + ?Sized> NeighborCache<'s, S> {
    pub const DEFAULT_MAX_DEPTH: usize = 8;

    #[inline]
    pub fn new(source: &'s S) -> Self {
        Self::with_max_depth(source, Self::DEFAULT_MAX_DEPTH)
    }

    #[inline]
    pub fn with_max_depth(source: &'s S, max_depth: usize) -> Self {
        Self {
            source,
            loaded:    HashMap::new(),
            in_flight: Vec::new(),
            max_depth,
        }
    }

    /// The number of chunk positions which have been loaded, including those with no chunk.
    #[inline]
    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    /// Take the loaded chunks out of the cache.
    pub fn into_loaded(self) -> HashMap<ChunkPosition, NeighborChunk> {
        self.loaded
            .into_iter()
            .filter_map(|(position, chunk)| Some((position, chunk?)))
            .collect()
    }
}

impl<S: ChunkSource + ?Sized> NeighborResolver for NeighborCache<'_, S> {
    fn resolve(&mut self, position: ChunkPosition) -> Result<Option<&NeighborChunk>, ResolveError> {
        if !self.loaded.contains_key(&position) {
            if self.in_flight.contains(&position) {
                return Err(ResolveError::Cycle {
                    position,
                    loading: self.in_flight.clone(),
                });
            }
            if self.in_flight.len() >= self.max_depth {
                return Err(ResolveError::DepthExceeded {
                    position,
                    max_depth: self.max_depth,
                });
            }

            log::trace!("loading neighbor {position}");
            self.in_flight.push(position);
            let source = self.source;
            let loaded = source.load(position, self);
            self.in_flight.pop();

            let chunk = loaded.map_err(|error| ResolveError::from_load(position, error))?;
            self.loaded.insert(position, chunk);
        }

        Ok(self.loaded.get(&position).and_then(Option::as_ref))
    }
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("{position} was requested while it was still being loaded (loading: {loading:?})")]
    Cycle {
        position: ChunkPosition,
        loading:  Vec<ChunkPosition>,
    },
    #[error("loading {position} would nest chunk loads more than {max_depth} deep")]
    DepthExceeded {
        position:  ChunkPosition,
        max_depth: usize,
    },
    #[error("could not load {position}")]
    Load {
        position: ChunkPosition,
        #[source]
        source:   Box<dyn StdError + Send + Sync>,
    },
}

impl ResolveError {
    /// Wrap an error from [`ChunkSource::load`]. If the load failed because one of its own
    /// neighbors could not be resolved, that inner failure is returned instead.
    pub fn from_load(position: ChunkPosition, error: anyhow::Error) -> Self {
        let error = match error.downcast::<Self>() {
            Ok(resolve_error) => return resolve_error,
            Err(error)        => error,
        };

        match error.downcast::<TranslationError>() {
            Ok(TranslationError::Neighbor(resolve_error)) => resolve_error,
            Ok(other) => Self::Load {
                position,
                source: Box::new(other),
            },
            Err(error) => Self::Load {
                position,
                source: error.into(),
            },
        }
    }
}


#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use crate::chunk::{Biomes, BlockIndices};
    use super::*;

    fn empty_chunk(position: ChunkPosition) -> NeighborChunk {
        let chunk = Chunk::new(position, BlockIndices::new(0, 1), Biomes::Empty).unwrap();
        NeighborChunk::new(chunk, Vec::new())
    }

    /// Every chunk with `x > 0` needs the chunk at `x - 1` to load; `dependency` picks the
    /// chunk that `x == 0` needs, if any.
    struct Chain {
        dependency: Option<ChunkPosition>,
        loads:      Cell<usize>,
    }

    impl ChunkSource for Chain {
        fn load(
            &self,
            position: ChunkPosition,
            resolver: &mut dyn NeighborResolver,
        ) -> anyhow::Result<Option<NeighborChunk>> {
            self.loads.set(self.loads.get() + 1);
            if position.x < 0 {
                return Ok(None);
            }
            let needed = if position.x == 0 {
                self.dependency
            } else {
                Some(ChunkPosition::new(position.x - 1, position.z))
            };
            if let Some(needed) = needed {
                resolver.resolve(needed)?;
            }
            Ok(Some(empty_chunk(position)))
        }
    }

    #[test]
    fn loads_each_chunk_once() {
        let source = Chain { dependency: None, loads: Cell::new(0) };
        let mut cache = NeighborCache::new(&source);

        assert!(cache.resolve(ChunkPosition::new(2, 0)).unwrap().is_some());
        assert_eq!(source.loads.get(), 3);

        assert!(cache.resolve(ChunkPosition::new(1, 0)).unwrap().is_some());
        assert!(cache.resolve(ChunkPosition::new(-1, 0)).unwrap().is_none());
        assert!(cache.resolve(ChunkPosition::new(-1, 0)).unwrap().is_none());
        assert_eq!(source.loads.get(), 4);
        assert_eq!(cache.loaded_count(), 4);
        assert_eq!(cache.into_loaded().len(), 3);
    }

    #[test]
    fn cycles_are_reported() {
        let source = Chain {
            dependency: Some(ChunkPosition::new(1, 0)),
            loads:      Cell::new(0),
        };
        let mut cache = NeighborCache::new(&source);

        let error = cache.resolve(ChunkPosition::new(1, 0)).unwrap_err();
        assert!(matches!(
            &error,
            ResolveError::Cycle { position, loading }
                if *position == ChunkPosition::new(1, 0) && loading.len() == 2,
        ));
    }

    #[test]
    fn depth_is_bounded() {
        let source = Chain { dependency: None, loads: Cell::new(0) };
        let mut cache = NeighborCache::with_max_depth(&source, 3);

        let error = cache.resolve(ChunkPosition::new(5, 0)).unwrap_err();
        assert!(matches!(error, ResolveError::DepthExceeded { max_depth: 3, .. }));

        let mut cache = NeighborCache::with_max_depth(&source, 3);
        assert!(cache.resolve(ChunkPosition::new(2, 0)).is_ok());
    }

    #[test]
    fn preloaded_neighbors() {
        let position = ChunkPosition::new(4, -2);
        let mut neighbors = HashMap::new();
        neighbors.insert(position, empty_chunk(position));

        assert!(neighbors.resolve(position).unwrap().is_some());
        assert!(neighbors.resolve(ChunkPosition::new(0, 0)).unwrap().is_none());
    }
}
