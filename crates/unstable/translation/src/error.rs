use std::fmt::{self, Display, Formatter};

use thiserror::Error;

use lodestone_mc_datatypes::{BlockPosition, GameVersion};

use crate::{chunk::ChunkShapeError, registry::RegistryError, resolver::ResolveError};


/// The stage of translating a chunk during which a version profile failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationStage {
    UnpackPalette,
    PackPalette,
    Block,
    Entity,
    Biome,
}

impl Display for TranslationStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnpackPalette => "unpacking the palette",
            Self::PackPalette   => "packing the palette",
            Self::Block         => "translating a block",
            Self::Entity        => "translating an entity",
            Self::Biome         => "translating a biome",
        })
    }
}

/// Any error which aborts the translation of a chunk. The chunk is left unchanged.
#[derive(Error, Debug)]
pub enum TranslationError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(
        "the voxel at {position} refers to palette index {index}, \
         but the palette has {palette_len} values",
    )]
    PaletteIndexOutOfRange {
        position:    BlockPosition,
        index:       u32,
        palette_len: usize,
    },
    #[error("the {version} profile failed while {stage}: {error}")]
    Profile {
        version: GameVersion,
        stage:   TranslationStage,
        error:   anyhow::Error,
    },
    #[error("could not look up a neighboring block: {0}")]
    Neighbor(#[from] ResolveError),
    #[error(transparent)]
    Shape(#[from] ChunkShapeError),
}

impl TranslationError {
    /// Wrap an error returned by a profile. A [`ResolveError`] from a block lookup, which the
    /// profile propagated, becomes [`TranslationError::Neighbor`].
    pub fn from_profile(version: &GameVersion, stage: TranslationStage, error: anyhow::Error) -> Self {
        match error.downcast::<ResolveError>() {
            Ok(resolve_error) => Self::Neighbor(resolve_error),
            Err(error) => Self::Profile {
                version: version.clone(),
                stage,
                error,
            },
        }
    }
}
