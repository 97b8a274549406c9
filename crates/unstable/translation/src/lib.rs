//! Translation of chunks between the representations used by different game versions,
//! through a single universal representation.
//!
//! A [`VersionProfile`] knows how to translate individual values of one version. The
//! [`ChunkTranslator`] uses profiles from a [`ProfileRegistry`] to translate whole chunks,
//! looking up neighboring chunks through a [`NeighborResolver`] when a block's translation
//! depends on its surroundings.

pub mod chunk;
pub mod datatypes;
pub mod engine;
pub mod palette;
pub mod profile;
pub mod registry;
pub mod resolver;

mod error;
mod translator;


pub use self::error::{TranslationError, TranslationStage};
pub use self::palette::{Palette, RawPaletteEntry};
pub use self::profile::{
    BlockEntityRenames, BlockLookup, BlockOrEntity, Neighbor, SingleTranslation, VersionProfile,
};
pub use self::registry::{ProfileRegistry, RegistryError};
pub use self::resolver::{ChunkSource, NeighborCache, NeighborChunk, NeighborResolver, ResolveError};
pub use self::translator::{
    ChunkTranslator, PackedChunk, TranslatedChunk, TranslationDirection, TranslationOptions,
    TranslationOutput, VersionLookup,
};
