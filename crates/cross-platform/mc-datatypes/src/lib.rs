//! Datatypes shared by every game version Lodestone translates between.

#[cfg(feature = "identifier")]
pub mod identifier;
#[cfg(feature = "positions")]
pub mod positions;
#[cfg(feature = "version")]
pub mod version;


#[cfg(feature = "identifier")]
pub use self::identifier::{
    IdentifierParseError, IdentifierParseOptions, NamespacedIdentifier,
    MINECRAFT_NAMESPACE, UNIVERSAL_NAMESPACE, UNIVERSAL_PREFIX,
};
#[cfg(feature = "positions")]
pub use self::positions::{
    BlockOffset, BlockPosInChunk, BlockPosition, ChunkPosition, FloatingWorldPos, CHUNK_WIDTH,
};
#[cfg(feature = "version")]
pub use self::version::{GameVersion, NumericVersion, VersionName, VersionParseError};
