//! Version profiles for the `lodestone-translation` crate.

#[cfg(feature = "json_tables")]
pub mod table;


#[cfg(feature = "json_tables")]
pub use self::table::{MappingParseError, MappingParseOptions, TableProfile};
