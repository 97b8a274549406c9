use std::fmt;
use std::fmt::{Display, Formatter};

use thiserror::Error;


/// The namespace used by the universal representation every game version translates to and from.
pub const UNIVERSAL_NAMESPACE: &str = "universal_minecraft";
pub const MINECRAFT_NAMESPACE: &str = "minecraft";

/// The prefix reserved for universal namespaces.
///
/// Any block whose namespace starts with this prefix is considered to be in the universal
/// representation, and no version-specific block should use it.
pub const UNIVERSAL_PREFIX: &str = "universal";


/// Namespaced identifiers are also known as resource locations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NamespacedIdentifier {
    pub namespace: Box<str>,
    pub path:      Box<str>,
}

impl NamespacedIdentifier {
    #[inline]
    pub fn new<N: Into<Box<str>>, P: Into<Box<str>>>(namespace: N, path: P) -> Self {
        Self {
            namespace: namespace.into(),
            path:      path.into(),
        }
    }

    /// An identifier in the [`UNIVERSAL_NAMESPACE`].
    #[inline]
    pub fn universal<P: Into<Box<str>>>(path: P) -> Self {
        Self::new(UNIVERSAL_NAMESPACE, path)
    }

    /// An identifier in the [`MINECRAFT_NAMESPACE`].
    #[inline]
    pub fn minecraft<P: Into<Box<str>>>(path: P) -> Self {
        Self::new(MINECRAFT_NAMESPACE, path)
    }

    /// Whether the namespace starts with [`UNIVERSAL_PREFIX`].
    #[inline]
    pub fn is_universal(&self) -> bool {
        self.namespace.starts_with(UNIVERSAL_PREFIX)
    }

    /// Parse an identifier of the form `namespace:path`.
    ///
    /// If the `namespace:` part is missing, `opts.default_namespace` is used, or an error is
    /// returned if there is no default.
    pub fn parse(identifier: &str, opts: IdentifierParseOptions) -> Result<Self, IdentifierParseError> {
        let (namespace, path) = match identifier.split_once(':') {
            Some(split) => split,
            None => match opts.default_namespace {
                Some(namespace) => (namespace, identifier),
                None => return Err(IdentifierParseError::InvalidIdentifier(format!("\"{identifier}\""))),
            },
        };

        let invalid_namespace_char = if opts.java_character_constraints {
            namespace.chars().find(|&ch| !is_java_namespace_char(ch))
        } else {
            // The character constraints used by Bedrock are a lot looser
            namespace.chars().find(|&ch| ch == ':' || ch == '/')
        };
        if let Some(ch) = invalid_namespace_char {
            return Err(IdentifierParseError::InvalidNamespaceCharacter(identifier.to_owned(), ch));
        }

        let invalid_path_char = if opts.java_character_constraints {
            path.chars().find(|&ch| !is_java_namespace_char(ch) && ch != '/')
        } else {
            path.chars().find(|&ch| ch == ':')
        };
        if let Some(ch) = invalid_path_char {
            return Err(IdentifierParseError::InvalidPathCharacter(identifier.to_owned(), ch));
        }

        Ok(Self::new(namespace, path))
    }
}

#[inline]
fn is_java_namespace_char(ch: char) -> bool {
    ch.is_ascii_digit() || ch.is_ascii_lowercase() || matches!(ch, '_' | '-' | '.')
}

impl Display for NamespacedIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

/// Parse options for [`NamespacedIdentifier`]s, also known as Resource Locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierParseOptions {
    /// If `Some`, if the `namespace:` part of `namespace:path` is missing, assume
    /// that the namespace is this string. If this is `None` and a namespace is missing,
    /// an error is returned from appropriate functions.
    pub default_namespace:          Option<&'static str>,
    /// If true, use Java Edition's stricter restrictions for the characters
    /// which may appear in a [`NamespacedIdentifier`].
    pub java_character_constraints: bool,
}

impl Default for IdentifierParseOptions {
    /// Defaults to the strictest settings.
    #[inline]
    fn default() -> Self {
        Self {
            default_namespace:          None,
            java_character_constraints: true,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierParseError {
    #[error("expected a string identifier in the form \"namespace:path\", but received {0}")]
    InvalidIdentifier(String),
    #[error("invalid character '{1}' in the namespace of \"{0}\"")]
    InvalidNamespaceCharacter(String, char),
    #[error("invalid character '{1}' in the path of \"{0}\"")]
    InvalidPathCharacter(String, char),
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_with_and_without_namespace() {
        let strict = IdentifierParseOptions::default();
        let parsed = NamespacedIdentifier::parse("minecraft:oak_log", strict).unwrap();
        assert_eq!(parsed, NamespacedIdentifier::minecraft("oak_log"));
        assert_eq!(parsed.to_string(), "minecraft:oak_log");

        assert!(matches!(
            NamespacedIdentifier::parse("oak_log", strict),
            Err(IdentifierParseError::InvalidIdentifier(_)),
        ));

        let lenient = IdentifierParseOptions {
            default_namespace: Some(MINECRAFT_NAMESPACE),
            ..strict
        };
        assert_eq!(
            NamespacedIdentifier::parse("oak_log", lenient).unwrap(),
            NamespacedIdentifier::minecraft("oak_log"),
        );
    }

    #[test]
    fn character_constraints() {
        let java = IdentifierParseOptions::default();
        let bedrock = IdentifierParseOptions {
            java_character_constraints: false,
            ..java
        };

        assert_eq!(
            NamespacedIdentifier::parse("Minecraft:stone", java),
            Err(IdentifierParseError::InvalidNamespaceCharacter("Minecraft:stone".to_owned(), 'M')),
        );
        assert!(NamespacedIdentifier::parse("Minecraft:Stone", bedrock).is_ok());
        assert!(NamespacedIdentifier::parse("minecraft:a/b", java).is_ok());
        assert_eq!(
            NamespacedIdentifier::parse("minecraft:a:b", bedrock),
            Err(IdentifierParseError::InvalidPathCharacter("minecraft:a:b".to_owned(), ':')),
        );
    }

    #[test]
    fn universal_prefix() {
        assert!(NamespacedIdentifier::universal("stone").is_universal());
        assert!(!NamespacedIdentifier::minecraft("stone").is_universal());
    }
}
