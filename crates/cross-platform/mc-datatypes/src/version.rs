use std::{array, fmt};
use std::{cmp::Ordering, str::FromStr};
use std::fmt::{Display, Formatter};

use thiserror::Error;


/// Indicates a version of the game, which may have a different encoding for game data.
///
/// The textual form is `universal` or `platform:version`, such as `java:1.12.2`,
/// `bedrock:1.16.100.56`, or `java:1.20.4-rc1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GameVersion {
    Universal,
    Bedrock(VersionName),
    Java(VersionName),
    Other(String, VersionName),
}

impl GameVersion {
    #[inline]
    pub fn java(major: u32, minor: u32, patch: u32) -> Self {
        Self::Java(VersionName::numeric(major, minor, patch))
    }

    #[inline]
    pub fn bedrock(major: u32, minor: u32, patch: u32) -> Self {
        Self::Bedrock(VersionName::numeric(major, minor, patch))
    }

    /// The name of the platform, such as `"java"`. The universal representation
    /// is its own platform.
    pub fn platform(&self) -> &str {
        match self {
            Self::Universal      => "universal",
            Self::Bedrock(_)     => "bedrock",
            Self::Java(_)        => "java",
            Self::Other(name, _) => name,
        }
    }

    /// The version within the platform, or `None` for the universal representation.
    pub fn version_name(&self) -> Option<&VersionName> {
        match self {
            Self::Universal => None,
            Self::Bedrock(v) | Self::Java(v) | Self::Other(_, v) => Some(v),
        }
    }

    #[inline]
    pub fn is_universal(&self) -> bool {
        matches!(self, Self::Universal)
    }

    /// Whether `other` is on the same platform as `self`,
    /// in which case the two are comparable if their version names are numeric.
    #[inline]
    pub fn same_platform(&self, other: &Self) -> bool {
        self.platform() == other.platform()
    }
}

impl PartialOrd for GameVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        #[expect(clippy::match_same_arms, reason = "clarity")]
        match (self, other) {
            (Self::Universal,  Self::Universal)        => Some(Ordering::Equal),
            (Self::Bedrock(v), Self::Bedrock(other_v)) => v.partial_cmp(other_v),
            (Self::Java(v),    Self::Java(other_v))    => v.partial_cmp(other_v),
            (Self::Other(name, v), Self::Other(other_name, other_v)) if name == other_name => {
                v.partial_cmp(other_v)
            }
            _ => None,
        }
    }
}

impl Display for GameVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.version_name() {
            Some(version) => write!(f, "{}:{version}", self.platform()),
            None          => f.write_str(self.platform()),
        }
    }
}

impl FromStr for GameVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "universal" {
            return Ok(Self::Universal);
        }

        let (platform, version) = s
            .split_once(':')
            .ok_or_else(|| VersionParseError::MissingPlatform(s.to_owned()))?;
        if version.is_empty() {
            return Err(VersionParseError::EmptyVersion(s.to_owned()));
        }
        let version = VersionName::from(version.to_owned());

        Ok(match platform {
            "java"      => Self::Java(version),
            "bedrock"   => Self::Bedrock(version),
            "universal" => return Err(VersionParseError::VersionedUniversal(s.to_owned())),
            ""          => return Err(VersionParseError::MissingPlatform(s.to_owned())),
            other       => Self::Other(other.to_owned(), version),
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionParseError {
    #[error("expected a game version of the form \"platform:version\", but received \"{0}\"")]
    MissingPlatform(String),
    #[error("the game version \"{0}\" has an empty version")]
    EmptyVersion(String),
    #[error("the universal representation does not have versions, but received \"{0}\"")]
    VersionedUniversal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionName {
    Numeric(NumericVersion),
    String(String),
}

impl VersionName {
    #[inline]
    pub fn parse_numeric(version: &str) -> Option<Self> {
        NumericVersion::parse(version).map(Self::Numeric)
    }

    #[inline]
    pub fn numeric(major: u32, minor: u32, patch: u32) -> Self {
        Self::Numeric(NumericVersion(major, minor, patch, 0, 0))
    }
}

impl PartialOrd for VersionName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Numeric(version), Self::Numeric(other_version)) => {
                Some(version.cmp(other_version))
            }
            _ => None,
        }
    }
}

impl From<String> for VersionName {
    #[inline]
    fn from(version: String) -> Self {
        Self::parse_numeric(&version).unwrap_or(Self::String(version))
    }
}

impl Display for VersionName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            &Self::Numeric(numeric) => Display::fmt(&numeric, f),
            Self::String(string)    => Display::fmt(&string, f),
        }
    }
}

/// A type that should be able to describe numeric versions of Minecraft, such as
/// 1.21.0 (stored here as 1.21.0.0.0), as well as edge cases like 1.16.100.56 in Bedrock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NumericVersion(pub u32, pub u32, pub u32, pub u32, pub u32);

impl NumericVersion {
    /// Parse a string into a numeric version.
    ///
    /// Note that the first component is always the major
    /// version, so "1.0" is parsed the same as "1.0.0" and not "0.1.0".
    /// A single component, such as "1", is assumed to be a mistake
    /// and returns `None`. Additionally, parsing `"1."` will return `None`,
    /// as it is split into `"1"` and `""`, and the latter cannot be parsed into a number.
    pub fn parse(version: &str) -> Option<Self> {
        let mut components = version.split('.');

        let nums: [Option<u32>; 5] = array::from_fn(|idx| match components.next() {
            Some(component) => component.parse().ok(),
            // A missing first or second component means we got "" or something like "1"
            None if idx <= 1 => None,
            None => Some(0),
        });

        if components.next().is_some() {
            // There were more than 5 version components
            return None;
        }

        Some(Self(nums[0]?, nums[1]?, nums[2]?, nums[3]?, nums[4]?))
    }
}

impl Display for NumericVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // Only show the fourth or fifth components if necessary.
        match (self.3 == 0, self.4 == 0) {
            (true, true)  => write!(f, "{}.{}.{}",       self.0, self.1, self.2),
            (false, true) => write!(f, "{}.{}.{}.{}",    self.0, self.1, self.2, self.3),
            (_, false)    => write!(f, "{}.{}.{}.{}.{}", self.0, self.1, self.2, self.3, self.4),
        }
    }
}

impl From<[u32; 3]> for NumericVersion {
    #[inline]
    fn from(value: [u32; 3]) -> Self {
        Self(value[0], value[1], value[2], 0, 0)
    }
}

impl From<[u32; 5]> for NumericVersion {
    #[inline]
    fn from(value: [u32; 5]) -> Self {
        Self(value[0], value[1], value[2], value[3], value[4])
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_parsing() {
        assert_eq!(NumericVersion::parse("1.12.2"), Some(NumericVersion(1, 12, 2, 0, 0)));
        assert_eq!(NumericVersion::parse("1.0"), Some(NumericVersion(1, 0, 0, 0, 0)));
        assert_eq!(NumericVersion::parse("1.16.100.56"), Some(NumericVersion(1, 16, 100, 56, 0)));
        assert_eq!(NumericVersion::parse("1"), None);
        assert_eq!(NumericVersion::parse("1."), None);
        assert_eq!(NumericVersion::parse("1.2.3.4.5.6"), None);
        assert_eq!(NumericVersion(1, 16, 100, 56, 0).to_string(), "1.16.100.56");
    }

    #[test]
    fn game_version_text_round_trip() {
        for text in ["universal", "java:1.12.2", "bedrock:1.16.100.56", "java:1.20.4-rc1", "pe:0.9.0"] {
            let version = text.parse::<GameVersion>().unwrap();
            assert_eq!(version.to_string(), text);
        }

        assert_eq!("java:1.12.2".parse::<GameVersion>(), Ok(GameVersion::java(1, 12, 2)));
        assert!(matches!(
            "pe:0.9.0".parse::<GameVersion>(),
            Ok(GameVersion::Other(name, _)) if name == "pe",
        ));
    }

    #[test]
    fn game_version_parse_errors() {
        assert!(matches!("1.12.2".parse::<GameVersion>(), Err(VersionParseError::MissingPlatform(_))));
        assert!(matches!("java:".parse::<GameVersion>(), Err(VersionParseError::EmptyVersion(_))));
        assert!(matches!(
            "universal:1.0.0".parse::<GameVersion>(),
            Err(VersionParseError::VersionedUniversal(_)),
        ));
    }

    #[test]
    fn ordering_only_within_platform() {
        let old = GameVersion::java(1, 12, 2);
        let new = GameVersion::java(1, 20, 0);
        assert!(old < new);
        assert_eq!(old.partial_cmp(&GameVersion::bedrock(1, 12, 2)), None);
        assert_eq!(
            GameVersion::Java(VersionName::String("snapshot".to_owned())).partial_cmp(&old),
            None,
        );
    }
}
