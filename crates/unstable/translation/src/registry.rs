use std::collections::HashMap;

use thiserror::Error;

use lodestone_mc_datatypes::GameVersion;

use crate::profile::VersionProfile;


/// The version profiles available for translation, keyed by version.
#[derive(Default)]
pub struct ProfileRegistry {
    profiles: HashMap<GameVersion, Box<dyn VersionProfile>>,
}

impl ProfileRegistry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a profile for the version it reports, returning any profile it replaces.
    pub fn register(
        &mut self,
        profile: Box<dyn VersionProfile>,
    ) -> Result<Option<Box<dyn VersionProfile>>, RegistryError> {
        let version = profile.version().clone();
        if version.is_universal() {
            return Err(RegistryError::UniversalProfile);
        }
        log::debug!("registered a translation profile for {version}");
        Ok(self.profiles.insert(version, profile))
    }

    #[inline]
    pub fn contains(&self, version: &GameVersion) -> bool {
        self.profiles.contains_key(version)
    }

    /// The profile registered for exactly `version`.
    pub fn get(&self, version: &GameVersion) -> Result<&dyn VersionProfile, RegistryError> {
        self.profiles
            .get(version)
            .map(Box::as_ref)
            .ok_or_else(|| RegistryError::Missing(version.clone()))
    }

    /// The profile for the newest registered version of the same platform which is not newer
    /// than `version`; or, if every registered version of the platform is newer, the oldest
    /// of them.
    ///
    /// Versions with non-numeric names are only matched exactly.
    pub fn get_nearest(&self, version: &GameVersion) -> Result<&dyn VersionProfile, RegistryError> {
        if let Some(profile) = self.profiles.get(version) {
            return Ok(profile.as_ref());
        }

        let mut older: Option<(&GameVersion, &dyn VersionProfile)> = None;
        let mut newer: Option<(&GameVersion, &dyn VersionProfile)> = None;

        #[expect(clippy::iter_over_hash_type, reason = "only the extremes are kept")]
        for (candidate, profile) in &self.profiles {
            let Some(ordering) = candidate.partial_cmp(version) else {
                continue;
            };
            let slot = if ordering.is_lt() { &mut older } else { &mut newer };
            let replace = match slot {
                None => true,
                Some((best, _)) => {
                    if ordering.is_lt() { candidate > *best } else { candidate < *best }
                }
            };
            if replace {
                *slot = Some((candidate, profile.as_ref()));
            }
        }

        older
            .or(newer)
            .map(|(_, profile)| profile)
            .ok_or_else(|| RegistryError::Missing(version.clone()))
    }

    /// Every version with a registered profile, in no particular order.
    pub fn versions(&self) -> impl Iterator<Item = &GameVersion> {
        self.profiles.keys()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl std::fmt::Debug for ProfileRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileRegistry")
            .field("versions", &self.profiles.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no translation profile is registered for {0}")]
    Missing(GameVersion),
    #[error("the universal representation is translated to and from, and cannot have a profile")]
    UniversalProfile,
}


#[cfg(test)]
mod tests {
    use lodestone_mc_datatypes::VersionName;

    use crate::datatypes::BlockState;
    use crate::profile::{BlockLookup, SingleTranslation};
    use super::*;

    struct Identity(GameVersion);

    impl VersionProfile for Identity {
        fn version(&self) -> &GameVersion {
            &self.0
        }

        fn block_to_universal(
            &self,
            block:   &BlockState,
            _lookup: Option<&dyn BlockLookup>,
        ) -> anyhow::Result<SingleTranslation> {
            Ok(SingleTranslation::block(block.clone()))
        }

        fn block_from_universal(
            &self,
            block:   &BlockState,
            _lookup: Option<&dyn BlockLookup>,
        ) -> anyhow::Result<SingleTranslation> {
            Ok(SingleTranslation::block(block.clone()))
        }

        fn biome_to_universal(&self, biome: u32) -> anyhow::Result<u32> {
            Ok(biome)
        }

        fn biome_from_universal(&self, biome: u32) -> anyhow::Result<u32> {
            Ok(biome)
        }
    }

    fn registry(versions: &[GameVersion]) -> ProfileRegistry {
        let mut registry = ProfileRegistry::new();
        for version in versions {
            registry.register(Box::new(Identity(version.clone()))).unwrap();
        }
        registry
    }

    #[test]
    fn exact_lookup() {
        let registry = registry(&[GameVersion::java(1, 12, 2)]);
        assert!(registry.get(&GameVersion::java(1, 12, 2)).is_ok());
        assert!(matches!(
            registry.get(&GameVersion::java(1, 13, 0)),
            Err(RegistryError::Missing(_)),
        ));
    }

    #[test]
    fn nearest_prefers_older_versions() {
        let registry = registry(&[
            GameVersion::java(1, 12, 2),
            GameVersion::java(1, 16, 5),
            GameVersion::java(1, 20, 0),
            GameVersion::bedrock(1, 18, 0),
        ]);

        let nearest = |version: GameVersion| registry.get_nearest(&version).unwrap().version().clone();
        assert_eq!(nearest(GameVersion::java(1, 17, 1)), GameVersion::java(1, 16, 5));
        assert_eq!(nearest(GameVersion::java(1, 21, 0)), GameVersion::java(1, 20, 0));
        assert_eq!(nearest(GameVersion::java(1, 8, 9)), GameVersion::java(1, 12, 2));
        assert_eq!(nearest(GameVersion::bedrock(1, 20, 0)), GameVersion::bedrock(1, 18, 0));

        let snapshot = GameVersion::Java(VersionName::String("24w10a".to_owned()));
        assert!(registry.get_nearest(&snapshot).is_err());
    }

    #[test]
    fn universal_cannot_be_registered() {
        let mut registry = ProfileRegistry::new();
        assert!(matches!(
            registry.register(Box::new(Identity(GameVersion::Universal))),
            Err(RegistryError::UniversalProfile),
        ));
        assert!(registry.is_empty());
    }
}
