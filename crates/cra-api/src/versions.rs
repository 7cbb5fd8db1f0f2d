use crate::loader::Loader;
use crate::object::{ApiObject, ApiVersion};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Payload of the `versions` object: the current fingerprint of every published object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versions {
    pub versions: Vec<ApiVersion>,
}

impl Versions {
    pub fn api_version(&self, kind: &str) -> Option<&ApiVersion> {
        self.versions.iter().find(|version| version.api_name == kind)
    }
}

/// Snapshot of the server's current fingerprints, taken once per process.
///
/// `Unavailable` means the snapshot could not be taken; staleness is then unknowable and cached
/// objects are trusted. It is distinct from an available snapshot that lacks a kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VersionRegistry {
    Available(BTreeMap<String, ApiVersion>),
    Unavailable,
}

impl VersionRegistry {
    /// One round trip through `loader`. Any failure yields [`VersionRegistry::Unavailable`].
    pub fn fetch<L>(loader: &L) -> Self
    where
        L: Loader<Object = ApiObject<Versions>>,
    {
        match loader.load() {
            Ok(object) => {
                let registry = Self::from_versions(&object.api_obj);
                tracing::debug!(
                    target: "cra.api",
                    kinds = registry.len(),
                    "fetched version registry"
                );
                registry
            }
            Err(err) => {
                tracing::warn!(
                    target: "cra.api",
                    error = %err,
                    "version registry unavailable; cached objects will not be checked for staleness"
                );
                Self::Unavailable
            }
        }
    }

    pub fn from_versions(versions: &Versions) -> Self {
        Self::Available(
            versions
                .versions
                .iter()
                .map(|version| (version.api_name.clone(), version.clone()))
                .collect(),
        )
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// The server's current fingerprint for `kind`, if the registry is available and knows it.
    pub fn lookup(&self, kind: &str) -> Option<&ApiVersion> {
        match self {
            Self::Available(versions) => versions.get(kind),
            Self::Unavailable => None,
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Available(versions) => versions.len(),
            Self::Unavailable => 0,
        }
    }
}
