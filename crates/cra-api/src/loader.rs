use crate::error::Result;
use crate::object::VersionSource;
use crate::versions::VersionRegistry;
use cra_cache::{BincodePersister, CacheKey, DirectoryCache, Persister};

/// Produces a fresh object from the network: one round trip, one parse.
pub trait Loader {
    type Object;

    /// The object kind used to look up the server's current fingerprint.
    fn kind(&self) -> &str;

    fn load(&self) -> Result<Self::Object>;
}

/// Where a successfully loaded object came from. Diagnostics only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Provenance {
    FromCache,
    FromNetwork,
}

impl Provenance {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FromCache => "cache",
            Self::FromNetwork => "network",
        }
    }
}

/// A loaded object tagged with its [`Provenance`].
#[derive(Clone, Debug, PartialEq)]
pub struct Loaded<T> {
    pub value: T,
    pub provenance: Provenance,
}

impl<T> Loaded<T> {
    pub fn is_from_cache(&self) -> bool {
        self.provenance == Provenance::FromCache
    }

    pub fn is_from_network(&self) -> bool {
        self.provenance == Provenance::FromNetwork
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Serves objects from a [`DirectoryCache`], refreshing them from the network when they are
/// missing, unreadable, or older than what the [`VersionRegistry`] reports.
///
/// Per load:
/// 1. no cached file: fetch
/// 2. cached file does not restore: fetch
/// 3. registry unavailable: serve the cached copy
/// 4. registry fingerprint equals the cached one: serve the cached copy
/// 5. otherwise (different, or unknown to the registry): fetch
///
/// A fetch that succeeds is persisted back (best effort) and returned. A fetch that fails
/// returns the error and leaves whatever was cached untouched.
#[derive(Debug)]
pub struct VersionedObjectLoader<'a, P = BincodePersister> {
    cache: &'a DirectoryCache,
    registry: &'a VersionRegistry,
    persister: P,
}

impl<'a> VersionedObjectLoader<'a> {
    pub fn new(cache: &'a DirectoryCache, registry: &'a VersionRegistry) -> Self {
        Self::with_persister(cache, registry, BincodePersister)
    }
}

impl<'a, P> VersionedObjectLoader<'a, P> {
    pub fn with_persister(
        cache: &'a DirectoryCache,
        registry: &'a VersionRegistry,
        persister: P,
    ) -> Self {
        Self {
            cache,
            registry,
            persister,
        }
    }

    pub fn load<L>(&self, key: &CacheKey, loader: &L) -> Result<Loaded<L::Object>>
    where
        L: Loader,
        L::Object: VersionSource,
        P: Persister<L::Object>,
    {
        let kind = loader.kind();

        if !self.cache.exists(key) {
            tracing::debug!(target: "cra.api", api = kind, key = %key, "not in cache");
            return self.fetch_and_persist(key, loader);
        }

        let path = self.cache.resolve(key);
        let cached = match self.persister.restore(&path) {
            Ok(cached) => cached,
            Err(err) => {
                tracing::warn!(
                    target: "cra.api",
                    api = kind,
                    path = %path.display(),
                    error = %err,
                    "cached object failed to restore; reloading from network"
                );
                return self.fetch_and_persist(key, loader);
            }
        };

        if !self.registry.is_available() {
            tracing::debug!(
                target: "cra.api",
                api = kind,
                "version registry unavailable; serving cached object unchecked"
            );
            return Ok(Loaded {
                value: cached,
                provenance: Provenance::FromCache,
            });
        }

        match self.registry.lookup(kind) {
            Some(latest) if latest == cached.api_version() => {
                tracing::debug!(target: "cra.api", api = kind, version = %latest, "cache is current");
                Ok(Loaded {
                    value: cached,
                    provenance: Provenance::FromCache,
                })
            }
            Some(latest) => {
                tracing::info!(
                    target: "cra.api",
                    api = kind,
                    cached = %cached.api_version(),
                    latest = %latest,
                    "cached object is stale; reloading from network"
                );
                self.fetch_and_persist(key, loader)
            }
            None => {
                tracing::info!(
                    target: "cra.api",
                    api = kind,
                    "version registry has no entry for this object; reloading from network"
                );
                self.fetch_and_persist(key, loader)
            }
        }
    }

    fn fetch_and_persist<L>(&self, key: &CacheKey, loader: &L) -> Result<Loaded<L::Object>>
    where
        L: Loader,
        P: Persister<L::Object>,
    {
        let kind = loader.kind();
        let object = loader.load().map_err(|err| {
            tracing::warn!(target: "cra.api", api = kind, error = %err, "failed to load from network");
            err
        })?;

        let path = self.cache.resolve(key);
        match self.persister.persist(&object, &path) {
            Ok(()) => {
                tracing::debug!(target: "cra.api", api = kind, path = %path.display(), "cached object");
            }
            Err(err) => {
                tracing::warn!(
                    target: "cra.api",
                    api = kind,
                    path = %path.display(),
                    error = %err,
                    "failed to cache object; continuing with the loaded copy"
                );
            }
        }

        Ok(Loaded {
            value: object,
            provenance: Provenance::FromNetwork,
        })
    }
}
