use crate::cache_dir::DirectoryCache;
use crate::error::Result;
use crate::key::{validate_segment, CacheKey};
use crate::store::{redact_url, store_for_url_with, ResourceStore, DEFAULT_FETCH_TIMEOUT};
use crate::util::atomic_write_with;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Binary resources (images) for one client and object kind, laid out as
/// `<images_root>/<client_id>/<object_kind>/<resource_name>`.
///
/// Entries are never revalidated: once a name is materialized it is served from disk until it
/// is evicted or the cache is flushed.
#[derive(Clone, Debug)]
pub struct ResourceCache {
    dir: DirectoryCache,
    client_id: String,
    object_kind: String,
}

impl ResourceCache {
    pub fn new(images_root: impl AsRef<Path>, client_id: &str, object_kind: &str) -> Result<Self> {
        validate_segment(client_id)?;
        validate_segment(object_kind)?;
        let dir = DirectoryCache::open(images_root.as_ref().join(client_id).join(object_kind))?;
        Ok(Self {
            dir,
            client_id: client_id.to_owned(),
            object_kind: object_kind.to_owned(),
        })
    }

    pub fn directory(&self) -> &DirectoryCache {
        &self.dir
    }

    /// Where `resource_name` lives (or will live) on disk. No I/O.
    pub fn cache_path_for(&self, resource_name: &CacheKey) -> PathBuf {
        self.dir.resolve(resource_name)
    }

    /// Returns the local path of `resource_name`, downloading it from `locator` through `store`
    /// on a miss. `None` when the stream cannot be opened or the copy fails; a failed copy never
    /// leaves a file at [`Self::cache_path_for`].
    pub fn materialize(
        &self,
        resource_name: &CacheKey,
        locator: &str,
        store: &dyn ResourceStore,
    ) -> Option<PathBuf> {
        let path = self.cache_path_for(resource_name);
        if path.is_file() {
            tracing::trace!(
                target: "cra.cache",
                resource = %resource_name,
                path = %path.display(),
                "resource already cached"
            );
            return Some(path);
        }

        let mut reader = match store.open(locator) {
            Ok(reader) => reader,
            Err(err) => {
                tracing::warn!(
                    target: "cra.cache",
                    client_id = %self.client_id,
                    kind = %self.object_kind,
                    resource = %resource_name,
                    locator = %redact_url(locator),
                    error = %err,
                    "failed to open resource stream"
                );
                return None;
            }
        };

        let copied = atomic_write_with(&path, |file| {
            io::copy(&mut reader, file)?;
            Ok(())
        });
        // Release the network stream before reporting either outcome.
        drop(reader);

        match copied {
            Ok(()) => {
                tracing::debug!(
                    target: "cra.cache",
                    client_id = %self.client_id,
                    kind = %self.object_kind,
                    resource = %resource_name,
                    path = %path.display(),
                    "materialized resource"
                );
                Some(path)
            }
            Err(err) => {
                tracing::warn!(
                    target: "cra.cache",
                    client_id = %self.client_id,
                    kind = %self.object_kind,
                    resource = %resource_name,
                    locator = %redact_url(locator),
                    error = %err,
                    "failed to materialize resource"
                );
                None
            }
        }
    }

    /// [`Self::materialize`] with the store picked from `locator`'s scheme.
    pub fn materialize_with_default_store(
        &self,
        resource_name: &CacheKey,
        locator: &str,
    ) -> Option<PathBuf> {
        self.materialize_with_timeout(resource_name, locator, DEFAULT_FETCH_TIMEOUT)
    }

    /// [`Self::materialize_with_default_store`] with HTTP downloads bounded by `timeout`.
    pub fn materialize_with_timeout(
        &self,
        resource_name: &CacheKey,
        locator: &str,
        timeout: Duration,
    ) -> Option<PathBuf> {
        match store_for_url_with(locator, timeout) {
            Ok(store) => self.materialize(resource_name, locator, store.as_ref()),
            Err(err) => {
                tracing::warn!(
                    target: "cra.cache",
                    resource = %resource_name,
                    error = %err,
                    "no resource store for locator"
                );
                None
            }
        }
    }

    /// Forces the next [`Self::materialize`] of `resource_name` to download again.
    pub fn evict(&self, resource_name: &CacheKey) -> bool {
        self.dir.remove_item(resource_name)
    }

    pub fn flush(&self) -> bool {
        self.dir.flush()
    }
}
