use crate::error::Result;
use crate::http::Endpoint;
use crate::image_paths::ImagePaths;
use crate::loader::{Loaded, VersionedObjectLoader};
use crate::object::{kinds, ApiObject};
use crate::versions::{VersionRegistry, Versions};
use cra_cache::{CacheConfig, CacheError, CacheKey, DirectoryCache, ResourceCache};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Cache-backed access to the API objects of one server.
///
/// Opening takes one network round trip to snapshot the server's [`VersionRegistry`]; every
/// later load consults the local object cache first.
#[derive(Debug)]
pub struct RestApi {
    endpoint: Endpoint,
    objects: DirectoryCache,
    images_root: PathBuf,
    registry: VersionRegistry,
}

impl RestApi {
    /// Opens the object cache and fetches the version registry.
    ///
    /// Fails only when the cache directory cannot be created or accessed; an unreachable
    /// server leaves the registry unavailable instead.
    pub fn open(
        endpoint: Endpoint,
        cache_config: &CacheConfig,
    ) -> std::result::Result<Self, CacheError> {
        let objects = DirectoryCache::open(cache_config.objects_dir()?)?;
        let images_root = cache_config.images_dir()?;
        let registry = VersionRegistry::fetch(&endpoint.loader::<Versions>(kinds::VERSIONS));
        Ok(Self::with_parts(endpoint, objects, images_root, registry))
    }

    pub fn with_parts(
        endpoint: Endpoint,
        objects: DirectoryCache,
        images_root: impl Into<PathBuf>,
        registry: VersionRegistry,
    ) -> Self {
        Self {
            endpoint,
            objects,
            images_root: images_root.into(),
            registry,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }

    pub fn object_cache(&self) -> &DirectoryCache {
        &self.objects
    }

    pub fn images_root(&self) -> &Path {
        &self.images_root
    }

    /// Loads the object published under `kind`, reporting why it failed.
    ///
    /// `T` must read back from the bincode object cache; a type that cannot (such as
    /// `serde_json::Value`) is still loaded but never cached. Use [`crate::JsonPayload`] for
    /// untyped JSON.
    pub fn try_load<T>(&self, kind: &str) -> Result<Loaded<ApiObject<T>>>
    where
        T: Serialize + DeserializeOwned,
    {
        let key = CacheKey::new(kind)?;
        let loader = self.endpoint.loader::<T>(kind);
        VersionedObjectLoader::new(&self.objects, &self.registry).load(&key, &loader)
    }

    /// Loads the object published under `kind`; `None` if it is neither cached nor fetchable.
    pub fn load<T>(&self, kind: &str) -> Option<Loaded<ApiObject<T>>>
    where
        T: Serialize + DeserializeOwned,
    {
        match self.try_load(kind) {
            Ok(loaded) => Some(loaded),
            Err(err) => {
                tracing::warn!(target: "cra.api", api = kind, error = %err, "no data for object");
                None
            }
        }
    }

    pub fn versions(&self) -> Option<Loaded<ApiObject<Versions>>> {
        self.load(kinds::VERSIONS)
    }

    pub fn image_paths(&self) -> Option<Loaded<ApiObject<ImagePaths>>> {
        self.load(kinds::IMAGE_PATHS)
    }

    /// The `image-paths` object narrowed to one client (`image-paths/<client_id>/`), cached
    /// under its own key and checked against the `image-paths` fingerprint.
    pub fn client_image_paths(&self, client_id: &str) -> Result<Loaded<ApiObject<ImagePaths>>> {
        let key = CacheKey::new(format!("{}-{client_id}", kinds::IMAGE_PATHS))?;
        let api_path = format!("{}/{client_id}", kinds::IMAGE_PATHS);
        let loader = self
            .endpoint
            .loader_at::<ImagePaths>(kinds::IMAGE_PATHS, &api_path);
        VersionedObjectLoader::new(&self.objects, &self.registry).load(&key, &loader)
    }

    /// The image cache for `client_id` (`images/<client_id>/image-paths/`).
    pub fn image_cache(&self, client_id: &str) -> std::result::Result<ResourceCache, CacheError> {
        ResourceCache::new(&self.images_root, client_id, kinds::IMAGE_PATHS)
    }

    /// Network locator of image `name` for `client_id`, if the server publishes a usable
    /// (relative or `http(s)://`) image path for that client.
    pub fn image_url(
        &self,
        image_paths: &ImagePaths,
        client_id: &str,
        name: &str,
    ) -> Option<String> {
        image_paths
            .for_client(client_id)
            .and_then(|entry| entry.locator(self.endpoint.base_url(), name))
    }

    /// Local path of image `name` for `client_id`, downloading it on first use.
    pub fn materialize_image(&self, client_id: &str, name: &str) -> Option<PathBuf> {
        let image_paths = self.image_paths()?.into_inner().api_obj;
        let Some(locator) = self.image_url(&image_paths, client_id, name) else {
            tracing::warn!(target: "cra.api", client_id, "no usable image path published for client");
            return None;
        };

        let resource = match CacheKey::new(name) {
            Ok(resource) => resource,
            Err(err) => {
                tracing::warn!(target: "cra.api", error = %err, "invalid image name");
                return None;
            }
        };
        let cache = match self.image_cache(client_id) {
            Ok(cache) => cache,
            Err(err) => {
                tracing::warn!(target: "cra.api", client_id, error = %err, "image cache unavailable");
                return None;
            }
        };

        cache.materialize_with_timeout(&resource, &locator, self.endpoint.timeout())
    }
}
