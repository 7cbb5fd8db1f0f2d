use crate::error::{CacheError, Result};
use crate::key::CacheKey;
use crate::util::remove_file_best_effort;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Configuration for selecting the on-disk cache root.
#[derive(Clone, Debug, Default)]
pub struct CacheConfig {
    /// Override the global cache directory (`~/.cra/cache`).
    pub cache_root_override: Option<PathBuf>,
}

impl CacheConfig {
    pub fn cache_root(&self) -> Result<PathBuf> {
        match &self.cache_root_override {
            Some(root) => Ok(root.clone()),
            None => default_cache_root(),
        }
    }

    /// Namespace holding one serialized API object per key.
    pub fn objects_dir(&self) -> Result<PathBuf> {
        Ok(self.cache_root()?.join("objects"))
    }

    /// Namespace holding materialized images, scoped by client and object kind.
    pub fn images_dir(&self) -> Result<PathBuf> {
        Ok(self.cache_root()?.join("images"))
    }
}

pub(crate) fn default_cache_root() -> Result<PathBuf> {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .ok_or(CacheError::MissingHomeDir)?;

    Ok(home.join(".cra").join("cache"))
}

/// A filesystem directory that holds one file per [`CacheKey`].
///
/// The root exists as a directory for as long as the value lives; construction fails with
/// [`CacheError::Unavailable`] otherwise. [`DirectoryCache::remove_all`] consumes the cache
/// because it deletes the root itself.
#[derive(Clone, Debug)]
pub struct DirectoryCache {
    root: PathBuf,
}

impl DirectoryCache {
    /// Opens (creating if needed) the cache rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let requested = root.as_ref();
        let absolute = std::path::absolute(requested)
            .map_err(|err| CacheError::unavailable(requested, err))?;

        match std::fs::metadata(&absolute) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(CacheError::unavailable(
                    &absolute,
                    io::Error::new(io::ErrorKind::AlreadyExists, "path exists and is not a directory"),
                ));
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                std::fs::create_dir_all(&absolute)
                    .map_err(|err| CacheError::unavailable(&absolute, err))?;
            }
            Err(err) => return Err(CacheError::unavailable(&absolute, err)),
        }

        // Resolve symlinks and `..` once so every later containment check compares against
        // the real directory.
        let root = std::fs::canonicalize(&absolute)
            .map_err(|err| CacheError::unavailable(&absolute, err))?;
        // Listing proves the directory is accessible, not merely present.
        std::fs::read_dir(&root).map_err(|err| CacheError::unavailable(&root, err))?;

        tracing::debug!(target: "cra.cache", root = %root.display(), "opened cache directory");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The path `key` maps to. Pure; does not touch the filesystem.
    pub fn resolve(&self, key: &CacheKey) -> PathBuf {
        let path = self.root.join(key.as_str());
        debug_assert!(is_under_root(&self.root, &path), "{} escapes the cache root", key);
        path
    }

    /// Whether an item is stored under `key`. Never fails; a dangling symlink counts as present.
    pub fn exists(&self, key: &CacheKey) -> bool {
        std::fs::symlink_metadata(self.resolve(key)).is_ok()
    }

    /// Deletes the item stored under `key`.
    ///
    /// Returns `false` if nothing was there or the file could not be removed.
    pub fn remove_item(&self, key: &CacheKey) -> bool {
        let path = self.resolve(key);
        match std::fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_dir() => false,
            Ok(_) => match std::fs::remove_file(&path) {
                Ok(()) => true,
                Err(err) => {
                    if err.kind() != io::ErrorKind::NotFound {
                        tracing::debug!(
                            target: "cra.cache",
                            path = %path.display(),
                            error = %err,
                            "failed to remove cache item"
                        );
                    }
                    false
                }
            },
            Err(_) => false,
        }
    }

    /// Deletes everything below the root, keeping the root directory.
    ///
    /// Not atomic: on `false` some entries may already be gone.
    pub fn flush(&self) -> bool {
        let ok = remove_contents_nofollow(&self.root);
        tracing::debug!(target: "cra.cache", root = %self.root.display(), ok, "flushed cache");
        ok
    }

    /// Deletes everything below the root and then the root itself.
    pub fn remove_all(self) -> bool {
        if !remove_contents_nofollow(&self.root) {
            return false;
        }
        match std::fs::remove_dir(&self.root) {
            Ok(()) => true,
            Err(err) if err.kind() == io::ErrorKind::NotFound => true,
            Err(err) => {
                tracing::debug!(
                    target: "cra.cache",
                    root = %self.root.display(),
                    error = %err,
                    "failed to remove cache root"
                );
                false
            }
        }
    }

    /// Lists the keys currently stored directly under the root, sorted.
    ///
    /// Entries that are not valid keys (leftover temp files, nested directories) are skipped.
    pub fn keys(&self) -> Result<Vec<CacheKey>> {
        let mut keys = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if let Ok(key) = CacheKey::new(name) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Lexical check only; symlinks are never followed.
fn is_under_root(root: &Path, path: &Path) -> bool {
    match path.strip_prefix(root) {
        Ok(rest) => rest
            .components()
            .all(|component| matches!(component, Component::Normal(_))),
        Err(_) => false,
    }
}

/// Post-order delete of every entry below `root`: children before their parent directory,
/// symlinks removed as links. Keeps going after a failure so as much as possible is cleared.
fn remove_contents_nofollow(root: &Path) -> bool {
    let mut ok = true;
    let walker = walkdir::WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .contents_first(true);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let vanished = err
                    .io_error()
                    .is_some_and(|io_err| io_err.kind() == io::ErrorKind::NotFound);
                if !vanished {
                    tracing::debug!(
                        target: "cra.cache",
                        root = %root.display(),
                        error = %err,
                        "failed to walk cache directory"
                    );
                    ok = false;
                }
                continue;
            }
        };

        let path = entry.path();
        if !is_under_root(root, path) {
            tracing::warn!(
                target: "cra.cache",
                path = %path.display(),
                root = %root.display(),
                "refusing to delete path outside the cache root"
            );
            ok = false;
            continue;
        }

        if entry.file_type().is_dir() {
            match std::fs::remove_dir(path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    tracing::debug!(
                        target: "cra.cache",
                        path = %path.display(),
                        error = %err,
                        "failed to remove cache subdirectory"
                    );
                    ok = false;
                }
            }
        } else if !remove_file_best_effort(path, "flush") {
            ok = false;
        }
    }
    ok
}
