use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors produced by cache directories, persistence and resource stores.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The cache root could not be created or accessed. Fatal for the cache instance.
    #[error("unable to create or access the cache directory {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to determine home directory for default cache path")]
    MissingHomeDir,

    #[error("invalid cache key {key:?}: {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("value cannot be restored from its cached encoding: {reason}")]
    NotRestorable { reason: String },

    #[error("cache entry {path} exceeds the {limit} byte payload limit")]
    PayloadTooLarge { path: PathBuf, limit: usize },

    #[error("http fetch failed: {message}")]
    Http { message: String },

    #[error("unsupported fetch URL {url}")]
    UnsupportedFetchUrl { url: String },
}

impl CacheError {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Unavailable {
            path: path.into(),
            source,
        }
    }
}
