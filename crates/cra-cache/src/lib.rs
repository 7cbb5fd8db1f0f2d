//! On-disk caches for the CLS REST API client.
//!
//! ## On-disk layout
//!
//! Everything lives under one cache root (`~/.cra/cache` unless overridden):
//! - `objects/<key>`:
//!   - one API object per [`CacheKey`], persisted by [`BincodePersister`]
//!     (`serde` + `bincode`, schema [`OBJECT_CACHE_SCHEMA_VERSION`])
//! - `images/<client_id>/<object_kind>/<resource_name>`:
//!   - raw bytes materialized by [`ResourceCache`]
//!
//! Every write goes through a sibling temp file plus rename, so readers only ever see a
//! complete file or no file.

mod cache_dir;
mod error;
mod key;
mod persist;
mod resource;
mod store;
mod util;

pub use cache_dir::{CacheConfig, DirectoryCache};
pub use error::{CacheError, Result};
pub use key::CacheKey;
pub use persist::{BincodePersister, Persister, OBJECT_CACHE_SCHEMA_VERSION};
pub use resource::ResourceCache;
pub use store::{
    redact_url, store_for_url, store_for_url_with, HttpStore, LocalStore, ResourceStore,
    DEFAULT_FETCH_TIMEOUT,
};
pub use util::{atomic_write, PAYLOAD_LIMIT_BYTES};
