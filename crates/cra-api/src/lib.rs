//! Client for the CLS REST API with a version-checked local object cache.
//!
//! Objects are served from the on-disk cache when the server's version registry says they are
//! current (or when the registry could not be fetched), and reloaded over HTTP otherwise. See
//! [`VersionedObjectLoader`] for the exact decision order.

mod client;
mod error;
mod http;
mod image_paths;
mod loader;
mod object;
mod versions;

pub use client::RestApi;
pub use error::{ApiError, Result};
pub use http::{Endpoint, HttpLoader, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use image_paths::{ImagePath, ImagePaths};
pub use loader::{Loaded, Loader, Provenance, VersionedObjectLoader};
pub use object::{kinds, ApiObject, ApiVersion, DbgObj, JsonPayload, VersionSource};
pub use versions::{VersionRegistry, Versions};
