use crate::error::{CacheError, Result};
use crate::util::{atomic_write, bincode_deserialize, bincode_serialize, read_file_limited};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// Bumped whenever the on-disk envelope changes; older files then fail to restore and are
/// refetched.
pub const OBJECT_CACHE_SCHEMA_VERSION: u32 = 1;

/// Writes one value to a file and reads it back.
///
/// `restore(persist(v))` must yield a value equal to `v`. A failed `persist` must leave any
/// previous file at `path` intact.
pub trait Persister<T> {
    fn persist(&self, value: &T, path: &Path) -> Result<()>;

    fn restore(&self, path: &Path) -> Result<T>;
}

/// `serde` + `bincode` persistence with a schema-version header, written atomically.
///
/// Values whose `Deserialize` needs a self-describing format (`serde_json::Value`, untagged
/// enums) encode fine but cannot be decoded again; `persist` rejects them with
/// [`CacheError::NotRestorable`] before touching the disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodePersister;

#[derive(Serialize)]
struct PersistedObject<'a, T> {
    schema_version: u32,
    value: &'a T,
}

#[derive(Deserialize)]
struct PersistedObjectOwned<T> {
    schema_version: u32,
    value: T,
}

impl<T> Persister<T> for BincodePersister
where
    T: Serialize + DeserializeOwned,
{
    fn persist(&self, value: &T, path: &Path) -> Result<()> {
        let bytes = bincode_serialize(&PersistedObject {
            schema_version: OBJECT_CACHE_SCHEMA_VERSION,
            value,
        })?;
        if let Err(err) = bincode_deserialize::<PersistedObjectOwned<T>>(&bytes) {
            return Err(CacheError::NotRestorable {
                reason: err.to_string(),
            });
        }
        atomic_write(path, &bytes)
    }

    fn restore(&self, path: &Path) -> Result<T> {
        let bytes = read_file_limited(path)?;
        let persisted: PersistedObjectOwned<T> = bincode_deserialize(&bytes)?;
        if persisted.schema_version != OBJECT_CACHE_SCHEMA_VERSION {
            return Err(CacheError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "cache schema version {} does not match {}",
                    persisted.schema_version, OBJECT_CACHE_SCHEMA_VERSION
                ),
            )));
        }
        Ok(persisted.value)
    }
}
