use crate::error::{CacheError, Result};
use std::fmt;
use std::path::Component;
use std::path::Path;

/// A logical name for one cached item.
///
/// A key is always exactly one path segment, so it maps to exactly one file directly under a
/// cache root and two distinct keys never resolve to the same path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_segment(&name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for CacheKey {
    type Error = CacheError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

/// Rejects anything that is not a single, plain path segment.
///
/// Also used for the client id / object kind segments of resource caches.
pub(crate) fn validate_segment(name: &str) -> Result<()> {
    let invalid = |reason| CacheError::InvalidKey {
        key: name.to_owned(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("empty"));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(invalid("contains a path separator or NUL"));
    }
    // Temp files written by `atomic_write` use this infix.
    if name.contains(".tmp.") {
        return Err(invalid("reserved temp-file infix"));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(invalid("not a plain file name")),
    }
}
