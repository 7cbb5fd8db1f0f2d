use crate::error::CacheError;
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Upper bound for any serialized object we will read back from the cache.
///
/// A corrupted length prefix must degrade to a decode failure, not an
/// out-of-memory abort.
pub const PAYLOAD_LIMIT_BYTES: usize = 16 * 1024 * 1024;

pub(crate) fn bincode_options() -> impl bincode::Options + Copy {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
}

pub(crate) fn bincode_options_limited() -> impl bincode::Options + Copy {
    bincode_options().with_limit(PAYLOAD_LIMIT_BYTES as u64)
}

pub(crate) fn bincode_serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, CacheError> {
    Ok(bincode_options().serialize(value)?)
}

pub(crate) fn bincode_deserialize<T: for<'de> Deserialize<'de>>(
    bytes: &[u8],
) -> Result<T, CacheError> {
    Ok(bincode_options_limited().deserialize(bytes)?)
}

/// Reads a cache file without following symlinks and without reading more than
/// [`PAYLOAD_LIMIT_BYTES`].
pub(crate) fn read_file_limited(path: &Path) -> Result<Vec<u8>, CacheError> {
    let meta = fs::symlink_metadata(path)?;
    if meta.file_type().is_symlink() || !meta.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} is not a regular file", path.display()),
        )
        .into());
    }
    if meta.len() > PAYLOAD_LIMIT_BYTES as u64 {
        return Err(CacheError::PayloadTooLarge {
            path: path.to_path_buf(),
            limit: PAYLOAD_LIMIT_BYTES,
        });
    }

    let bytes = fs::read(path)?;
    if bytes.len() > PAYLOAD_LIMIT_BYTES {
        return Err(CacheError::PayloadTooLarge {
            path: path.to_path_buf(),
            limit: PAYLOAD_LIMIT_BYTES,
        });
    }
    Ok(bytes)
}

/// Removes a file, treating "already gone" as success.
pub(crate) fn remove_file_best_effort(path: &Path, reason: &'static str) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(err) if err.kind() == io::ErrorKind::NotFound => true,
        Err(err) => {
            tracing::debug!(
                target: "cra.cache",
                path = %path.display(),
                reason,
                error = %err,
                "failed to remove cache file"
            );
            false
        }
    }
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    atomic_write_with(path, |file| {
        file.write_all(bytes)?;
        Ok(())
    })
}

/// Writes `path` through a uniquely named sibling temp file that is renamed into place only
/// after `write` succeeded. On any failure the temp file is removed and `path` is untouched.
pub(crate) fn atomic_write_with(
    path: &Path,
    write: impl FnOnce(&mut fs::File) -> Result<(), CacheError>,
) -> Result<(), CacheError> {
    let Some(parent) = path.parent() else {
        return Err(io::Error::other("path has no parent").into());
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };

    fs::create_dir_all(parent)?;

    let (tmp_path, mut file) = open_unique_tmp_file(path, parent)?;
    let write_result = (|| -> Result<(), CacheError> {
        write(&mut file)?;
        file.sync_all()?;
        Ok(())
    })();
    drop(file);
    if let Err(err) = write_result {
        remove_file_best_effort(&tmp_path, "atomic_write_with.write_failed");
        return Err(err);
    }

    if let Err(err) = rename_replacing(&tmp_path, path) {
        remove_file_best_effort(&tmp_path, "atomic_write_with.rename_failed");
        return Err(err.into());
    }

    sync_dir_best_effort(parent);
    Ok(())
}

fn rename_replacing(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        // `rename` does not replace an existing destination on Windows.
        Err(err) if cfg!(windows) && (err.kind() == io::ErrorKind::AlreadyExists || to.exists()) => {
            match fs::remove_file(to) {
                Ok(()) => {}
                Err(remove_err) if remove_err.kind() == io::ErrorKind::NotFound => {}
                Err(remove_err) => return Err(remove_err),
            }
            fs::rename(from, to)
        }
        Err(err) => Err(err),
    }
}

fn sync_dir_best_effort(dir: &Path) {
    #[cfg(unix)]
    {
        static SYNC_DIR_ERROR_LOGGED: std::sync::OnceLock<()> = std::sync::OnceLock::new();
        if let Err(err) = fs::File::open(dir).and_then(|dir| dir.sync_all()) {
            if err.kind() != io::ErrorKind::NotFound && SYNC_DIR_ERROR_LOGGED.set(()).is_ok() {
                tracing::debug!(
                    target: "cra.cache",
                    dir = %dir.display(),
                    error = %err,
                    "failed to sync directory (best effort)"
                );
            }
        }
    }

    #[cfg(not(unix))]
    let _ = dir;
}

fn open_unique_tmp_file(dest: &Path, parent: &Path) -> io::Result<(PathBuf, fs::File)> {
    let file_name = dest
        .file_name()
        .ok_or_else(|| io::Error::other("destination path has no file name"))?;
    let pid = std::process::id();

    loop {
        let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(format!(".tmp.{pid}.{counter}"));
        let tmp_path = parent.join(tmp_name);

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(file) => return Ok((tmp_path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }
}
