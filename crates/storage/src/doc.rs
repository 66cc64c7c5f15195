// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic-replace JSON document store.
//!
//! Writes serialize to a temp file in the target's directory, flush + fsync,
//! rename over the target, then fsync the directory (best-effort). Readers
//! take the shared sibling lock, writers the exclusive one. Rendering is
//! stable: two-space indent, sorted map keys, trailing newline — re-writing
//! an unchanged document is byte-identical.

use crate::lock::{lock, LockMode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to replace {path}: {message}")]
    Replace { path: String, message: String },
}

/// Read a document, returning `T::default()` when the file is absent.
pub fn read_json<T>(path: &Path) -> Result<T, StorageError>
where
    T: DeserializeOwned + Default,
{
    Ok(read_json_opt(path)?.unwrap_or_default())
}

/// Read a document, returning `None` when the file is absent.
pub fn read_json_opt<T>(path: &Path) -> Result<Option<T>, StorageError>
where
    T: DeserializeOwned,
{
    let _guard = lock(path, LockMode::Shared);
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Atomically replace `path` with the stable rendering of `value`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let _guard = lock(path, LockMode::Exclusive);
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(to_stable_json(value)?.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|error| StorageError::Replace {
        path: path.display().to_string(),
        message: error.to_string(),
    })?;
    sync_dir(dir);
    Ok(())
}

/// Stable JSON rendering: pretty printed with a trailing newline.
/// Map keys sort because `serde_json::Map` is ordered.
pub fn to_stable_json<T: Serialize>(value: &T) -> Result<String, StorageError> {
    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');
    Ok(body)
}

fn sync_dir(dir: &Path) {
    if let Ok(handle) = std::fs::File::open(dir) {
        let _ = handle.sync_all();
    }
}

#[cfg(test)]
#[path = "doc_tests.rs"]
mod tests;
