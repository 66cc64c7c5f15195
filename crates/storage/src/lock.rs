// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory file locking on sibling `.<name>.lock` files.
//!
//! Thin portability layer over `fs2`: shared locks for readers, exclusive
//! locks for writers. Platforms or filesystems without advisory locking
//! degrade to lock-free operation after a single warning; correctness then
//! rests on atomic-replace writes alone.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// A held advisory lock. Dropping the guard releases it.
#[derive(Debug)]
pub struct LockGuard {
    file: Option<File>,
}

impl LockGuard {
    /// Whether a lock is actually held (false when locking degraded).
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
    }
}

static DEGRADED: AtomicBool = AtomicBool::new(false);

/// Sibling lock-file path for `target`: `dir/.name.lock`.
pub fn lock_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("state");
    target.with_file_name(format!(".{name}.lock"))
}

/// Acquire an advisory lock for `target`, creating the lock file as needed.
pub fn lock(target: &Path, mode: LockMode) -> LockGuard {
    let path = lock_path(target);
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let file = match OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)
    {
        Ok(file) => file,
        Err(error) => {
            warn_degraded(&path, &error);
            return LockGuard { file: None };
        }
    };

    let acquired = match mode {
        LockMode::Shared => file.lock_shared(),
        LockMode::Exclusive => file.lock_exclusive(),
    };
    if let Err(error) = acquired {
        warn_degraded(&path, &error);
        return LockGuard { file: None };
    }

    LockGuard { file: Some(file) }
}

/// Try to acquire an exclusive lock without blocking; `None` when another
/// holder exists. Used for singleton guards like the auto-cycle lock.
pub fn try_lock_exclusive(target: &Path) -> Option<File> {
    if let Some(parent) = target.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(target)
        .ok()?;
    file.try_lock_exclusive().ok()?;
    Some(file)
}

fn warn_degraded(path: &Path, error: &std::io::Error) {
    if !DEGRADED.swap(true, Ordering::Relaxed) {
        warn!(
            path = %path.display(),
            error = %error,
            "advisory file locking unavailable, continuing without locks",
        );
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
