// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL logs with tolerant readers.
//!
//! One JSON record per line. Appends hold the exclusive sibling lock and
//! fsync before returning. Readers hold the shared lock, stream lines, and
//! skip malformed or truncated tails while still counting every raw line —
//! a partial write must never stall a reader, and logical indices must stay
//! aligned with lines on disk. The file is never repaired on read.

use crate::doc::StorageError;
use crate::lock::{lock, LockMode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// The append-only event log (`events.jsonl`).
#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single line: exclusive lock, write, fsync.
    pub fn append<T: Serialize>(&self, record: &T) -> Result<(), StorageError> {
        append_line(&self.path, record)
    }

    /// Number of raw lines in the log, measured under the shared lock.
    pub fn line_count(&self) -> Result<u64, StorageError> {
        let _guard = lock(&self.path, LockMode::Shared);
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(error) => return Err(error.into()),
        };
        let mut reader = BufReader::new(file);
        let mut count = 0u64;
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => count += 1,
                // Stop at a non-UTF-8 tail, exactly where read_from stops,
                // so cursors and counts agree.
                Err(error) if error.kind() == std::io::ErrorKind::InvalidData => break,
                Err(error) => return Err(error.into()),
            }
        }
        Ok(count)
    }

    /// Collect `(index, record)` pairs starting at line index `start`.
    ///
    /// Malformed lines are skipped with a warning but still advance the
    /// index, so consumers' cursors remain aligned with the raw file.
    pub fn read_from<T: DeserializeOwned>(
        &self,
        start: u64,
    ) -> Result<Vec<(u64, T)>, StorageError> {
        let _guard = lock(&self.path, LockMode::Shared);
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };

        let mut reader = BufReader::new(file);
        let mut records = Vec::new();
        let mut index = 0u64;
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(error) if error.kind() == std::io::ErrorKind::InvalidData => break,
                Err(error) => return Err(error.into()),
            }

            let current = index;
            index += 1;
            if current < start {
                continue;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<T>(trimmed) {
                Ok(record) => records.push((current, record)),
                Err(error) => {
                    warn!(
                        path = %self.path.display(),
                        index = current,
                        error = %error,
                        "skipping malformed event line",
                    );
                }
            }
        }
        Ok(records)
    }
}

/// The append-only audit log (`audit.jsonl`).
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append<T: Serialize>(&self, record: &T) -> Result<(), StorageError> {
        append_line(&self.path, record)
    }

    /// Tail read: the last `limit` records matching the optional `tool` and
    /// `status` predicates, oldest first.
    pub fn read_filtered(
        &self,
        limit: usize,
        tool: Option<&str>,
        status: Option<&str>,
    ) -> Result<Vec<serde_json::Value>, StorageError> {
        let _guard = lock(&self.path, LockMode::Shared);
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error.into()),
        };

        let mut reader = BufReader::new(file);
        let mut matched: Vec<serde_json::Value> = Vec::new();
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(error) if error.kind() == std::io::ErrorKind::InvalidData => break,
                Err(error) => return Err(error.into()),
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let record: serde_json::Value = match serde_json::from_str(trimmed) {
                Ok(record) => record,
                Err(_) => continue,
            };
            if let Some(tool) = tool {
                if record.get("tool").and_then(|v| v.as_str()) != Some(tool) {
                    continue;
                }
            }
            if let Some(status) = status {
                if record.get("status").and_then(|v| v.as_str()) != Some(status) {
                    continue;
                }
            }
            matched.push(record);
            // Bounded ring: keep only the newest `limit` records.
            if matched.len() > limit {
                matched.remove(0);
            }
        }
        Ok(matched)
    }
}

fn append_line<T: Serialize>(path: &Path, record: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _guard = lock(path, LockMode::Exclusive);
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(&line)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
#[path = "jsonl_tests.rs"]
mod tests;
