// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process view of the on-disk bus.
//!
//! Wraps [`fm_storage::Bus`] with a `Notify` so long-poll waiters wake
//! immediately on same-process appends. Cross-process producers are covered
//! by a ~100 ms timed fallback; a spurious wake returning no new events is
//! allowed by the contract.

use fm_core::Event;
use fm_storage::StorageError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Fallback poll cadence while waiting for new events.
const POLL_TICK: Duration = Duration::from_millis(100);

#[derive(Clone)]
pub struct EventBus {
    inner: Arc<fm_storage::Bus>,
    appended: Arc<Notify>,
}

impl EventBus {
    pub fn open(bus_dir: &Path) -> Result<Self, StorageError> {
        Ok(Self {
            inner: Arc::new(fm_storage::Bus::open(bus_dir)?),
            appended: Arc::new(Notify::new()),
        })
    }

    /// Append one event (exclusive lock, fsync) and wake waiters.
    pub fn emit(&self, event: &Event) -> Result<(), StorageError> {
        self.inner.events().append(event)?;
        self.appended.notify_waiters();
        Ok(())
    }

    /// Raw line count of the event log.
    pub fn event_count(&self) -> Result<u64, StorageError> {
        self.inner.events().line_count()
    }

    /// Events from logical line index `start`, malformed lines skipped.
    pub fn events_from(&self, start: u64) -> Result<Vec<(u64, Event)>, StorageError> {
        self.inner.events().read_from(start)
    }

    /// Wait until the log holds strictly more than `start` lines or the
    /// timeout elapses. Returns the observed line count. No lock is held
    /// while waiting; the count is measured under the shared lock.
    pub async fn wait_for_index(
        &self,
        start: u64,
        timeout: Duration,
    ) -> Result<u64, StorageError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let count = self.event_count()?;
            if count > start {
                return Ok(count);
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(count);
            }
            let tick = POLL_TICK.min(deadline - now);
            tokio::select! {
                _ = self.appended.notified() => {}
                _ = tokio::time::sleep(tick) => {}
            }
        }
    }

    pub fn append_audit<T: Serialize>(&self, record: &T) -> Result<(), StorageError> {
        self.inner.audit().append(record)
    }

    pub fn read_audit(
        &self,
        limit: usize,
        tool: Option<&str>,
        status: Option<&str>,
    ) -> Result<Vec<serde_json::Value>, StorageError> {
        self.inner.audit().read_filtered(limit, tool, status)
    }

    pub fn write_command<T: Serialize>(
        &self,
        task_id: &str,
        command: &T,
    ) -> Result<PathBuf, StorageError> {
        self.inner.write_command(task_id, command)
    }

    pub fn write_report<T: Serialize>(
        &self,
        task_id: &str,
        report: &T,
    ) -> Result<(), StorageError> {
        self.inner.write_report(task_id, report)
    }

    pub fn read_report<T: DeserializeOwned>(
        &self,
        task_id: &str,
    ) -> Result<Option<T>, StorageError> {
        self.inner.read_report(task_id)
    }

    pub fn report_path(&self, task_id: &str) -> PathBuf {
        self.inner.report_path(task_id)
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
