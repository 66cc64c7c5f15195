// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The bus directory: event log, audit log, and per-task command/report
//! projections.

use crate::doc::{self, StorageError};
use crate::jsonl::{AuditLog, EventLog};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// On-disk bus rooted at `<root>/bus`.
#[derive(Debug, Clone)]
pub struct Bus {
    events: EventLog,
    audit: AuditLog,
    commands_dir: PathBuf,
    reports_dir: PathBuf,
}

impl Bus {
    /// Open (and create) the bus directory structure.
    pub fn open(bus_dir: &Path) -> Result<Self, StorageError> {
        let commands_dir = bus_dir.join("commands");
        let reports_dir = bus_dir.join("reports");
        std::fs::create_dir_all(&commands_dir)?;
        std::fs::create_dir_all(&reports_dir)?;
        Ok(Self {
            events: EventLog::new(bus_dir.join("events.jsonl")),
            audit: AuditLog::new(bus_dir.join("audit.jsonl")),
            commands_dir,
            reports_dir,
        })
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Write the command projection for a newly created task.
    pub fn write_command<T: Serialize>(
        &self,
        task_id: &str,
        command: &T,
    ) -> Result<PathBuf, StorageError> {
        let path = self.commands_dir.join(format!("{task_id}.json"));
        doc::write_json(&path, command)?;
        Ok(path)
    }

    pub fn report_path(&self, task_id: &str) -> PathBuf {
        self.reports_dir.join(format!("{task_id}.json"))
    }

    /// Persist an accepted report.
    pub fn write_report<T: Serialize>(&self, task_id: &str, report: &T) -> Result<(), StorageError> {
        doc::write_json(&self.report_path(task_id), report)
    }

    /// Read a task's report file, `None` when no report was ever accepted.
    pub fn read_report<T: DeserializeOwned>(&self, task_id: &str) -> Result<Option<T>, StorageError> {
        doc::read_json_opt(&self.report_path(task_id))
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
