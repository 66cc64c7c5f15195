// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed accessors for the documents under `state/`.
//!
//! The store is document-grained: each getter reads one file under a shared
//! advisory lock, each putter atomically replaces it under the exclusive
//! lock. Multi-step read-modify-write coordination is the engine's job.

use fm_core::{AgentRecord, Blocker, Bug, RetryEntry, Roles, Task};
use fm_storage::{doc, StorageError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const TASKS: &str = "tasks.json";
const BUGS: &str = "bugs.json";
const BLOCKERS: &str = "blockers.json";
const AGENTS: &str = "agents.json";
const CURSORS: &str = "event_cursors.json";
const ACKS: &str = "event_acks.json";
const ROLES: &str = "roles.json";
const CLAIM_OVERRIDES: &str = "claim_overrides.json";
const STALE_NOTICES: &str = "stale_notices.json";
const RETRY_QUEUE: &str = "report_retry_queue.json";

#[derive(Debug, Clone)]
pub struct StateDir {
    dir: PathBuf,
}

impl StateDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Target whose sibling lock file (`.state.lock`) is the coarse engine lock.
    pub fn coarse_lock_target(&self) -> PathBuf {
        self.path("state")
    }

    /// OS lock guarding the singleton auto-cycle daemon.
    pub fn auto_cycle_lock_path(&self) -> PathBuf {
        self.path(".manager_auto_cycle.lock")
    }

    /// Create any missing documents with their empty defaults.
    pub fn bootstrap(&self, roles: &Roles) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir)?;
        self.ensure::<Vec<Task>>(TASKS)?;
        self.ensure::<Vec<Bug>>(BUGS)?;
        self.ensure::<Vec<Blocker>>(BLOCKERS)?;
        self.ensure::<BTreeMap<String, AgentRecord>>(AGENTS)?;
        self.ensure::<BTreeMap<String, u64>>(CURSORS)?;
        self.ensure::<BTreeMap<String, Vec<String>>>(ACKS)?;
        self.ensure::<BTreeMap<String, String>>(CLAIM_OVERRIDES)?;
        self.ensure::<BTreeMap<String, String>>(STALE_NOTICES)?;
        self.ensure::<Vec<RetryEntry>>(RETRY_QUEUE)?;
        if self.roles()?.is_none() {
            self.put_roles(roles)?;
        }
        Ok(())
    }

    fn ensure<T: serde::Serialize + Default>(&self, name: &str) -> Result<(), StorageError> {
        let path = self.path(name);
        if !path.exists() {
            doc::write_json(&path, &T::default())?;
        }
        Ok(())
    }

    pub fn tasks(&self) -> Result<Vec<Task>, StorageError> {
        doc::read_json(&self.path(TASKS))
    }

    pub fn put_tasks(&self, tasks: &[Task]) -> Result<(), StorageError> {
        doc::write_json(&self.path(TASKS), &tasks)
    }

    pub fn bugs(&self) -> Result<Vec<Bug>, StorageError> {
        doc::read_json(&self.path(BUGS))
    }

    pub fn put_bugs(&self, bugs: &[Bug]) -> Result<(), StorageError> {
        doc::write_json(&self.path(BUGS), &bugs)
    }

    pub fn blockers(&self) -> Result<Vec<Blocker>, StorageError> {
        doc::read_json(&self.path(BLOCKERS))
    }

    pub fn put_blockers(&self, blockers: &[Blocker]) -> Result<(), StorageError> {
        doc::write_json(&self.path(BLOCKERS), &blockers)
    }

    pub fn agents(&self) -> Result<BTreeMap<String, AgentRecord>, StorageError> {
        doc::read_json(&self.path(AGENTS))
    }

    pub fn put_agents(
        &self,
        agents: &BTreeMap<String, AgentRecord>,
    ) -> Result<(), StorageError> {
        doc::write_json(&self.path(AGENTS), agents)
    }

    pub fn cursors(&self) -> Result<BTreeMap<String, u64>, StorageError> {
        doc::read_json(&self.path(CURSORS))
    }

    pub fn put_cursors(&self, cursors: &BTreeMap<String, u64>) -> Result<(), StorageError> {
        doc::write_json(&self.path(CURSORS), cursors)
    }

    pub fn acks(&self) -> Result<BTreeMap<String, Vec<String>>, StorageError> {
        doc::read_json(&self.path(ACKS))
    }

    pub fn put_acks(&self, acks: &BTreeMap<String, Vec<String>>) -> Result<(), StorageError> {
        doc::write_json(&self.path(ACKS), acks)
    }

    pub fn roles(&self) -> Result<Option<Roles>, StorageError> {
        doc::read_json_opt(&self.path(ROLES))
    }

    pub fn put_roles(&self, roles: &Roles) -> Result<(), StorageError> {
        doc::write_json(&self.path(ROLES), roles)
    }

    pub fn claim_overrides(&self) -> Result<BTreeMap<String, String>, StorageError> {
        doc::read_json(&self.path(CLAIM_OVERRIDES))
    }

    pub fn put_claim_overrides(
        &self,
        overrides: &BTreeMap<String, String>,
    ) -> Result<(), StorageError> {
        doc::write_json(&self.path(CLAIM_OVERRIDES), overrides)
    }

    pub fn stale_notices(&self) -> Result<BTreeMap<String, String>, StorageError> {
        doc::read_json(&self.path(STALE_NOTICES))
    }

    pub fn put_stale_notices(
        &self,
        notices: &BTreeMap<String, String>,
    ) -> Result<(), StorageError> {
        doc::write_json(&self.path(STALE_NOTICES), notices)
    }

    pub fn retry_queue(&self) -> Result<Vec<RetryEntry>, StorageError> {
        doc::read_json(&self.path(RETRY_QUEUE))
    }

    pub fn put_retry_queue(&self, queue: &[RetryEntry]) -> Result<(), StorageError> {
        doc::write_json(&self.path(RETRY_QUEUE), &queue)
    }
}
