// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builders and fixtures shared by this crate's tests and, via the
//! `test-support` feature, by other crates' tests.

use crate::agent::IDENTITY_KEYS;
use crate::report::{Report, TestSummary};
use crate::task::{Task, TaskId, TaskStatus, Workstream};
use serde_json::{Map, Value};
use std::path::Path;

/// Complete identity metadata rooted at `project_root` — enough to pass
/// verification and the same-project check.
pub fn identity_metadata(project_root: &Path) -> Map<String, Value> {
    let mut metadata = Map::new();
    for key in IDENTITY_KEYS {
        let value = match key {
            "cwd" => project_root.display().to_string(),
            "client" => "test-client".to_string(),
            "model" => "test-model".to_string(),
            other => format!("test-{other}"),
        };
        metadata.insert(key.to_string(), Value::String(value));
    }
    metadata.insert(
        "project_root".to_string(),
        Value::String(project_root.display().to_string()),
    );
    metadata
}

/// Builder for [`Task`] records in tests.
pub struct TaskBuilder {
    title: String,
    workstream: Workstream,
    owner: String,
    status: TaskStatus,
    acceptance_criteria: Vec<String>,
}

impl TaskBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            workstream: Workstream::Default,
            owner: "claude_code".to_string(),
            status: TaskStatus::Assigned,
            acceptance_criteria: vec!["Tests pass".to_string()],
        }
    }

    pub fn workstream(mut self, workstream: Workstream) -> Self {
        self.workstream = workstream;
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self) -> Task {
        let now = "2026-01-01T00:00:00+00:00".to_string();
        Task {
            id: TaskId::new(),
            title: self.title,
            description: String::new(),
            workstream: self.workstream,
            owner: self.owner,
            status: self.status,
            acceptance_criteria: self.acceptance_criteria,
            created_at: now.clone(),
            updated_at: now,
            reassigned_from: None,
            reassigned_reason: None,
            degraded_comm: false,
            duplicate_of: None,
        }
    }
}

/// A well-formed report for `task_id` with the given failure count.
pub fn report_for(task_id: TaskId, agent: &str, failed: u64) -> Report {
    Report {
        task_id,
        agent: agent.to_string(),
        commit_sha: "abc1234".to_string(),
        status: if failed == 0 { "done" } else { "blocked" }.to_string(),
        test_summary: TestSummary {
            command: "cargo test".to_string(),
            passed: 3,
            failed,
        },
        artifacts: Vec::new(),
        notes: String::new(),
    }
}
