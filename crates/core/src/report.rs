// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Team-member delivery reports.

use crate::task::TaskId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Summary of the test run backing a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSummary {
    /// Exact test command run
    pub command: String,
    pub passed: u64,
    pub failed: u64,
}

/// Completion report submitted by a task owner.
///
/// `status` is free-form by convention (`done|blocked|needs_review`); only
/// `done` passes auto-validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub task_id: TaskId,
    pub agent: String,
    pub commit_sha: String,
    pub status: String,
    pub test_summary: TestSummary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("commit_sha must be a non-empty string")]
    EmptyCommitSha,
    #[error("test_summary.command must be a non-empty string")]
    EmptyTestCommand,
}

impl Report {
    /// Field-level checks beyond what deserialization enforces.
    pub fn validate(&self) -> Result<(), ReportError> {
        if self.commit_sha.trim().is_empty() {
            return Err(ReportError::EmptyCommitSha);
        }
        if self.test_summary.command.trim().is_empty() {
            return Err(ReportError::EmptyTestCommand);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
