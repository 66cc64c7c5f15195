// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validation-generated bug records.

use crate::task::TaskId;
use serde::{Deserialize, Serialize};
use std::fmt;

crate::id::id_type! {
    /// Bug identifier (`BUG-<10 hex>`).
    BugId, "BUG-"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BugStatus {
    Open,
    Closed,
}

impl fmt::Display for BugStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Closed => f.write_str("closed"),
        }
    }
}

/// Severity shared by bugs and blockers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => f.write_str("low"),
            Self::Medium => f.write_str("medium"),
            Self::High => f.write_str("high"),
        }
    }
}

/// A bug opened by a failed validation, tied to its source task.
///
/// Bugs close when the source task passes validation (or by leader action);
/// they are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bug {
    pub id: BugId,
    pub source_task: TaskId,
    pub owner: String,
    pub severity: Severity,
    pub repro_steps: String,
    pub expected: String,
    pub actual: String,
    pub status: BugStatus,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_note: Option<String>,
}
