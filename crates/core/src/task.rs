// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task record and lifecycle states.
//!
//! Tasks move `assigned → in_progress → reported → done` with branches into
//! `blocked` (open blocker), `bug_open` (failed validation), and
//! `duplicate_closed` (dedupe). Tasks are never deleted.

use serde::{Deserialize, Serialize};
use std::fmt;

crate::id::id_type! {
    /// Task identifier (`TASK-<10 hex>`).
    TaskId, "TASK-"
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Routed to an owner, waiting to be claimed
    Assigned,
    /// Claimed and being worked on
    InProgress,
    /// Waiting on a blocker resolution
    Blocked,
    /// Completion report submitted, awaiting validation
    Reported,
    /// Validation failed; a bug references this task
    BugOpen,
    /// Validated and closed
    Done,
    /// Closed as a duplicate of an older task
    DuplicateClosed,
}

impl TaskStatus {
    /// Open tasks participate in dedupe, reassignment, and the pending rollup.
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Done | Self::DuplicateClosed)
    }

    /// Statuses from which `claim_next` may pick a task up.
    pub fn is_claimable(self) -> bool {
        matches!(self, Self::Assigned | Self::BugOpen)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Reported => "reported",
            Self::BugOpen => "bug_open",
            Self::Done => "done",
            Self::DuplicateClosed => "duplicate_closed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workstream a task belongs to; drives policy-based owner routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Workstream {
    Backend,
    Frontend,
    Qa,
    Devops,
    Default,
}

impl Workstream {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::Frontend => "frontend",
            Self::Qa => "qa",
            Self::Devops => "devops",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for Workstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Workstream {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backend" => Ok(Self::Backend),
            "frontend" => Ok(Self::Frontend),
            "qa" => Ok(Self::Qa),
            "devops" => Ok(Self::Devops),
            "default" => Ok(Self::Default),
            other => Err(format!(
                "unknown workstream '{other}' (expected backend|frontend|qa|devops|default)"
            )),
        }
    }
}

/// A delegated unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub workstream: Workstream,
    pub owner: String,
    pub status: TaskStatus,
    pub acceptance_criteria: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
    /// Previous owner when the task was reassigned away from a stale agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reassigned_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reassigned_reason: Option<String>,
    /// Set when the owner was unreachable at a lifecycle transition
    #[serde(default, skip_serializing_if = "is_false")]
    pub degraded_comm: bool,
    /// Canonical task this one was closed as a duplicate of
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<TaskId>,
}

impl Task {
    /// Dedupe fingerprint for this task.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.owner, self.workstream, &self.title)
    }
}

/// Dedupe fingerprint: lowercased owner and workstream plus the
/// whitespace-collapsed, lowercased title.
pub fn fingerprint(owner: &str, workstream: Workstream, title: &str) -> String {
    let title = title
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    format!("{}|{}|{}", owner.to_lowercase(), workstream, title)
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
