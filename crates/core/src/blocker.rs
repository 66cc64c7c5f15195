// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blockers raised by task owners when they need an external decision.

use crate::bug::Severity;
use crate::task::TaskId;
use serde::{Deserialize, Serialize};
use std::fmt;

crate::id::id_type! {
    /// Blocker identifier (`BLK-<10 hex>`).
    BlockerId, "BLK-"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockerStatus {
    Open,
    Resolved,
}

impl fmt::Display for BlockerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Resolved => f.write_str("resolved"),
        }
    }
}

/// A structured question blocking a task.
///
/// The raising agent must own the task; the task sits in `blocked` until the
/// blocker is resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blocker {
    pub id: BlockerId,
    pub task_id: TaskId,
    pub agent: String,
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub severity: Severity,
    pub status: BlockerStatus,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,
}
