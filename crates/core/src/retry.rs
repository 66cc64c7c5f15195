// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Retry queue entries for rejected completion reports.
//!
//! At most one pending entry exists per `(task_id, agent)` pair; a newer
//! report replaces the queued payload and resets the error.

use crate::report::Report;
use serde::{Deserialize, Serialize};
use std::fmt;

crate::id::id_type! {
    /// Retry-queue entry identifier (`RTY-<10 hex>`).
    RetryId, "RTY-"
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStatus {
    Pending,
    Submitted,
    Failed,
}

impl fmt::Display for RetryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Submitted => f.write_str("submitted"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// A rejected report awaiting re-submission with exponential backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryEntry {
    pub id: RetryId,
    pub status: RetryStatus,
    pub report: Report,
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    /// Entry is due once this timestamp is in the past
    pub next_retry_at: String,
}

impl RetryEntry {
    pub fn is_pending(&self) -> bool {
        self.status == RetryStatus::Pending
    }
}
