// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus event record and the event-type vocabulary.
//!
//! Events are immutable once appended. The `type` is a dotted string rather
//! than an enum because `publish_event` accepts caller-defined types; the
//! engine's own vocabulary lives in [`kinds`]. The payload stays an untyped
//! map — it is opaque to the bus except for the optional `audience` list.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

crate::id::id_type! {
    /// Event identifier (`EVT-<10 hex>`).
    EventId, "EVT-"
}

/// Source sentinel for engine-originated events.
pub const SOURCE_ORCHESTRATOR: &str = "orchestrator";
/// Source sentinel for governance artifacts (architecture decisions).
pub const SOURCE_GOVERNANCE: &str = "governance";

/// Audience wildcard: deliver to every agent.
pub const AUDIENCE_ALL: &str = "*";

/// One record in the append-only event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: EventId,
    /// RFC 3339 UTC timestamp
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Agent id, or one of the source sentinels
    pub source: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl Event {
    /// The payload's `audience` entries, when present.
    pub fn audience(&self) -> Option<Vec<&str>> {
        match self.payload.get("audience") {
            Some(Value::Array(items)) => {
                Some(items.iter().filter_map(Value::as_str).collect())
            }
            _ => None,
        }
    }

    /// Whether this event is delivered to `agent`: no audience means
    /// broadcast, otherwise the agent must be named or `*` present.
    pub fn delivers_to(&self, agent: &str) -> bool {
        match self.audience() {
            None => true,
            Some(audience) if audience.is_empty() => true,
            Some(audience) => {
                audience.iter().any(|a| *a == agent || *a == AUDIENCE_ALL)
            }
        }
    }
}

/// Event types emitted by the engine itself.
pub mod kinds {
    pub const BOOTSTRAPPED: &str = "orchestrator.bootstrapped";

    pub const TASK_ASSIGNED: &str = "task.assigned";
    pub const TASK_CLAIMED: &str = "task.claimed";
    pub const TASK_STATUS_CHANGED: &str = "task.status_changed";
    pub const TASK_REPORTED: &str = "task.reported";
    pub const TASK_REQUEUED: &str = "task.requeued";
    pub const TASK_REASSIGNED_STALE: &str = "task.reassigned_stale";
    pub const TASK_DUPLICATE_CLOSED: &str = "task.duplicate_closed";

    pub const VALIDATION_PASSED: &str = "validation.passed";
    pub const VALIDATION_FAILED: &str = "validation.failed";
    pub const BUG_CLOSED: &str = "bug.closed";

    pub const BLOCKER_RAISED: &str = "blocker.raised";
    pub const BLOCKER_RESOLVED: &str = "blocker.resolved";

    pub const AGENT_REGISTERED: &str = "agent.registered";
    pub const AGENT_HEARTBEAT: &str = "agent.heartbeat";
    pub const AGENT_STALE_RECONNECT: &str = "agent.stale_reconnect_required";

    pub const ROLE_UPDATED: &str = "role.updated";
    pub const EVENT_ACKED: &str = "event.acked";

    pub const MANAGER_CONNECT_TEAM_MEMBERS: &str = "manager.connect_team_members";
    pub const MANAGER_CONNECT_RESULT: &str = "manager.connect_team_members.result";
    pub const MANAGER_TASK_CONTRACTS: &str = "manager.task_contracts";
    pub const MANAGER_CLAIM_OVERRIDE: &str = "manager.claim_override";
    pub const MANAGER_PROJECT_CONTEXT_OVERRIDE: &str = "manager.project_context_override";

    pub const TEAM_MEMBER_CONNECTED: &str = "team_member.connected";
    pub const TEAM_MEMBER_DEGRADED_COMM: &str = "team_member.degraded_comm";

    pub const REPORT_RETRY_QUEUED: &str = "report.retry_queued";
    pub const REPORT_RETRY_SUBMITTED: &str = "report.retry_submitted";
    pub const REPORT_RETRY_FAILED: &str = "report.retry_failed";
    pub const REPORT_RETRY_RETRYING: &str = "report.retry_retrying";

    pub const ARCHITECTURE_DECIDED: &str = "architecture.decided";
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
