// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity verification and the same-project check.
//!
//! An agent is *operational* when its identity keys are populated and its
//! project context resolves inside the orchestrator root — freshness is not
//! required, so agents recover after downtime. Freshness matters only for
//! counting as connected in handshakes and for staleness decisions.

use super::{Engine, EngineError};
use fm_core::{AgentRecord, Clock};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Snapshot of one agent's identity standing.
#[derive(Debug, Clone, Serialize)]
pub struct Verification {
    pub identity_complete: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_identity: Vec<&'static str>,
    pub same_project: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_seconds: Option<i64>,
    /// Heartbeat within the timeout
    pub fresh: bool,
    /// `identity_complete && fresh`
    pub verified: bool,
    /// `identity_complete && same_project`; freshness not required
    pub operational: bool,
}

/// Per-agent diagnostic used by the connect handshake and the manager cycle.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectDiagnostic {
    pub agent: String,
    pub registered: bool,
    pub active: bool,
    pub verified: bool,
    pub same_project: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_seconds: Option<i64>,
    pub reason: String,
    pub open_tasks: usize,
}

impl ConnectDiagnostic {
    /// Connected for handshake purposes: reachable and trustworthy.
    pub fn is_connected(&self) -> bool {
        self.active && self.verified && self.same_project
    }
}

impl<C: Clock> Engine<C> {
    /// Whether the record's project context resolves inside this root.
    pub(crate) fn same_project(&self, record: &AgentRecord) -> bool {
        let root = canonical(self.root());
        if let Some(project_root) = record.meta_str("project_root") {
            if canonical(Path::new(project_root)) == root {
                return true;
            }
        }
        if let Some(cwd) = record.meta_str("cwd") {
            if canonical(Path::new(cwd)).starts_with(&root) {
                return true;
            }
        }
        false
    }

    /// Identity snapshot for one record against this engine's clock.
    pub(crate) fn verification(&self, record: &AgentRecord) -> Verification {
        let missing = record.missing_identity();
        let identity_complete = missing.is_empty();
        let same_project = self.same_project(record);
        let age_seconds = record
            .last_seen
            .as_deref()
            .and_then(|seen| self.age_seconds(seen));
        let fresh = matches!(age_seconds, Some(age) if age <= self.heartbeat_timeout_secs() as i64);
        Verification {
            identity_complete,
            missing_identity: missing,
            same_project,
            age_seconds,
            fresh,
            verified: identity_complete && fresh,
            operational: identity_complete && same_project,
        }
    }

    /// Gate for mutating operations: the caller must be registered with full
    /// identity inside this project.
    pub(crate) fn require_operational(
        &self,
        agents: &std::collections::BTreeMap<String, AgentRecord>,
        agent: &str,
    ) -> Result<(), EngineError> {
        let Some(record) = agents.get(agent) else {
            return Err(EngineError::NotOperational(format!(
                "agent '{agent}' is not registered"
            )));
        };
        let verification = self.verification(record);
        if !verification.operational {
            let detail = if !verification.identity_complete {
                format!(
                    "missing identity keys: {}",
                    verification.missing_identity.join(", ")
                )
            } else {
                "project context resolves outside the orchestrator root".to_string()
            };
            return Err(EngineError::NotOperational(format!(
                "agent '{agent}': {detail}"
            )));
        }
        Ok(())
    }

    /// Full diagnostic for one agent, with open-task count from `tasks`.
    pub(crate) fn diagnostic(
        &self,
        agents: &std::collections::BTreeMap<String, AgentRecord>,
        tasks: &[fm_core::Task],
        agent: &str,
        stale_after_secs: u64,
    ) -> ConnectDiagnostic {
        let open_tasks = tasks
            .iter()
            .filter(|task| task.owner == agent && task.status.is_open())
            .count();

        let Some(record) = agents.get(agent) else {
            return ConnectDiagnostic {
                agent: agent.to_string(),
                registered: false,
                active: false,
                verified: false,
                same_project: false,
                age_seconds: None,
                reason: "not_registered".to_string(),
                open_tasks,
            };
        };

        let verification = self.verification(record);
        let active =
            matches!(verification.age_seconds, Some(age) if age <= stale_after_secs as i64);
        let reason = if !verification.identity_complete {
            "identity_incomplete"
        } else if !verification.same_project {
            "wrong_project"
        } else if !active {
            "stale_heartbeat"
        } else {
            "ok"
        };
        ConnectDiagnostic {
            agent: agent.to_string(),
            registered: true,
            active,
            verified: verification.verified,
            same_project: verification.same_project,
            age_seconds: verification.age_seconds,
            reason: reason.to_string(),
            open_tasks,
        }
    }
}

/// Canonicalize with a lexical fallback for paths that do not exist.
fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
