// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Policy document: role defaults, workstream routing, decision membership,
//! and trigger tuning.
//!
//! The policy is a JSON file selected via `ORCHESTRATOR_POLICY`. Every field
//! is optional; accessors clamp trigger values to their allowed ranges so a
//! hand-edited policy cannot put the engine into a pathological configuration.

use crate::task::Workstream;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Fallback manager agent when the policy names none.
pub const DEFAULT_MANAGER: &str = "codex";

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read policy {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse policy {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub name: String,
    /// Role name → agent id (`manager` is the one the engine reads)
    #[serde(default)]
    pub roles: BTreeMap<String, String>,
    /// Workstream name → owner agent id
    #[serde(default)]
    pub routing: BTreeMap<String, String>,
    #[serde(default)]
    pub decisions: DecisionPolicy,
    #[serde(default)]
    pub triggers: Triggers,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionPolicy {
    #[serde(default)]
    pub architecture: ArchitecturePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitecturePolicy {
    #[serde(default = "default_architecture_mode")]
    pub mode: String,
    #[serde(default)]
    pub members: Vec<String>,
}

impl Default for ArchitecturePolicy {
    fn default() -> Self {
        Self { mode: default_architecture_mode(), members: Vec::new() }
    }
}

fn default_architecture_mode() -> String {
    "consensus".to_string()
}

/// Trigger tuning knobs. Raw values; read them through the clamped
/// accessors on [`Policy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Triggers {
    #[serde(default = "default_heartbeat_timeout_minutes")]
    pub heartbeat_timeout_minutes: u64,
    #[serde(default = "default_true")]
    pub auto_validate_reports_on_submit: bool,
    #[serde(default = "default_retry_base_seconds")]
    pub report_retry_base_seconds: u64,
    #[serde(default = "default_retry_max_backoff_seconds")]
    pub report_retry_max_backoff_seconds: u64,
    #[serde(default = "default_retry_max_attempts")]
    pub report_retry_max_attempts: u32,
    #[serde(default = "default_connect_timeout_seconds")]
    pub manager_cycle_auto_connect_timeout_seconds: u64,
    #[serde(default = "default_connect_poll_seconds")]
    pub manager_cycle_auto_connect_poll_seconds: u64,
    #[serde(default = "default_stale_notice_cooldown_seconds")]
    pub stale_notice_cooldown_seconds: u64,
}

fn default_heartbeat_timeout_minutes() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_retry_base_seconds() -> u64 {
    15
}

fn default_retry_max_backoff_seconds() -> u64 {
    300
}

fn default_retry_max_attempts() -> u32 {
    20
}

fn default_connect_timeout_seconds() -> u64 {
    15
}

fn default_connect_poll_seconds() -> u64 {
    2
}

fn default_stale_notice_cooldown_seconds() -> u64 {
    300
}

impl Default for Triggers {
    fn default() -> Self {
        Self {
            heartbeat_timeout_minutes: default_heartbeat_timeout_minutes(),
            auto_validate_reports_on_submit: default_true(),
            report_retry_base_seconds: default_retry_base_seconds(),
            report_retry_max_backoff_seconds: default_retry_max_backoff_seconds(),
            report_retry_max_attempts: default_retry_max_attempts(),
            manager_cycle_auto_connect_timeout_seconds: default_connect_timeout_seconds(),
            manager_cycle_auto_connect_poll_seconds: default_connect_poll_seconds(),
            stale_notice_cooldown_seconds: default_stale_notice_cooldown_seconds(),
        }
    }
}

/// Clamped retry-queue tuning derived from policy triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryTuning {
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    pub max_attempts: u32,
}

impl Policy {
    /// Load a policy document from a JSON file.
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let raw = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut policy: Policy =
            serde_json::from_str(&raw).map_err(|source| PolicyError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        if policy.name.is_empty() {
            policy.name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("policy")
                .to_string();
        }
        Ok(policy)
    }

    /// The manager/leader agent named by the policy.
    pub fn manager(&self) -> &str {
        self.roles
            .get("manager")
            .map(String::as_str)
            .unwrap_or(DEFAULT_MANAGER)
    }

    /// Owner for a workstream: routing entry, then `default`, then manager.
    pub fn task_owner_for(&self, workstream: Workstream) -> String {
        self.routing
            .get(workstream.as_str())
            .or_else(|| self.routing.get("default"))
            .cloned()
            .unwrap_or_else(|| self.manager().to_string())
    }

    /// Heartbeat timeout: `heartbeat_timeout_minutes` (default 10), never
    /// below 60 seconds.
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs((self.triggers.heartbeat_timeout_minutes * 60).max(60))
    }

    pub fn auto_validate_on_submit(&self) -> bool {
        self.triggers.auto_validate_reports_on_submit
    }

    /// Retry tuning with the documented clamps: base 3–300 s, max backoff
    /// base–3600 s, attempts 1–100.
    pub fn retry_tuning(&self) -> RetryTuning {
        let base = self.triggers.report_retry_base_seconds.clamp(3, 300);
        let max = self
            .triggers
            .report_retry_max_backoff_seconds
            .clamp(base, 3600);
        RetryTuning {
            base_backoff: Duration::from_secs(base),
            max_backoff: Duration::from_secs(max),
            max_attempts: self.triggers.report_retry_max_attempts.clamp(1, 100),
        }
    }

    /// Auto-connect handshake timeout inside the manager cycle (5–60 s).
    pub fn cycle_connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.triggers
                .manager_cycle_auto_connect_timeout_seconds
                .clamp(5, 60),
        )
    }

    /// Auto-connect poll interval inside the manager cycle (1–10 s).
    pub fn cycle_connect_poll(&self) -> Duration {
        Duration::from_secs(
            self.triggers
                .manager_cycle_auto_connect_poll_seconds
                .clamp(1, 10),
        )
    }

    /// Stale-reconnect notice cooldown, at least 60 seconds.
    pub fn stale_notice_cooldown(&self) -> Duration {
        Duration::from_secs(self.triggers.stale_notice_cooldown_seconds.max(60))
    }

    pub fn architecture_mode(&self) -> &str {
        &self.decisions.architecture.mode
    }

    /// Agents entitled to vote on architecture decisions.
    pub fn voters(&self) -> Vec<String> {
        if !self.decisions.architecture.members.is_empty() {
            return self.decisions.architecture.members.clone();
        }
        // Default equal-rights trio.
        vec!["codex".to_string(), "claude_code".to_string(), "gemini".to_string()]
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
