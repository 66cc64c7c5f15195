// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent presence records.
//!
//! Agents are client processes identified by a stable short id (`codex`,
//! `claude_code`, `gemini`, …). Presence is a registry entry plus heartbeat
//! timestamps; identity lives in the metadata map and is verified against
//! [`IDENTITY_KEYS`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Metadata keys that must all be present (non-empty strings) for an agent's
/// identity to verify.
pub const IDENTITY_KEYS: [&str; 9] = [
    "client",
    "model",
    "cwd",
    "permissions_mode",
    "sandbox_mode",
    "session_id",
    "connection_id",
    "server_version",
    "verification_source",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Offline,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Offline => f.write_str("offline"),
        }
    }
}

/// Registry entry for one agent.
///
/// `metadata` stays an untyped JSON map: clients send heterogeneous identity
/// payloads and the recognized keys are read through [`AgentRecord::meta_str`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub agent: String,
    pub status: AgentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl AgentRecord {
    pub fn new(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            status: AgentStatus::Offline,
            last_seen: None,
            metadata: Map::new(),
        }
    }

    /// Non-empty string value for a metadata key.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        match self.metadata.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            _ => None,
        }
    }

    /// Identity keys that are absent or empty.
    pub fn missing_identity(&self) -> Vec<&'static str> {
        IDENTITY_KEYS
            .iter()
            .copied()
            .filter(|key| self.meta_str(key).is_none())
            .collect()
    }

    pub fn identity_complete(&self) -> bool {
        self.missing_identity().is_empty()
    }

    /// Shallow-merge a metadata patch (heartbeat semantics).
    pub fn merge_metadata(&mut self, patch: &Map<String, Value>) {
        for (key, value) in patch {
            self.metadata.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
