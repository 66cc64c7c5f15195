// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent presence: registry, heartbeats, listing, discovery, and the
//! connect handshakes.

use super::identity::{ConnectDiagnostic, Verification};
use super::{payload_of, Engine, EngineError};
use fm_core::event::kinds;
use fm_core::{AgentRecord, AgentStatus, Clock, Task, TaskStatus};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Per-status task tallies for one agent.
#[derive(Debug, Clone, Serialize)]
pub struct TaskCounts {
    pub assigned: usize,
    pub in_progress: usize,
    pub blocked: usize,
    pub done: usize,
}

/// One row of `list_agents` output.
#[derive(Debug, Clone, Serialize)]
pub struct AgentView {
    pub agent: String,
    pub status: AgentStatus,
    pub age_seconds: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    pub verification: Verification,
    pub task_counts: TaskCounts,
    pub metadata: Map<String, Value>,
}

/// `discover_agents` result: registered plus inferred names.
#[derive(Debug, Serialize)]
pub struct DiscoveredAgents {
    pub registered_count: usize,
    pub inferred_only_count: usize,
    pub agents: Vec<Value>,
}

/// Verification report returned by `connect_to_leader`.
#[derive(Debug, Serialize)]
pub struct ConnectReport {
    pub connected: bool,
    pub agent: String,
    pub manager: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub verification: Verification,
    pub entry: AgentRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_claimed: Option<Task>,
    pub next: Vec<String>,
}

/// Outcome of the leader's `connect_team_members` handshake.
#[derive(Debug, Serialize)]
pub struct ConnectOutcome {
    pub status: String,
    pub requested: Vec<String>,
    pub connected: Vec<String>,
    pub missing: Vec<String>,
    pub diagnostics: BTreeMap<String, ConnectDiagnostic>,
    pub timeout_seconds: u64,
    pub elapsed_seconds: u64,
}

impl<C: Clock> Engine<C> {
    /// Register (or re-register) an agent, merging new metadata into the
    /// record. Re-registering with a partial payload never erases identity
    /// keys established earlier.
    pub fn register_agent(
        &self,
        agent: &str,
        metadata: Map<String, Value>,
    ) -> Result<AgentRecord, EngineError> {
        let agent = agent.trim();
        if agent.is_empty() {
            return Err(EngineError::Validation(
                "agent must be a non-empty id".to_string(),
            ));
        }

        let _state = self.lock_state();
        let mut agents = self.state().agents()?;
        let entry = agents
            .entry(agent.to_string())
            .or_insert_with(|| AgentRecord::new(agent));
        entry.merge_metadata(&metadata);
        entry.status = AgentStatus::Active;
        entry.last_seen = Some(self.now_iso());
        let snapshot = entry.clone();
        self.state().put_agents(&agents)?;

        self.emit(
            kinds::AGENT_REGISTERED,
            agent,
            payload_of(json!({"agent": agent, "metadata": &snapshot.metadata})),
        )?;
        Ok(snapshot)
    }

    /// Refresh an agent's heartbeat, shallow-merging any metadata updates.
    pub fn heartbeat(
        &self,
        agent: &str,
        metadata: Map<String, Value>,
    ) -> Result<AgentRecord, EngineError> {
        let _state = self.lock_state();
        let mut agents = self.state().agents()?;
        let entry = agents
            .entry(agent.to_string())
            .or_insert_with(|| AgentRecord::new(agent));
        entry.merge_metadata(&metadata);
        entry.status = AgentStatus::Active;
        entry.last_seen = Some(self.now_iso());
        let snapshot = entry.clone();
        self.state().put_agents(&agents)?;

        self.emit(kinds::AGENT_HEARTBEAT, agent, payload_of(json!({"agent": agent})))?;
        Ok(snapshot)
    }

    /// Silent presence refresh used by mutating task/bug/blocker operations.
    /// Caller holds the state lock and writes the agents document.
    pub(crate) fn touch(&self, agents: &mut BTreeMap<String, AgentRecord>, agent: &str) {
        let entry = agents
            .entry(agent.to_string())
            .or_insert_with(|| AgentRecord::new(agent));
        entry.status = AgentStatus::Active;
        entry.last_seen = Some(self.now_iso());
    }

    /// List registered agents with computed status, identity details, and
    /// task tallies. With `notify_stale`, agents past the heartbeat timeout
    /// trigger an `agent.stale_reconnect_required` event at most once per
    /// cooldown window.
    pub fn list_agents(
        &self,
        active_only: bool,
        stale_after_secs: Option<u64>,
        notify_stale: bool,
    ) -> Result<Vec<AgentView>, EngineError> {
        let stale_after = stale_after_secs.unwrap_or_else(|| self.heartbeat_timeout_secs());
        let heartbeat_timeout = self.heartbeat_timeout_secs() as i64;
        let cooldown = self.policy().stale_notice_cooldown().as_secs() as i64;
        let leader = self.leader()?;

        let _state = self.lock_state();
        let mut agents = self.state().agents()?;
        let tasks = self.state().tasks()?;
        let mut notices = self.state().stale_notices()?;
        let mut agents_changed = false;
        let mut notices_changed = false;
        let mut views = Vec::new();

        for (name, record) in agents.iter_mut() {
            let age = record
                .last_seen
                .as_deref()
                .and_then(|seen| self.age_seconds(seen))
                .unwrap_or(stale_after as i64 + 1);

            let computed = if age <= stale_after as i64 {
                AgentStatus::Active
            } else {
                AgentStatus::Offline
            };
            if record.status != computed {
                record.status = computed;
                agents_changed = true;
            }

            if notify_stale && age > heartbeat_timeout {
                let due = match notices.get(name).and_then(|at| self.age_seconds(at)) {
                    Some(since_notice) => since_notice >= cooldown,
                    None => true,
                };
                if due {
                    notices.insert(name.clone(), self.now_iso());
                    notices_changed = true;
                    self.emit(
                        kinds::AGENT_STALE_RECONNECT,
                        fm_core::SOURCE_ORCHESTRATOR,
                        payload_of(json!({
                            "agent": name,
                            "age_seconds": age.max(0),
                            "heartbeat_timeout_seconds": heartbeat_timeout,
                            "audience": [name, &leader],
                        })),
                    )?;
                }
            }

            if active_only && record.status != AgentStatus::Active {
                continue;
            }

            views.push(self.agent_view(record, &tasks, age.max(0)));
        }

        if agents_changed {
            self.state().put_agents(&agents)?;
        }
        if notices_changed {
            self.state().put_stale_notices(&notices)?;
        }
        Ok(views)
    }

    fn agent_view(&self, record: &AgentRecord, tasks: &[Task], age: i64) -> AgentView {
        let counts = TaskCounts {
            assigned: count_owned(tasks, &record.agent, TaskStatus::Assigned),
            in_progress: count_owned(tasks, &record.agent, TaskStatus::InProgress),
            blocked: count_owned(tasks, &record.agent, TaskStatus::Blocked),
            done: count_owned(tasks, &record.agent, TaskStatus::Done),
        };
        AgentView {
            agent: record.agent.clone(),
            status: record.status,
            age_seconds: age,
            last_seen: record.last_seen.clone(),
            project_root: record.meta_str("project_root").map(str::to_string),
            cwd: record.meta_str("cwd").map(str::to_string),
            verification: self.verification(record),
            task_counts: counts,
            metadata: record.metadata.clone(),
        }
    }

    /// Registered agents plus names inferred from event traffic and task
    /// ownership.
    pub fn discover_agents(
        &self,
        active_only: bool,
        stale_after_secs: Option<u64>,
    ) -> Result<DiscoveredAgents, EngineError> {
        let registered = self.list_agents(active_only, stale_after_secs, false)?;
        let registered_names: std::collections::BTreeSet<String> =
            registered.iter().map(|view| view.agent.clone()).collect();

        let mut inferred: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
        for (_, event) in self.bus().events_from(0)? {
            if event.source != fm_core::SOURCE_ORCHESTRATOR
                && event.source != fm_core::SOURCE_GOVERNANCE
            {
                inferred.insert(event.source.clone());
            }
            if let Some(audience) = event.audience() {
                for name in audience {
                    if name != "*" {
                        inferred.insert(name.to_string());
                    }
                }
            }
        }
        for task in self.state().tasks()? {
            inferred.insert(task.owner);
        }

        let mut rows: Vec<(String, Value)> = registered
            .into_iter()
            .map(|view| (view.agent.clone(), serde_json::to_value(&view).unwrap_or(Value::Null)))
            .collect();
        let mut inferred_only = 0usize;
        for name in inferred {
            if registered_names.contains(&name) {
                continue;
            }
            inferred_only += 1;
            rows.push((
                name.clone(),
                json!({
                    "agent": name,
                    "status": "unknown",
                    "metadata": {},
                    "inferred": true,
                    "inferred_from": ["events", "tasks"],
                }),
            ));
        }
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(DiscoveredAgents {
            registered_count: registered_names.len(),
            inferred_only_count: inferred_only,
            agents: rows.into_iter().map(|(_, row)| row).collect(),
        })
    }

    /// Leader-only correction of an agent's project context.
    pub fn set_agent_project_context(
        &self,
        agent: &str,
        project_root: &str,
        cwd: Option<&str>,
        source: &str,
    ) -> Result<AgentRecord, EngineError> {
        self.require_leader(source)?;

        let _state = self.lock_state();
        let mut agents = self.state().agents()?;
        let entry = agents.get_mut(agent).ok_or_else(|| {
            EngineError::Validation(format!("Agent not registered: {agent}"))
        })?;
        let cwd = cwd.unwrap_or(project_root);
        entry
            .metadata
            .insert("project_root".to_string(), json!(project_root));
        entry.metadata.insert("cwd".to_string(), json!(cwd));
        entry
            .metadata
            .insert("project_override_by".to_string(), json!(source));
        entry
            .metadata
            .insert("project_override_at".to_string(), json!(self.now_iso()));
        let snapshot = entry.clone();
        self.state().put_agents(&agents)?;

        self.emit(
            kinds::MANAGER_PROJECT_CONTEXT_OVERRIDE,
            source,
            payload_of(json!({
                "agent": agent,
                "project_root": project_root,
                "cwd": cwd,
                "audience": [agent],
            })),
        )?;
        Ok(snapshot)
    }

    /// Team-member attach flow: register, heartbeat, verify, and — when the
    /// connection is valid — announce and auto-claim the next task.
    pub fn connect_to_leader(
        &self,
        agent: &str,
        metadata: Map<String, Value>,
        status: &str,
        announce: bool,
        source: Option<&str>,
        project_override: Option<&str>,
    ) -> Result<ConnectReport, EngineError> {
        let leader = self.leader()?;

        let claimed_role = metadata.get("role").and_then(Value::as_str);
        let role_ok = !matches!(claimed_role, Some("manager") | Some("leader"))
            || agent == leader;

        let mut details = metadata;
        details
            .entry("role".to_string())
            .or_insert_with(|| json!("team_member"));
        details.insert("status".to_string(), json!(status));
        self.register_agent(agent, details)?;

        let override_applied = match (source, project_override) {
            (Some(src), Some(project_root)) if src == leader => {
                self.set_agent_project_context(agent, project_root, None, src)?;
                true
            }
            _ => false,
        };

        let mut pulse = Map::new();
        pulse.insert("status".to_string(), json!(status));
        let entry = self.heartbeat(agent, pulse)?;

        let verification = self.verification(&entry);
        let source_match = source == Some(agent);
        let connected = verification.verified
            && verification.same_project
            && (source_match || override_applied)
            && role_ok;

        let reason = if connected {
            None
        } else if !role_ok {
            Some("role_mismatch: only the leader may claim the manager role".to_string())
        } else if !(source_match || override_applied) {
            Some("source_mismatch: source must equal agent".to_string())
        } else if !verification.identity_complete {
            Some(format!(
                "identity_incomplete: missing {}",
                verification.missing_identity.join(", ")
            ))
        } else if !verification.same_project {
            Some("wrong_project: project context resolves outside the orchestrator root".to_string())
        } else {
            Some("stale_heartbeat".to_string())
        };

        if connected && announce {
            self.emit(
                kinds::TEAM_MEMBER_CONNECTED,
                agent,
                payload_of(json!({
                    "agent": agent,
                    "status": status,
                    "manager": &leader,
                    "next_action": "poll_events_then_claim_once",
                    "audience": [&leader],
                })),
            )?;
        }

        let auto_claimed = if connected && agent != leader {
            self.claim_next(agent)?
        } else {
            None
        };

        Ok(ConnectReport {
            connected,
            agent: agent.to_string(),
            manager: leader,
            reason,
            verification,
            entry,
            auto_claimed,
            next: vec![
                format!("poll_events(agent={agent}, timeout_ms=120000)"),
                format!("claim_next_task(agent={agent})"),
            ],
        })
    }

    /// Leader's one-shot activation handshake: signal the targets, then poll
    /// until every one is active, verified, and same-project — or time out.
    pub async fn connect_team_members(
        &self,
        source: &str,
        team_members: &[String],
        timeout: Duration,
        poll_interval: Duration,
        stale_after_secs: u64,
    ) -> Result<ConnectOutcome, EngineError> {
        self.require_leader(source)?;

        let mut requested: Vec<String> = team_members
            .iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        requested.sort();
        requested.dedup();
        if requested.is_empty() {
            return Err(EngineError::Validation(
                "team_members must contain at least one non-empty agent id".to_string(),
            ));
        }

        self.emit(
            kinds::MANAGER_CONNECT_TEAM_MEMBERS,
            source,
            payload_of(json!({
                "team_members": &requested,
                "timeout_seconds": timeout.as_secs(),
                "audience": &requested,
            })),
        )?;

        let started = tokio::time::Instant::now();
        let deadline = started + timeout;
        let mut diagnostics: BTreeMap<String, ConnectDiagnostic>;
        loop {
            let agents = self.state().agents()?;
            let tasks = self.state().tasks()?;
            diagnostics = requested
                .iter()
                .map(|name| {
                    (
                        name.clone(),
                        self.diagnostic(&agents, &tasks, name, stale_after_secs),
                    )
                })
                .collect();
            if diagnostics.values().all(ConnectDiagnostic::is_connected) {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(poll_interval).await;
        }

        let connected: Vec<String> = diagnostics
            .iter()
            .filter(|(_, diag)| diag.is_connected())
            .map(|(name, _)| name.clone())
            .collect();
        let missing: Vec<String> = requested
            .iter()
            .filter(|name| !connected.contains(name))
            .cloned()
            .collect();
        let status = if missing.is_empty() { "connected" } else { "timeout" };

        self.emit(
            kinds::MANAGER_CONNECT_RESULT,
            source,
            payload_of(json!({
                "status": status,
                "connected": &connected,
                "missing": &missing,
                "diagnostics": &diagnostics,
                "audience": &requested,
            })),
        )?;

        let elapsed = started.elapsed();
        Ok(ConnectOutcome {
            status: status.to_string(),
            requested,
            connected,
            missing,
            diagnostics,
            timeout_seconds: timeout.as_secs(),
            elapsed_seconds: elapsed.as_secs(),
        })
    }
}

fn count_owned(tasks: &[Task], owner: &str, status: TaskStatus) -> usize {
    tasks
        .iter()
        .filter(|task| task.owner == owner && task.status == status)
        .count()
}

#[cfg(test)]
#[path = "presence_tests.rs"]
mod tests;
