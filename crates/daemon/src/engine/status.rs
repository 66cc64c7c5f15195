// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live status report: the manager's percentage + pipeline summary, both as
//! ready-to-paste text and as structured data.

use super::{Engine, EngineError};
use fm_core::{BlockerStatus, BugStatus, Clock, Task, TaskStatus, Workstream};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Caller-supplied percentage overrides; anything omitted is derived from
/// task completion counts.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LiveStatusArgs {
    #[serde(default)]
    pub overall_percent: Option<u32>,
    #[serde(default)]
    pub phase_1_percent: Option<u32>,
    #[serde(default)]
    pub phase_2_percent: Option<u32>,
    #[serde(default)]
    pub phase_3_percent: Option<u32>,
    #[serde(default)]
    pub backend_task_id: Option<String>,
    #[serde(default)]
    pub backend_percent: Option<u32>,
    #[serde(default)]
    pub frontend_task_id: Option<String>,
    #[serde(default)]
    pub frontend_percent: Option<u32>,
    #[serde(default)]
    pub qa_percent: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct LiveStatus {
    pub report_text: String,
    pub report: Value,
    pub agent_connection_contexts: Vec<Value>,
    pub recommended_cadence_seconds: u64,
}

fn percent(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((done as f64 / total as f64) * 100.0).round() as u32
}

fn focus_task<'a>(tasks: &'a [Task], workstream: Workstream) -> Option<&'a Task> {
    let of_stream: Vec<&Task> =
        tasks.iter().filter(|task| task.workstream == workstream).collect();
    of_stream
        .iter()
        .find(|task| task.status != TaskStatus::Done)
        .copied()
        .or_else(|| of_stream.last().copied())
}

impl<C: Clock> Engine<C> {
    /// Build the live status report.
    pub fn live_status_report(&self, args: &LiveStatusArgs) -> Result<LiveStatus, EngineError> {
        let tasks = self.list_tasks(None, None)?;
        let open_blockers = self.list_blockers(Some(BlockerStatus::Open), None)?.len();
        let open_bugs = self.list_bugs(Some(BugStatus::Open), None)?.len();
        let roles = self.roles()?;
        let agents = self.list_agents(false, None, false)?;
        let by_agent: BTreeMap<&str, &super::AgentView> =
            agents.iter().map(|view| (view.agent.as_str(), view)).collect();

        let total = tasks.len();
        let done = tasks.iter().filter(|task| task.status == TaskStatus::Done).count();
        let reported = tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Reported)
            .count();
        let overall_auto = percent(done, total);

        let stream_percent = |workstream: Workstream| {
            let of_stream: Vec<&Task> =
                tasks.iter().filter(|task| task.workstream == workstream).collect();
            let stream_done = of_stream
                .iter()
                .filter(|task| task.status == TaskStatus::Done)
                .count();
            percent(stream_done, of_stream.len())
        };

        let overall = args.overall_percent.unwrap_or(overall_auto);
        let phase_1 = args.phase_1_percent.unwrap_or(overall);
        let phase_2 = args.phase_2_percent.unwrap_or(0);
        let phase_3 = args.phase_3_percent.unwrap_or(0);
        let backend_percent =
            args.backend_percent.unwrap_or_else(|| stream_percent(Workstream::Backend));
        let frontend_percent =
            args.frontend_percent.unwrap_or_else(|| stream_percent(Workstream::Frontend));
        let qa_percent = args.qa_percent.unwrap_or(overall_auto);

        let backend_task_id = args
            .backend_task_id
            .clone()
            .or_else(|| focus_task(&tasks, Workstream::Backend).map(|task| task.id.to_string()))
            .unwrap_or_else(|| "n/a".to_string());
        let frontend_task_id = args
            .frontend_task_id
            .clone()
            .or_else(|| focus_task(&tasks, Workstream::Frontend).map(|task| task.id.to_string()))
            .unwrap_or_else(|| "n/a".to_string());

        let mut lines = vec![
            "Current live status:".to_string(),
            String::new(),
            format!("- Overall project: {overall}%"),
            format!("- Phase 1 (Architecture + Vertical Slice): {phase_1}%"),
            format!("- Phase 2 (Content Pipeline): {phase_2}%"),
            format!("- Phase 3 (Full Production): {phase_3}%"),
            format!("- Backend vertical slice ({backend_task_id}): {backend_percent}%"),
            format!("- Frontend vertical slice ({frontend_task_id}): {frontend_percent}%"),
            format!("- QA/validation completion: {qa_percent}%"),
            String::new(),
            "Pipeline health:".to_string(),
            String::new(),
            format!("- Reported tasks: {reported}"),
            format!("- Open blockers: {open_blockers}"),
            format!("- Open bugs: {open_bugs}"),
            String::new(),
            "Team members:".to_string(),
        ];

        let mut role_by_agent: BTreeMap<String, &str> = BTreeMap::new();
        role_by_agent.insert(roles.leader.clone(), "manager");
        for member in &roles.team_members {
            role_by_agent.entry(member.clone()).or_insert("team member");
        }
        let mut all_names: Vec<String> = role_by_agent.keys().cloned().collect();
        for name in by_agent.keys() {
            if !all_names.iter().any(|existing| existing == name) {
                all_names.push((*name).to_string());
            }
        }
        all_names.sort();

        let mut contexts = Vec::new();
        for name in &all_names {
            let info = by_agent.get(name.as_str());
            let status = info
                .map(|view| view.status.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let role = role_by_agent.get(name).copied().unwrap_or("team member");
            let project_root = info
                .and_then(|view| view.project_root.clone())
                .unwrap_or_else(|| "-".to_string());
            let cwd = info
                .and_then(|view| view.cwd.clone())
                .unwrap_or_else(|| "-".to_string());

            let in_progress: Vec<String> = tasks
                .iter()
                .filter(|task| task.owner == *name && task.status == TaskStatus::InProgress)
                .map(|task| task.id.to_string())
                .collect();
            let reported_ids: Vec<String> = tasks
                .iter()
                .filter(|task| task.owner == *name && task.status == TaskStatus::Reported)
                .map(|task| task.id.to_string())
                .collect();

            let mut chunks = Vec::new();
            if !in_progress.is_empty() {
                chunks.push(format!("in_progress on {}", in_progress.join(", ")));
            }
            if !reported_ids.is_empty() {
                chunks.push(format!("reported: {}", reported_ids.join(", ")));
            }
            chunks.push(format!("project_root={project_root}"));
            chunks.push(format!("cwd={cwd}"));
            lines.push(format!("- {name} ({role}): {status}; {}", chunks.join("; ")));

            contexts.push(json!({
                "agent": name,
                "role": role,
                "status": status,
                "project_root": if project_root == "-" { String::new() } else { project_root },
                "cwd": if cwd == "-" { String::new() } else { cwd },
            }));
        }

        Ok(LiveStatus {
            report_text: lines.join("\n"),
            report: json!({
                "overall_project_percent": overall,
                "phase_1_percent": phase_1,
                "phase_2_percent": phase_2,
                "phase_3_percent": phase_3,
                "backend_task_id": backend_task_id,
                "backend_percent": backend_percent,
                "frontend_task_id": frontend_task_id,
                "frontend_percent": frontend_percent,
                "qa_validation_percent": qa_percent,
                "pipeline_health": {
                    "reported_tasks": reported,
                    "open_blockers": open_blockers,
                    "open_bugs": open_bugs,
                },
            }),
            agent_connection_contexts: contexts,
            recommended_cadence_seconds: 600,
        })
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
