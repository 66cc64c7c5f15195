// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task lifecycle: creation with dedupe, claiming with manager overrides,
//! status authority, the dedupe pass, and stale-owner recovery.

use super::{payload_of, Engine, EngineError};
use fm_core::event::kinds;
use fm_core::{Clock, Task, TaskId, TaskStatus, Workstream};
use serde::Serialize;
use serde_json::json;

/// `create_task` result; `deduplicated` marks a fingerprint collision where
/// the existing task was returned instead of a new record.
#[derive(Debug, Serialize)]
pub struct CreatedTask {
    #[serde(flatten)]
    pub task: Task,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deduplicated: bool,
}

/// One closed duplicate from the dedupe pass.
#[derive(Debug, Serialize)]
pub struct DedupeOutcome {
    pub checked: usize,
    pub closed: Vec<serde_json::Value>,
}

/// One task moved off a stale owner.
#[derive(Debug, Clone, Serialize)]
pub struct ReassignedTask {
    pub task_id: TaskId,
    pub from: String,
    pub to: String,
    pub workstream: Workstream,
    pub reason: String,
}

/// One in-progress task flipped back to `assigned` for its own owner.
#[derive(Debug, Clone, Serialize)]
pub struct RequeuedTask {
    pub task_id: TaskId,
    pub owner: String,
    pub reason: String,
}

impl<C: Clock> Engine<C> {
    /// Create a task, routing the owner via policy unless overridden.
    ///
    /// A fingerprint collision with an open task returns that task with
    /// `deduplicated: true` and writes nothing.
    pub fn create_task(
        &self,
        title: &str,
        workstream: Workstream,
        description: &str,
        acceptance_criteria: Vec<String>,
        owner: Option<String>,
    ) -> Result<CreatedTask, EngineError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(EngineError::Validation(
                "title must be a non-empty string".to_string(),
            ));
        }

        let _state = self.lock_state();
        let mut tasks = self.state().tasks()?;
        let owner = owner.unwrap_or_else(|| self.policy().task_owner_for(workstream));

        let fingerprint = fm_core::fingerprint(&owner, workstream, title);
        if let Some(existing) = tasks
            .iter()
            .find(|task| task.status.is_open() && task.fingerprint() == fingerprint)
        {
            return Ok(CreatedTask { task: existing.clone(), deduplicated: true });
        }

        let now = self.now_iso();
        let task = Task {
            id: TaskId::new(),
            title: title.to_string(),
            description: description.to_string(),
            workstream,
            owner: owner.clone(),
            status: TaskStatus::Assigned,
            acceptance_criteria: acceptance_criteria.clone(),
            created_at: now.clone(),
            updated_at: now,
            reassigned_from: None,
            reassigned_reason: None,
            degraded_comm: false,
            duplicate_of: None,
        };
        tasks.push(task.clone());
        self.state().put_tasks(&tasks)?;

        self.bus().write_command(
            task.id.as_str(),
            &json!({
                "task_id": task.id,
                "owner": owner,
                "title": title,
                "description": description,
                "workstream": workstream,
                "acceptance_criteria": acceptance_criteria,
                "required_report": [
                    "task_id",
                    "agent",
                    "commit_sha",
                    "test_summary",
                    "status",
                    "notes",
                ],
            }),
        )?;

        let leader = self.leader()?;
        self.emit(
            kinds::TASK_ASSIGNED,
            &leader,
            payload_of(json!({
                "task_id": task.id,
                "owner": &task.owner,
                "workstream": task.workstream,
            })),
        )?;
        Ok(CreatedTask { task, deduplicated: false })
    }

    /// All tasks, optionally filtered by status and owner.
    pub fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        owner: Option<&str>,
    ) -> Result<Vec<Task>, EngineError> {
        let mut tasks = self.state().tasks()?;
        if let Some(status) = status {
            tasks.retain(|task| task.status == status);
        }
        if let Some(owner) = owner {
            tasks.retain(|task| task.owner == owner);
        }
        Ok(tasks)
    }

    /// Claim the next task for `owner` and move it to `in_progress`.
    ///
    /// A manager claim override is consulted first; otherwise the first
    /// owned task in `assigned` or `bug_open` (stored order) wins. Returns
    /// `None` when nothing is claimable.
    pub fn claim_next(&self, owner: &str) -> Result<Option<Task>, EngineError> {
        let _state = self.lock_state();
        let mut agents = self.state().agents()?;
        self.require_operational(&agents, owner)?;
        self.touch(&mut agents, owner);
        self.state().put_agents(&agents)?;

        let mut tasks = self.state().tasks()?;
        let mut overrides = self.state().claim_overrides()?;

        if let Some(forced) = overrides.get(owner).cloned() {
            let position = tasks
                .iter()
                .position(|task| task.id == forced.as_str() && task.owner == owner);
            match position {
                Some(index) if tasks[index].status.is_claimable() => {
                    tasks[index].status = TaskStatus::InProgress;
                    tasks[index].updated_at = self.now_iso();
                    let claimed = tasks[index].clone();
                    overrides.remove(owner);
                    self.state().put_tasks(&tasks)?;
                    self.state().put_claim_overrides(&overrides)?;
                    self.emit(
                        kinds::TASK_CLAIMED,
                        owner,
                        payload_of(json!({
                            "task_id": claimed.id,
                            "owner": owner,
                            "via": "manager_override",
                        })),
                    )?;
                    return Ok(Some(claimed));
                }
                _ => {
                    // Stale override: the target moved on or changed hands.
                    overrides.remove(owner);
                    self.state().put_claim_overrides(&overrides)?;
                }
            }
        }

        let position = tasks
            .iter()
            .position(|task| task.owner == owner && task.status.is_claimable());
        let Some(index) = position else {
            return Ok(None);
        };
        tasks[index].status = TaskStatus::InProgress;
        tasks[index].updated_at = self.now_iso();
        let claimed = tasks[index].clone();
        self.state().put_tasks(&tasks)?;
        self.emit(
            kinds::TASK_CLAIMED,
            owner,
            payload_of(json!({"task_id": claimed.id, "owner": owner})),
        )?;
        Ok(Some(claimed))
    }

    /// Leader-only: force `agent`'s next claim to pick `task_id` first.
    pub fn set_claim_override(
        &self,
        agent: &str,
        task_id: &str,
        source: &str,
    ) -> Result<serde_json::Value, EngineError> {
        self.require_leader(source)?;

        let _state = self.lock_state();
        let tasks = self.state().tasks()?;
        if !tasks.iter().any(|task| task.id == task_id) {
            return Err(EngineError::TaskNotFound(task_id.to_string()));
        }
        let mut overrides = self.state().claim_overrides()?;
        overrides.insert(agent.to_string(), task_id.to_string());
        self.state().put_claim_overrides(&overrides)?;

        self.emit(
            kinds::MANAGER_CLAIM_OVERRIDE,
            source,
            payload_of(json!({
                "agent": agent,
                "task_id": task_id,
                "audience": [agent],
            })),
        )?;
        Ok(json!({"agent": agent, "task_id": task_id, "forced": true}))
    }

    /// Free-form status change with authority checks.
    ///
    /// Completion states are rejected here: `reported` and `done` only come
    /// out of the report/validation pipeline.
    pub fn set_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        source: &str,
        note: &str,
    ) -> Result<Task, EngineError> {
        if matches!(status, TaskStatus::Done | TaskStatus::Reported) {
            return Err(EngineError::Validation(format!(
                "status '{status}' must go through submit_report and validation"
            )));
        }

        let _state = self.lock_state();
        let roles = self.roles()?;
        let mut tasks = self.state().tasks()?;
        let index = tasks
            .iter()
            .position(|task| task.id == task_id)
            .ok_or_else(|| EngineError::TaskNotFound(task_id.to_string()))?;

        if !roles.is_leader(source) && tasks[index].owner != source {
            return Err(EngineError::UnauthorizedStatusUpdate(format!(
                "'{source}' is neither the leader nor the owner of {task_id}"
            )));
        }

        let mut agents = self.state().agents()?;
        self.touch(&mut agents, source);
        self.state().put_agents(&agents)?;

        tasks[index].status = status;
        tasks[index].updated_at = self.now_iso();
        let updated = tasks[index].clone();
        self.state().put_tasks(&tasks)?;

        self.emit(
            kinds::TASK_STATUS_CHANGED,
            source,
            payload_of(json!({
                "task_id": updated.id,
                "status": updated.status,
                "owner": &updated.owner,
                "note": note,
            })),
        )?;
        Ok(updated)
    }

    /// Leader-triggered dedupe pass: per fingerprint group the oldest open
    /// task survives, the rest close as duplicates.
    pub fn dedupe_open_tasks(&self, source: &str) -> Result<DedupeOutcome, EngineError> {
        self.require_leader(source)?;

        let _state = self.lock_state();
        let mut tasks = self.state().tasks()?;
        let mut keeper_by_print: std::collections::HashMap<String, TaskId> =
            std::collections::HashMap::new();
        let mut closed = Vec::new();
        let mut checked = 0usize;
        let now = self.now_iso();

        for task in tasks.iter_mut() {
            if !task.status.is_open() {
                continue;
            }
            checked += 1;
            let print = task.fingerprint();
            if let Some(keeper) = keeper_by_print.get(&print).copied() {
                task.status = TaskStatus::DuplicateClosed;
                task.duplicate_of = Some(keeper);
                task.updated_at = now.clone();
                closed.push(json!({"task_id": task.id, "duplicate_of": keeper}));
            } else {
                // Stored order is creation order, so the first hit is oldest.
                keeper_by_print.insert(print, task.id);
            }
        }

        if !closed.is_empty() {
            self.state().put_tasks(&tasks)?;
            for entry in &closed {
                self.emit(kinds::TASK_DUPLICATE_CLOSED, source, payload_of(entry.clone()))?;
            }
        }
        Ok(DedupeOutcome { checked, closed })
    }

    /// Leader-triggered: move tasks away from owners that fail the liveness
    /// diagnostic, preferring the policy-routed owner for the workstream and
    /// then the least-loaded active, verified, same-project agent.
    pub fn reassign_stale_tasks(
        &self,
        source: &str,
        stale_after_secs: u64,
        include_blocked: bool,
    ) -> Result<Vec<ReassignedTask>, EngineError> {
        self.require_leader(source)?;

        let _state = self.lock_state();
        let mut tasks = self.state().tasks()?;
        let agents = self.state().agents()?;
        let mut reassigned = Vec::new();

        // Candidates: active, verified, same-project agents.
        let eligible: Vec<String> = agents
            .values()
            .filter(|record| {
                let verification = self.verification(record);
                let active = matches!(
                    verification.age_seconds,
                    Some(age) if age <= stale_after_secs as i64
                );
                active && verification.verified && verification.same_project
            })
            .map(|record| record.agent.clone())
            .collect();

        let snapshot = tasks.clone();
        for task in tasks.iter_mut() {
            let eligible_status = task.status == TaskStatus::InProgress
                || (include_blocked && task.status == TaskStatus::Blocked);
            if !eligible_status {
                continue;
            }
            let owner_diag =
                self.diagnostic(&agents, &snapshot, &task.owner, stale_after_secs);
            if owner_diag.active {
                continue;
            }

            let routed = self.policy().task_owner_for(task.workstream);
            let replacement = eligible
                .iter()
                .filter(|candidate| **candidate != task.owner)
                .min_by_key(|candidate| {
                    let load = snapshot
                        .iter()
                        .filter(|t| t.owner == **candidate && t.status.is_open())
                        .count();
                    // Routed owner wins ties and beats lower load.
                    (**candidate != routed, load, (*candidate).clone())
                })
                .cloned();
            let Some(new_owner) = replacement else {
                continue;
            };

            let reason = format!(
                "owner '{}' failed liveness diagnostic ({})",
                task.owner, owner_diag.reason
            );
            let record = ReassignedTask {
                task_id: task.id,
                from: task.owner.clone(),
                to: new_owner.clone(),
                workstream: task.workstream,
                reason: reason.clone(),
            };
            task.reassigned_from = Some(std::mem::replace(&mut task.owner, new_owner));
            task.reassigned_reason = Some(reason);
            task.degraded_comm = true;
            task.status = TaskStatus::Assigned;
            task.updated_at = self.now_iso();
            reassigned.push(record);
        }

        if !reassigned.is_empty() {
            self.state().put_tasks(&tasks)?;
            for record in &reassigned {
                self.emit(
                    kinds::TASK_REASSIGNED_STALE,
                    source,
                    payload_of(json!({
                        "task_id": record.task_id,
                        "from": &record.from,
                        "to": &record.to,
                        "workstream": record.workstream,
                        "reason": &record.reason,
                    })),
                )?;
            }
        }
        Ok(reassigned)
    }

    /// Gentler recovery: flip `in_progress` tasks with a stale owner back to
    /// `assigned`, keeping the owner so it can resume on reconnect.
    pub fn requeue_stale_in_progress(
        &self,
        stale_after_secs: u64,
    ) -> Result<Vec<RequeuedTask>, EngineError> {
        let _state = self.lock_state();
        let mut tasks = self.state().tasks()?;
        let agents = self.state().agents()?;
        let mut requeued = Vec::new();

        for task in tasks.iter_mut() {
            if task.status != TaskStatus::InProgress {
                continue;
            }
            let Some(age) = agents
                .get(&task.owner)
                .and_then(|record| record.last_seen.as_deref())
                .and_then(|seen| self.age_seconds(seen))
            else {
                continue;
            };
            if age <= stale_after_secs as i64 {
                continue;
            }

            task.status = TaskStatus::Assigned;
            task.updated_at = self.now_iso();
            requeued.push(RequeuedTask {
                task_id: task.id,
                owner: task.owner.clone(),
                reason: format!("owner heartbeat stale ({age}s > {stale_after_secs}s)"),
            });
        }

        if !requeued.is_empty() {
            self.state().put_tasks(&tasks)?;
            for record in &requeued {
                self.emit(
                    kinds::TASK_REQUEUED,
                    fm_core::SOURCE_ORCHESTRATOR,
                    payload_of(json!({
                        "task_id": record.task_id,
                        "owner": &record.owner,
                        "reason": &record.reason,
                    })),
                )?;
            }
        }
        Ok(requeued)
    }
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
