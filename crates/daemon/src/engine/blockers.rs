// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Blockers: owner-raised questions that park a task until resolved.

use super::{payload_of, Engine, EngineError};
use fm_core::event::kinds;
use fm_core::{Blocker, BlockerId, BlockerStatus, Clock, Severity, TaskStatus};
use serde::Serialize;
use serde_json::json;

/// `resolve_blocker` result: the blocker plus how the task resumed.
#[derive(Debug, Serialize)]
pub struct ResolvedBlocker {
    #[serde(flatten)]
    pub blocker: Blocker,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub degraded_comm: bool,
}

impl<C: Clock> Engine<C> {
    /// Owner-only: raise a blocker and move the task to `blocked`.
    pub fn raise_blocker(
        &self,
        task_id: &str,
        agent: &str,
        question: &str,
        options: Vec<String>,
        severity: Severity,
    ) -> Result<Blocker, EngineError> {
        let _state = self.lock_state();
        let mut agents = self.state().agents()?;
        self.require_operational(&agents, agent)?;
        self.touch(&mut agents, agent);
        self.state().put_agents(&agents)?;

        let mut tasks = self.state().tasks()?;
        let index = tasks
            .iter()
            .position(|task| task.id == task_id)
            .ok_or_else(|| EngineError::TaskNotFound(task_id.to_string()))?;
        if tasks[index].owner != agent {
            return Err(EngineError::Validation(format!(
                "Blocker agent '{agent}' does not match task owner '{}'",
                tasks[index].owner
            )));
        }

        tasks[index].status = TaskStatus::Blocked;
        tasks[index].updated_at = self.now_iso();
        let task_ref = tasks[index].id;
        self.state().put_tasks(&tasks)?;

        let blocker = Blocker {
            id: BlockerId::new(),
            task_id: task_ref,
            agent: agent.to_string(),
            question: question.to_string(),
            options,
            severity,
            status: BlockerStatus::Open,
            created_at: self.now_iso(),
            resolution: None,
            resolved_by: None,
            resolved_at: None,
        };
        let mut blockers = self.state().blockers()?;
        blockers.push(blocker.clone());
        self.state().put_blockers(&blockers)?;

        self.emit(
            kinds::BLOCKER_RAISED,
            agent,
            payload_of(json!({
                "blocker_id": blocker.id,
                "task_id": blocker.task_id,
                "agent": agent,
                "severity": blocker.severity,
                "question": question,
            })),
        )?;
        Ok(blocker)
    }

    /// Resolve a blocker and resume its task: back to `in_progress` when the
    /// owner is reachable, else to `assigned` with degraded-comm marking.
    /// Resolving an already-resolved blocker is a no-op returning the record.
    pub fn resolve_blocker(
        &self,
        blocker_id: &str,
        resolution: &str,
        source: &str,
    ) -> Result<ResolvedBlocker, EngineError> {
        let _state = self.lock_state();
        let mut blockers = self.state().blockers()?;
        let index = blockers
            .iter()
            .position(|blocker| blocker.id == blocker_id)
            .ok_or_else(|| EngineError::BlockerNotFound(blocker_id.to_string()))?;

        if blockers[index].status == BlockerStatus::Resolved {
            return Ok(ResolvedBlocker {
                blocker: blockers[index].clone(),
                task_status: None,
                degraded_comm: false,
            });
        }

        blockers[index].status = BlockerStatus::Resolved;
        blockers[index].resolution = Some(resolution.to_string());
        blockers[index].resolved_by = Some(source.to_string());
        blockers[index].resolved_at = Some(self.now_iso());
        let blocker = blockers[index].clone();
        self.state().put_blockers(&blockers)?;

        let mut task_status = None;
        let mut degraded = false;
        let mut tasks = self.state().tasks()?;
        let agents = self.state().agents()?;
        if let Some(task) = tasks
            .iter_mut()
            .find(|task| task.id == blocker.task_id && task.status == TaskStatus::Blocked)
        {
            let diag = self.diagnostic(
                &agents,
                &[],
                &task.owner,
                self.heartbeat_timeout_secs(),
            );
            if diag.active {
                task.status = TaskStatus::InProgress;
            } else {
                task.status = TaskStatus::Assigned;
                task.degraded_comm = true;
                degraded = true;
            }
            task.updated_at = self.now_iso();
            task_status = Some(task.status);
            let owner = task.owner.clone();
            let task_ref = task.id;
            self.state().put_tasks(&tasks)?;

            if degraded {
                self.emit(
                    kinds::TEAM_MEMBER_DEGRADED_COMM,
                    fm_core::SOURCE_ORCHESTRATOR,
                    payload_of(json!({
                        "task_id": task_ref,
                        "agent": owner,
                        "reason": "owner unreachable at blocker resolution",
                    })),
                )?;
            }
        }

        self.emit(
            kinds::BLOCKER_RESOLVED,
            source,
            payload_of(json!({
                "blocker_id": blocker.id,
                "task_id": blocker.task_id,
                "resolution": resolution,
            })),
        )?;
        Ok(ResolvedBlocker { blocker, task_status, degraded_comm: degraded })
    }

    /// Blockers, optionally filtered by status and raising agent.
    pub fn list_blockers(
        &self,
        status: Option<BlockerStatus>,
        agent: Option<&str>,
    ) -> Result<Vec<Blocker>, EngineError> {
        let mut blockers = self.state().blockers()?;
        if let Some(status) = status {
            blockers.retain(|blocker| blocker.status == status);
        }
        if let Some(agent) = agent {
            blockers.retain(|blocker| blocker.agent == agent);
        }
        Ok(blockers)
    }
}

#[cfg(test)]
#[path = "blockers_tests.rs"]
mod tests;
