// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The manager cycle: validate reports, reconnect stale owners, recover
//! stalled tasks, and republish the task-contract digest.
//!
//! Runs on demand as an RPC and continuously as a background task. The
//! background variant holds an exclusive OS lock on
//! `state/.manager_auto_cycle.lock` so at most one process per host drives it.

use super::{payload_of, Engine, EngineError};
use crate::engine::identity::ConnectDiagnostic;
use fm_core::event::kinds;
use fm_core::{Clock, Report, TaskStatus};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Retry-queue entries drained per cycle.
const RETRY_DRAIN_LIMIT: usize = 20;

/// One auto-validated report.
#[derive(Debug, Serialize)]
pub struct ProcessedReport {
    pub task_id: fm_core::TaskId,
    pub passed: bool,
    pub notes: String,
}

/// Outcome of the stale-owner reconnect attempt.
#[derive(Debug, Serialize)]
pub struct AutoConnect {
    pub attempted: bool,
    pub requested: Vec<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub connected: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

/// Pending/done tallies for one owner.
#[derive(Debug, Default, Clone, Serialize)]
pub struct OwnerRollup {
    pub pending: usize,
    pub done: usize,
}

/// Full manager-cycle result.
#[derive(Debug, Serialize)]
pub struct CycleOutcome {
    pub processed_reports: Vec<ProcessedReport>,
    pub report_retry_queue: super::DrainOutcome,
    pub auto_connect: AutoConnect,
    pub stale_reassignments: Vec<super::ReassignedTask>,
    pub stale_requeues: Vec<super::RequeuedTask>,
    pub remaining_by_owner: BTreeMap<String, OwnerRollup>,
    pub pending_total: usize,
    pub open_blockers: Vec<fm_core::Blocker>,
}

impl<C: Clock> Engine<C> {
    /// Run one manager cycle. In strict mode a report additionally needs a
    /// non-empty commit sha and test command to pass validation.
    pub async fn manager_cycle(&self, strict: bool) -> Result<CycleOutcome, EngineError> {
        let leader = self.leader()?;
        let stale_after = self.heartbeat_timeout_secs();

        // 1. Drain due retry-queue entries.
        let report_retry_queue = self.process_report_retry_queue(RETRY_DRAIN_LIMIT)?;

        // 2. Validate every reported task from its report file.
        let mut processed_reports = Vec::new();
        for task in self.list_tasks(Some(TaskStatus::Reported), None)? {
            let decision = match self.bus().read_report::<Report>(task.id.as_str())? {
                None => (false, "Missing report file".to_string()),
                Some(report) => {
                    let failed = report.test_summary.failed;
                    let has_command = !report.test_summary.command.trim().is_empty();
                    let mut passed = report.status == "done" && failed == 0;
                    if strict {
                        passed = passed
                            && !report.commit_sha.trim().is_empty()
                            && has_command;
                    }
                    let notes = if passed {
                        format!("Manager cycle accepted report {}", report.commit_sha)
                    } else {
                        format!(
                            "Manager cycle rejected report status={}, failed_tests={failed}, has_command={has_command}",
                            report.status
                        )
                    };
                    (passed, notes)
                }
            };
            let (passed, notes) = decision;
            self.validate_task(task.id.as_str(), passed, &notes, &leader)?;
            processed_reports.push(ProcessedReport { task_id: task.id, passed, notes });
        }

        // 3. Reconnect stale owners that still hold open work.
        let auto_connect = self.reconnect_stale_owners(&leader, stale_after).await?;

        // 4–5. Reassign away from dead owners, requeue merely-stale ones.
        let stale_reassignments = self.reassign_stale_tasks(&leader, stale_after, true)?;
        let stale_requeues = self.requeue_stale_in_progress(stale_after)?;

        // 6. Per-owner rollup.
        let tasks = self.list_tasks(None, None)?;
        let mut remaining_by_owner: BTreeMap<String, OwnerRollup> = BTreeMap::new();
        for task in &tasks {
            let bucket = remaining_by_owner.entry(task.owner.clone()).or_default();
            if task.status.is_open() {
                bucket.pending += 1;
            }
            if task.status == TaskStatus::Done {
                bucket.done += 1;
            }
        }
        let pending_total = remaining_by_owner.values().map(|bucket| bucket.pending).sum();

        // 7. Republish the pending task contracts to curb context drift.
        let contracts: Vec<serde_json::Value> = tasks
            .iter()
            .filter(|task| task.status.is_open())
            .map(|task| {
                json!({
                    "task_id": task.id,
                    "owner": &task.owner,
                    "title": &task.title,
                    "status": task.status,
                    "acceptance_criteria": &task.acceptance_criteria,
                })
            })
            .collect();
        self.emit(
            kinds::MANAGER_TASK_CONTRACTS,
            &leader,
            payload_of(json!({"contracts": contracts})),
        )?;

        Ok(CycleOutcome {
            processed_reports,
            report_retry_queue,
            auto_connect,
            stale_reassignments,
            stale_requeues,
            remaining_by_owner,
            pending_total,
            open_blockers: self.list_blockers(Some(fm_core::BlockerStatus::Open), None)?,
        })
    }

    /// Collect non-leader owners of open in-progress/blocked work that are
    /// not active and run the connect handshake against them.
    async fn reconnect_stale_owners(
        &self,
        leader: &str,
        stale_after: u64,
    ) -> Result<AutoConnect, EngineError> {
        let roles = self.roles()?;
        let agents = self.state().agents()?;
        let tasks = self.state().tasks()?;

        let mut candidates: Vec<String> = Vec::new();
        for task in &tasks {
            if !matches!(task.status, TaskStatus::InProgress | TaskStatus::Blocked) {
                continue;
            }
            let owner = task.owner.trim();
            if owner.is_empty() || owner == leader || candidates.iter().any(|c| c == owner) {
                continue;
            }
            if !roles.team_members.is_empty() && !roles.team_members.contains(owner) {
                continue;
            }
            let diag: ConnectDiagnostic = self.diagnostic(&agents, &tasks, owner, stale_after);
            if !diag.active {
                candidates.push(owner.to_string());
            }
        }

        if candidates.is_empty() {
            return Ok(AutoConnect {
                attempted: false,
                requested: candidates,
                status: "skipped".to_string(),
                connected: Vec::new(),
                missing: Vec::new(),
            });
        }

        let outcome = self
            .connect_team_members(
                leader,
                &candidates,
                self.policy().cycle_connect_timeout(),
                self.policy().cycle_connect_poll(),
                stale_after,
            )
            .await?;
        Ok(AutoConnect {
            attempted: true,
            requested: candidates,
            status: outcome.status,
            connected: outcome.connected,
            missing: outcome.missing,
        })
    }
}

/// Background manager-cycle loop.
///
/// Acquires the singleton OS lock before driving cycles; without it, keeps
/// retrying each interval in case the holder exits. Honors the cancellation
/// token between iterations.
pub async fn run_auto_cycle<C: Clock>(
    engine: Arc<Engine<C>>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let lock_path = engine.state().auto_cycle_lock_path();
    let mut held = None;

    info!(interval_secs = interval.as_secs(), "auto manager cycle task started");
    loop {
        if held.is_none() {
            held = fm_storage::lock::try_lock_exclusive(&lock_path);
            if held.is_none() {
                warn!("another process holds the auto-cycle lock, standing by");
            }
        }
        if held.is_some() {
            if let Err(cycle_error) = engine.manager_cycle(true).await {
                error!(error = %cycle_error, "auto manager cycle failed");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    info!("auto manager cycle task stopped");
}

#[cfg(test)]
#[path = "cycle_tests.rs"]
mod tests;
