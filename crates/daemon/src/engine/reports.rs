// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Report ingest, the retry queue for rejected reports, and leader
//! validation with the bug loop.

use super::{payload_of, Engine, EngineError};
use fm_core::event::kinds;
use fm_core::{
    Bug, BugId, BugStatus, Clock, Report, RetryEntry, RetryId, RetryStatus, Severity,
    TaskStatus,
};
use serde::Serialize;
use serde_json::json;

/// Validation decision for one task.
#[derive(Debug, Serialize)]
pub struct ValidationOutcome {
    pub task_id: fm_core::TaskId,
    pub passed: bool,
    pub owner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bug_id: Option<BugId>,
    pub notes: String,
}

/// Result of processing one retry-queue entry.
#[derive(Debug, Serialize)]
pub struct RetryOutcome {
    pub id: RetryId,
    pub task_id: fm_core::TaskId,
    pub agent: String,
    pub status: RetryStatus,
    pub attempts: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary of one retry-queue drain.
#[derive(Debug, Default, Serialize)]
pub struct DrainOutcome {
    pub processed: Vec<RetryOutcome>,
    pub submitted: usize,
    pub retrying: usize,
    pub failed: usize,
}

impl<C: Clock> Engine<C> {
    /// Accept a completion report: persist it, move the task to `reported`,
    /// and emit `task.reported`. The caller must be operational and must own
    /// the task.
    pub fn ingest_report(&self, report: &Report) -> Result<Report, EngineError> {
        report.validate()?;

        let _state = self.lock_state();
        let mut agents = self.state().agents()?;
        self.require_operational(&agents, &report.agent)?;
        self.touch(&mut agents, &report.agent);
        self.state().put_agents(&agents)?;

        let mut tasks = self.state().tasks()?;
        let index = tasks
            .iter()
            .position(|task| task.id == report.task_id)
            .ok_or_else(|| EngineError::TaskNotFound(report.task_id.to_string()))?;
        if tasks[index].owner != report.agent {
            return Err(EngineError::Validation(format!(
                "Report agent '{}' does not match task owner '{}'",
                report.agent, tasks[index].owner
            )));
        }

        self.bus().write_report(report.task_id.as_str(), report)?;
        tasks[index].status = TaskStatus::Reported;
        tasks[index].updated_at = self.now_iso();
        self.state().put_tasks(&tasks)?;

        self.emit(
            kinds::TASK_REPORTED,
            &report.agent,
            payload_of(json!({
                "task_id": report.task_id,
                "agent": &report.agent,
                "status": &report.status,
            })),
        )?;
        Ok(report.clone())
    }

    /// Park a rejected report for retry. Pending entries are unique per
    /// `(task_id, agent)`: a newer report replaces the payload and resets
    /// the error, keeping the attempt count.
    pub fn enqueue_report_retry(
        &self,
        report: Report,
        error: &str,
    ) -> Result<RetryEntry, EngineError> {
        let _state = self.lock_state();
        let mut queue = self.state().retry_queue()?;
        let now = self.now_iso();

        let existing = queue.iter_mut().find(|entry| {
            entry.is_pending()
                && entry.report.task_id == report.task_id
                && entry.report.agent == report.agent
        });
        let entry = match existing {
            Some(entry) => {
                entry.report = report;
                entry.last_error = Some(error.to_string());
                entry.updated_at = now.clone();
                entry.next_retry_at = now;
                entry.clone()
            }
            None => {
                let entry = RetryEntry {
                    id: RetryId::new(),
                    status: RetryStatus::Pending,
                    report,
                    attempts: 0,
                    last_error: Some(error.to_string()),
                    created_at: now.clone(),
                    updated_at: now.clone(),
                    next_retry_at: now,
                };
                queue.push(entry.clone());
                entry
            }
        };
        self.state().put_retry_queue(&queue)?;

        self.emit(
            kinds::REPORT_RETRY_QUEUED,
            fm_core::SOURCE_ORCHESTRATOR,
            payload_of(json!({
                "entry_id": entry.id,
                "task_id": entry.report.task_id,
                "agent": &entry.report.agent,
                "error": error,
                "audience": [&entry.report.agent],
            })),
        )?;
        Ok(entry)
    }

    /// Drain up to `limit` due pending entries through `ingest_report`,
    /// applying exponential backoff on failure.
    pub fn process_report_retry_queue(&self, limit: usize) -> Result<DrainOutcome, EngineError> {
        let tuning = self.policy().retry_tuning();

        // Snapshot due entries, then process without holding the state lock:
        // each ingest takes it for its own read-modify-write.
        let due: Vec<RetryEntry> = {
            let _state = self.lock_state();
            let now_ms = self.clock().epoch_ms() as i64;
            self.state()
                .retry_queue()?
                .into_iter()
                .filter(|entry| {
                    entry.is_pending()
                        && super::parse_ms(&entry.next_retry_at)
                            .map(|due_ms| due_ms <= now_ms)
                            .unwrap_or(true)
                })
                .take(limit)
                .collect()
        };

        let mut outcome = DrainOutcome::default();
        for entry in due {
            let result = self.ingest_report(&entry.report);
            let updated = self.settle_retry_entry(&entry, result.err(), &tuning)?;
            match updated.status {
                RetryStatus::Submitted => outcome.submitted += 1,
                RetryStatus::Failed => outcome.failed += 1,
                RetryStatus::Pending => outcome.retrying += 1,
            }
            outcome.processed.push(updated);
        }
        Ok(outcome)
    }

    /// Record one retry attempt's result back into the queue document.
    fn settle_retry_entry(
        &self,
        entry: &RetryEntry,
        error: Option<EngineError>,
        tuning: &fm_core::RetryTuning,
    ) -> Result<RetryOutcome, EngineError> {
        let _state = self.lock_state();
        let mut queue = self.state().retry_queue()?;
        let Some(stored) = queue.iter_mut().find(|candidate| candidate.id == entry.id) else {
            return Err(EngineError::Validation(format!(
                "retry entry vanished: {}",
                entry.id
            )));
        };
        let now = self.now_iso();
        stored.updated_at = now.clone();

        let (kind, outcome_error) = match error {
            None => {
                stored.status = RetryStatus::Submitted;
                stored.last_error = None;
                (kinds::REPORT_RETRY_SUBMITTED, None)
            }
            Some(error) => {
                let message = error.to_string();
                stored.attempts += 1;
                stored.last_error = Some(message.clone());
                if stored.attempts >= tuning.max_attempts {
                    stored.status = RetryStatus::Failed;
                    (kinds::REPORT_RETRY_FAILED, Some(message))
                } else {
                    let backoff_secs = tuning
                        .base_backoff
                        .as_secs()
                        .saturating_mul(1u64 << (stored.attempts - 1).min(32))
                        .min(tuning.max_backoff.as_secs());
                    stored.next_retry_at = super::iso_from_ms(
                        self.clock().epoch_ms() + backoff_secs * 1000,
                    );
                    (kinds::REPORT_RETRY_RETRYING, Some(message))
                }
            }
        };

        let outcome = RetryOutcome {
            id: stored.id,
            task_id: stored.report.task_id,
            agent: stored.report.agent.clone(),
            status: stored.status,
            attempts: stored.attempts,
            error: outcome_error,
        };
        self.state().put_retry_queue(&queue)?;

        self.emit(
            kind,
            fm_core::SOURCE_ORCHESTRATOR,
            payload_of(json!({
                "entry_id": outcome.id,
                "task_id": outcome.task_id,
                "agent": &outcome.agent,
                "attempts": outcome.attempts,
                "error": &outcome.error,
                "audience": [&outcome.agent],
            })),
        )?;
        Ok(outcome)
    }

    /// Leader-only validation decision.
    ///
    /// Pass closes the task and every open bug sourced from it; fail opens a
    /// high-severity bug and sends the task into the bug loop.
    pub fn validate_task(
        &self,
        task_id: &str,
        passed: bool,
        notes: &str,
        source: &str,
    ) -> Result<ValidationOutcome, EngineError> {
        self.require_leader(source)?;

        let _state = self.lock_state();
        let mut tasks = self.state().tasks()?;
        let index = tasks
            .iter()
            .position(|task| task.id == task_id)
            .ok_or_else(|| EngineError::TaskNotFound(task_id.to_string()))?;
        let owner = tasks[index].owner.clone();
        let id = tasks[index].id;
        let now = self.now_iso();

        let mut bugs = self.state().bugs()?;
        let outcome = if passed {
            tasks[index].status = TaskStatus::Done;

            let mut closed_bugs = Vec::new();
            for bug in bugs.iter_mut() {
                if bug.source_task != id || bug.status == BugStatus::Closed {
                    continue;
                }
                bug.status = BugStatus::Closed;
                bug.closed_at = Some(now.clone());
                bug.resolution_note = Some(notes.to_string());
                closed_bugs.push(bug.id);
            }
            tasks[index].updated_at = now;
            self.state().put_tasks(&tasks)?;
            self.state().put_bugs(&bugs)?;

            for bug_id in closed_bugs {
                self.emit(
                    kinds::BUG_CLOSED,
                    source,
                    payload_of(json!({
                        "bug_id": bug_id,
                        "source_task": id,
                        "note": notes,
                    })),
                )?;
            }
            self.emit(
                kinds::VALIDATION_PASSED,
                source,
                payload_of(json!({"task_id": id, "owner": &owner, "notes": notes})),
            )?;
            ValidationOutcome {
                task_id: id,
                passed: true,
                owner,
                bug_id: None,
                notes: notes.to_string(),
            }
        } else {
            tasks[index].status = TaskStatus::BugOpen;
            tasks[index].updated_at = now.clone();

            let bug = Bug {
                id: BugId::new(),
                source_task: id,
                owner: owner.clone(),
                severity: Severity::High,
                repro_steps: notes.to_string(),
                expected: "Task meets acceptance criteria".to_string(),
                actual: "Validation failed".to_string(),
                status: BugStatus::Open,
                created_at: now,
                closed_at: None,
                resolution_note: None,
            };
            let bug_id = bug.id;
            bugs.push(bug);
            self.state().put_tasks(&tasks)?;
            self.state().put_bugs(&bugs)?;

            self.emit(
                kinds::VALIDATION_FAILED,
                source,
                payload_of(json!({
                    "task_id": id,
                    "bug_id": bug_id,
                    "owner": &owner,
                    "notes": notes,
                })),
            )?;
            ValidationOutcome {
                task_id: id,
                passed: false,
                owner,
                bug_id: Some(bug_id),
                notes: notes.to_string(),
            }
        };
        Ok(outcome)
    }

    /// Bugs, optionally filtered by status and owner.
    pub fn list_bugs(
        &self,
        status: Option<fm_core::BugStatus>,
        owner: Option<&str>,
    ) -> Result<Vec<Bug>, EngineError> {
        let mut bugs = self.state().bugs()?;
        if let Some(status) = status {
            bugs.retain(|bug| bug.status == status);
        }
        if let Some(owner) = owner {
            bugs.retain(|bug| bug.owner == owner);
        }
        Ok(bugs)
    }
}

#[cfg(test)]
#[path = "reports_tests.rs"]
mod tests;
