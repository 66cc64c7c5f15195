// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::engine::test_helpers::harness;
use super::*;
use fm_core::event::kinds;
use fm_core::test_support::report_for;
use fm_core::{BugStatus, RetryStatus, TaskStatus, Workstream};
use std::time::Duration;

fn setup_claimed_task(h: &crate::engine::test_helpers::Harness) -> fm_core::TaskId {
    h.connect("claude_code");
    let created = h
        .engine
        .create_task("Build X", Workstream::Backend, "", vec!["tests pass".into()], None)
        .unwrap();
    h.engine.claim_next("claude_code").unwrap();
    created.task.id
}

#[test]
fn ingest_accepts_owner_report() {
    let h = harness();
    let task_id = setup_claimed_task(&h);
    let report = report_for(task_id, "claude_code", 0);

    h.engine.ingest_report(&report).unwrap();

    let task = &h.engine.list_tasks(None, None).unwrap()[0];
    assert_eq!(task.status, TaskStatus::Reported);
    let stored: fm_core::Report = h
        .engine
        .bus()
        .read_report(task_id.as_str())
        .unwrap()
        .unwrap();
    assert_eq!(stored, report);

    let reported = h.events_of(kinds::TASK_REPORTED);
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].source, "claude_code");
}

#[test]
fn ingest_rejects_wrong_owner() {
    let h = harness();
    let task_id = setup_claimed_task(&h);
    h.connect("gemini");
    let report = report_for(task_id, "gemini", 0);

    let err = h.engine.ingest_report(&report).unwrap_err();
    assert!(err.to_string().contains("does not match task owner"));
    let task = &h.engine.list_tasks(None, None).unwrap()[0];
    assert_eq!(task.status, TaskStatus::InProgress);
}

#[test]
fn ingest_rejects_unknown_task() {
    let h = harness();
    h.connect("claude_code");
    let report = report_for(fm_core::TaskId::new(), "claude_code", 0);
    assert!(matches!(
        h.engine.ingest_report(&report).unwrap_err(),
        EngineError::TaskNotFound(_)
    ));
}

#[test]
fn ingest_rejects_blank_commit_sha() {
    let h = harness();
    let task_id = setup_claimed_task(&h);
    let mut report = report_for(task_id, "claude_code", 0);
    report.commit_sha = String::new();
    assert!(matches!(
        h.engine.ingest_report(&report).unwrap_err(),
        EngineError::Report(_)
    ));
}

#[test]
fn ingest_requires_operational_reporter() {
    let h = harness();
    let task_id = {
        let created = h
            .engine
            .create_task("Build X", Workstream::Backend, "", vec![], None)
            .unwrap();
        created.task.id
    };
    // Owner never registered identity.
    let report = report_for(task_id, "claude_code", 0);
    assert!(matches!(
        h.engine.ingest_report(&report).unwrap_err(),
        EngineError::NotOperational(_)
    ));
}

#[test]
fn enqueue_dedupes_pending_by_task_and_agent() {
    let h = harness();
    let task_id = setup_claimed_task(&h);

    let mut first = report_for(task_id, "claude_code", 1);
    first.commit_sha = "first".to_string();
    h.engine.enqueue_report_retry(first, "rejected once").unwrap();

    let mut second = report_for(task_id, "claude_code", 0);
    second.commit_sha = "second".to_string();
    let entry = h
        .engine
        .enqueue_report_retry(second, "rejected twice")
        .unwrap();

    let queue = h.engine.state().retry_queue().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].id, entry.id);
    assert_eq!(queue[0].report.commit_sha, "second");
    assert_eq!(queue[0].last_error.as_deref(), Some("rejected twice"));
    assert_eq!(h.events_of(kinds::REPORT_RETRY_QUEUED).len(), 2);
}

#[test]
fn retry_drain_submits_when_cause_clears() {
    let h = harness();
    // Task exists but the owner has no identity yet: ingest fails, queue fills.
    let created = h
        .engine
        .create_task("Build X", Workstream::Backend, "", vec![], None)
        .unwrap();
    let report = report_for(created.task.id, "claude_code", 0);
    h.engine
        .enqueue_report_retry(report, "agent_not_operational_or_wrong_project")
        .unwrap();

    // First drain still fails and schedules a backoff.
    let outcome = h.engine.process_report_retry_queue(20).unwrap();
    assert_eq!(outcome.retrying, 1);
    let queue = h.engine.state().retry_queue().unwrap();
    assert_eq!(queue[0].attempts, 1);
    assert!(queue[0].is_pending());

    // The owner connects; once the backoff elapses the retry succeeds.
    h.connect("claude_code");
    h.clock.advance(Duration::from_secs(16));
    let outcome = h.engine.process_report_retry_queue(20).unwrap();
    assert_eq!(outcome.submitted, 1);

    let queue = h.engine.state().retry_queue().unwrap();
    assert_eq!(queue[0].status, RetryStatus::Submitted);
    let task = &h.engine.list_tasks(None, None).unwrap()[0];
    assert_eq!(task.status, TaskStatus::Reported);
    assert_eq!(h.events_of(kinds::REPORT_RETRY_SUBMITTED).len(), 1);
}

#[test]
fn retry_backoff_doubles_and_caps() {
    let h = harness();
    let created = h
        .engine
        .create_task("Build X", Workstream::Backend, "", vec![], None)
        .unwrap();
    let report = report_for(created.task.id, "claude_code", 0);
    h.engine.enqueue_report_retry(report, "not operational").unwrap();

    // Base backoff is 15s: after the first failure the entry is not due
    // until 15s pass; after the second, 30s.
    h.engine.process_report_retry_queue(20).unwrap();
    let first_due = h.engine.state().retry_queue().unwrap()[0].next_retry_at.clone();
    assert_eq!(
        crate::engine::parse_ms(&first_due).unwrap(),
        h.clock.epoch_ms() as i64 + 15_000
    );

    // Not due yet: a drain right away processes nothing.
    let outcome = h.engine.process_report_retry_queue(20).unwrap();
    assert!(outcome.processed.is_empty());

    h.clock.advance(Duration::from_secs(16));
    h.engine.process_report_retry_queue(20).unwrap();
    let second_due = h.engine.state().retry_queue().unwrap()[0].next_retry_at.clone();
    assert_eq!(
        crate::engine::parse_ms(&second_due).unwrap(),
        h.clock.epoch_ms() as i64 + 30_000
    );
    assert_eq!(h.events_of(kinds::REPORT_RETRY_RETRYING).len(), 2);
}

#[test]
fn retry_fails_after_max_attempts() {
    let h = harness();
    let created = h
        .engine
        .create_task("Build X", Workstream::Backend, "", vec![], None)
        .unwrap();
    let report = report_for(created.task.id, "claude_code", 0);
    h.engine.enqueue_report_retry(report, "not operational").unwrap();

    for _ in 0..20 {
        h.engine.process_report_retry_queue(20).unwrap();
        h.clock.advance(Duration::from_secs(301));
    }

    let queue = h.engine.state().retry_queue().unwrap();
    assert_eq!(queue[0].status, RetryStatus::Failed);
    assert_eq!(queue[0].attempts, 20);
    assert_eq!(h.events_of(kinds::REPORT_RETRY_FAILED).len(), 1);

    // Failed entries are never picked up again.
    let outcome = h.engine.process_report_retry_queue(20).unwrap();
    assert!(outcome.processed.is_empty());
}

#[test]
fn validate_requires_leader() {
    let h = harness();
    let created = h
        .engine
        .create_task("Build X", Workstream::Backend, "", vec![], None)
        .unwrap();
    let err = h
        .engine
        .validate_task(created.task.id.as_str(), true, "lgtm", "claude_code")
        .unwrap_err();
    assert!(matches!(err, EngineError::LeaderMismatch(_)));
}

#[test]
fn validate_pass_closes_task_and_bugs() {
    let h = harness();
    let task_id = setup_claimed_task(&h);

    // First validation fails, opening a bug.
    let failed = h
        .engine
        .validate_task(task_id.as_str(), false, "failing tests", "codex")
        .unwrap();
    let bug_id = failed.bug_id.unwrap();
    assert_eq!(
        h.engine.list_tasks(None, None).unwrap()[0].status,
        TaskStatus::BugOpen
    );

    // Second validation passes and closes the bug.
    h.engine
        .validate_task(task_id.as_str(), true, "all green", "codex")
        .unwrap();

    let task = &h.engine.list_tasks(None, None).unwrap()[0];
    assert_eq!(task.status, TaskStatus::Done);
    let bugs = h.engine.list_bugs(None, None).unwrap();
    assert_eq!(bugs.len(), 1);
    assert_eq!(bugs[0].id, bug_id);
    assert_eq!(bugs[0].status, BugStatus::Closed);
    assert_eq!(bugs[0].resolution_note.as_deref(), Some("all green"));

    assert_eq!(h.events_of(kinds::VALIDATION_FAILED).len(), 1);
    assert_eq!(h.events_of(kinds::VALIDATION_PASSED).len(), 1);
    assert_eq!(h.events_of(kinds::BUG_CLOSED).len(), 1);
}

#[test]
fn validate_fail_opens_high_severity_bug() {
    let h = harness();
    let task_id = setup_claimed_task(&h);

    let outcome = h
        .engine
        .validate_task(task_id.as_str(), false, "1 test failing", "codex")
        .unwrap();
    assert!(!outcome.passed);

    let bugs = h.engine.list_bugs(Some(BugStatus::Open), None).unwrap();
    assert_eq!(bugs.len(), 1);
    assert_eq!(bugs[0].severity, fm_core::Severity::High);
    assert_eq!(bugs[0].source_task, task_id);
    assert_eq!(bugs[0].owner, "claude_code");
    assert_eq!(bugs[0].repro_steps, "1 test failing");
}

#[test]
fn bug_open_task_is_reclaimable() {
    let h = harness();
    let task_id = setup_claimed_task(&h);
    h.engine
        .validate_task(task_id.as_str(), false, "nope", "codex")
        .unwrap();

    let claimed = h.engine.claim_next("claude_code").unwrap().unwrap();
    assert_eq!(claimed.id, task_id);
    assert_eq!(claimed.status, TaskStatus::InProgress);
}

#[test]
fn list_bugs_filters() {
    let h = harness();
    let task_id = setup_claimed_task(&h);
    h.engine
        .validate_task(task_id.as_str(), false, "nope", "codex")
        .unwrap();

    assert_eq!(h.engine.list_bugs(Some(BugStatus::Open), None).unwrap().len(), 1);
    assert_eq!(
        h.engine
            .list_bugs(Some(BugStatus::Closed), None)
            .unwrap()
            .len(),
        0
    );
    assert_eq!(
        h.engine
            .list_bugs(None, Some("claude_code"))
            .unwrap()
            .len(),
        1
    );
    assert_eq!(h.engine.list_bugs(None, Some("gemini")).unwrap().len(), 0);
}
