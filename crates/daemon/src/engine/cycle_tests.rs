// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::engine::test_helpers::harness;
use fm_core::event::kinds;
use fm_core::test_support::report_for;
use fm_core::{TaskStatus, Workstream};
use std::time::Duration;

#[tokio::test]
async fn cycle_validates_reported_tasks_from_report_files() {
    let h = harness();
    h.connect("claude_code");
    let created = h
        .engine
        .create_task("Build X", Workstream::Backend, "", vec![], None)
        .unwrap();
    h.engine.claim_next("claude_code").unwrap();
    h.engine
        .ingest_report(&report_for(created.task.id, "claude_code", 0))
        .unwrap();

    let outcome = h.engine.manager_cycle(true).await.unwrap();

    assert_eq!(outcome.processed_reports.len(), 1);
    assert!(outcome.processed_reports[0].passed);
    let task = &h.engine.list_tasks(None, None).unwrap()[0];
    assert_eq!(task.status, TaskStatus::Done);
    assert_eq!(h.events_of(kinds::VALIDATION_PASSED).len(), 1);
}

#[tokio::test]
async fn cycle_fails_reports_with_failing_tests() {
    let h = harness();
    h.connect("claude_code");
    let created = h
        .engine
        .create_task("Build X", Workstream::Backend, "", vec![], None)
        .unwrap();
    h.engine.claim_next("claude_code").unwrap();
    h.engine
        .ingest_report(&report_for(created.task.id, "claude_code", 1))
        .unwrap();

    let outcome = h.engine.manager_cycle(true).await.unwrap();

    assert!(!outcome.processed_reports[0].passed);
    let task = &h.engine.list_tasks(None, None).unwrap()[0];
    assert_eq!(task.status, TaskStatus::BugOpen);
    assert_eq!(
        h.engine
            .list_bugs(Some(fm_core::BugStatus::Open), None)
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn full_bug_loop_round_trip() {
    let h = harness();
    h.connect("claude_code");
    let created = h
        .engine
        .create_task("Build X", Workstream::Backend, "", vec![], None)
        .unwrap();
    let id = created.task.id;

    h.engine.claim_next("claude_code").unwrap();
    h.engine
        .ingest_report(&report_for(id, "claude_code", 1))
        .unwrap();
    h.engine.manager_cycle(true).await.unwrap();
    assert_eq!(
        h.engine.list_tasks(None, None).unwrap()[0].status,
        TaskStatus::BugOpen
    );

    // Re-claim, fix, resubmit clean.
    let reclaimed = h.engine.claim_next("claude_code").unwrap().unwrap();
    assert_eq!(reclaimed.id, id);
    h.engine
        .ingest_report(&report_for(id, "claude_code", 0))
        .unwrap();
    h.engine.manager_cycle(true).await.unwrap();

    let task = &h.engine.list_tasks(None, None).unwrap()[0];
    assert_eq!(task.status, TaskStatus::Done);
    let bugs = h.engine.list_bugs(None, None).unwrap();
    assert_eq!(bugs.len(), 1);
    assert_eq!(bugs[0].status, fm_core::BugStatus::Closed);
}

#[tokio::test]
async fn missing_report_file_fails_validation() {
    let h = harness();
    let created = h
        .engine
        .create_task("Build X", Workstream::Backend, "", vec![], None)
        .unwrap();
    // Force reported state without a report file.
    let mut tasks = h.engine.state().tasks().unwrap();
    tasks[0].status = TaskStatus::Reported;
    h.engine.state().put_tasks(&tasks).unwrap();

    let outcome = h.engine.manager_cycle(false).await.unwrap();
    assert_eq!(outcome.processed_reports.len(), 1);
    assert!(!outcome.processed_reports[0].passed);
    assert!(outcome.processed_reports[0].notes.contains("Missing report file"));
    assert_eq!(
        h.engine.list_tasks(None, None).unwrap()[0].status,
        TaskStatus::BugOpen
    );
    let _ = created;
}

#[tokio::test]
async fn strict_mode_rejects_blank_commit_sha() {
    let h = harness();
    h.connect("claude_code");
    let created = h
        .engine
        .create_task("Build X", Workstream::Backend, "", vec![], None)
        .unwrap();
    h.engine.claim_next("claude_code").unwrap();
    // Write the report file directly so the blank sha bypasses ingest checks.
    let mut report = report_for(created.task.id, "claude_code", 0);
    report.commit_sha = "  ".to_string();
    h.engine
        .bus()
        .write_report(created.task.id.as_str(), &report)
        .unwrap();
    let mut tasks = h.engine.state().tasks().unwrap();
    tasks[0].status = TaskStatus::Reported;
    h.engine.state().put_tasks(&tasks).unwrap();

    let lenient = h.engine.manager_cycle(false).await.unwrap();
    assert!(lenient.processed_reports[0].passed);

    // Reset for the strict pass.
    let mut tasks = h.engine.state().tasks().unwrap();
    tasks[0].status = TaskStatus::Reported;
    h.engine.state().put_tasks(&tasks).unwrap();
    let strict = h.engine.manager_cycle(true).await.unwrap();
    assert!(!strict.processed_reports[0].passed);
}

#[tokio::test]
async fn cycle_drains_retry_queue_first() {
    let h = harness();
    let created = h
        .engine
        .create_task("Build X", Workstream::Backend, "", vec![], None)
        .unwrap();
    h.engine
        .enqueue_report_retry(
            report_for(created.task.id, "claude_code", 0),
            "owner offline",
        )
        .unwrap();
    h.connect("claude_code");

    let outcome = h.engine.manager_cycle(true).await.unwrap();

    // The queued report lands, then the same cycle validates it to done.
    assert_eq!(outcome.report_retry_queue.submitted, 1);
    assert_eq!(outcome.processed_reports.len(), 1);
    let task = &h.engine.list_tasks(None, None).unwrap()[0];
    assert_eq!(task.status, TaskStatus::Done);
}

#[tokio::test]
async fn cycle_publishes_pending_contracts_and_rollup() {
    let h = harness();
    h.connect("claude_code");
    h.engine
        .create_task("Build X", Workstream::Backend, "", vec![], None)
        .unwrap();
    h.engine
        .create_task("Build Y", Workstream::Frontend, "", vec![], None)
        .unwrap();

    let outcome = h.engine.manager_cycle(false).await.unwrap();

    assert_eq!(outcome.pending_total, 2);
    assert_eq!(outcome.remaining_by_owner["claude_code"].pending, 1);
    assert_eq!(outcome.remaining_by_owner["gemini"].pending, 1);

    let contracts = h.events_of(kinds::MANAGER_TASK_CONTRACTS);
    assert_eq!(contracts.len(), 1);
    let published = contracts[0].payload["contracts"].as_array().unwrap();
    assert_eq!(published.len(), 2);
    assert!(published[0].get("acceptance_criteria").is_some());
}

#[tokio::test(start_paused = true)]
async fn cycle_reconnects_then_reassigns_stale_owner_work() {
    let h = harness();
    h.connect("gemini");
    h.engine
        .create_task("Build X", Workstream::Backend, "", vec![], Some("gemini".into()))
        .unwrap();
    h.engine.claim_next("gemini").unwrap();

    // gemini goes dark past the heartbeat timeout; claude_code is healthy.
    h.clock.advance(Duration::from_secs(700));
    h.connect("claude_code");

    let outcome = h.engine.manager_cycle(true).await.unwrap();

    assert!(outcome.auto_connect.attempted);
    assert_eq!(outcome.auto_connect.requested, vec!["gemini"]);
    assert_eq!(outcome.auto_connect.status, "timeout");
    assert_eq!(outcome.stale_reassignments.len(), 1);
    assert_eq!(outcome.stale_reassignments[0].to, "claude_code");

    let task = &h.engine.list_tasks(None, None).unwrap()[0];
    assert_eq!(task.owner, "claude_code");
    assert_eq!(task.status, TaskStatus::Assigned);
}

#[tokio::test]
async fn cycle_skips_reconnect_when_everyone_is_healthy() {
    let h = harness();
    h.connect("claude_code");
    h.engine
        .create_task("Build X", Workstream::Backend, "", vec![], None)
        .unwrap();
    h.engine.claim_next("claude_code").unwrap();

    let outcome = h.engine.manager_cycle(true).await.unwrap();
    assert!(!outcome.auto_connect.attempted);
    assert_eq!(outcome.auto_connect.status, "skipped");
}
