// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end orchestration scenarios.
//!
//! Each test drives a full engine on a scratch workspace through the same
//! sequences the distributed agents perform: handshake, claim, report,
//! validate, and the recovery paths around them.

use fm_core::event::kinds;
use fm_core::test_support::{identity_metadata, report_for};
use fm_core::{ManualClock, Policy, Report, TaskStatus, TestSummary, Workstream};
use fm_daemon::engine::Engine;
use std::time::Duration;
use tempfile::TempDir;

struct Project {
    dir: TempDir,
    clock: ManualClock,
    engine: Engine<ManualClock>,
}

/// codex leads; backend routes to claude_code, frontend to gemini.
fn project() -> Project {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new();
    let policy: Policy = serde_json::from_value(serde_json::json!({
        "name": "trio",
        "roles": {"manager": "codex"},
        "routing": {
            "backend": "claude_code",
            "frontend": "gemini",
            "default": "claude_code",
        },
    }))
    .unwrap();
    let engine = Engine::with_clock(dir.path(), policy, clock.clone()).unwrap();
    engine.bootstrap().unwrap();
    Project { dir, clock, engine }
}

impl Project {
    fn handshake(&self, agent: &str) {
        let report = self
            .engine
            .connect_to_leader(
                agent,
                identity_metadata(self.dir.path()),
                "idle",
                true,
                Some(agent),
                None,
            )
            .unwrap();
        assert!(report.connected, "{agent} failed to connect: {:?}", report.reason);
    }

    fn events_of(&self, kind: &str) -> Vec<fm_core::Event> {
        self.engine
            .bus()
            .events_from(0)
            .unwrap()
            .into_iter()
            .map(|(_, event)| event)
            .filter(|event| event.kind == kind)
            .collect()
    }
}

#[tokio::test]
async fn happy_path_from_creation_to_done() {
    let p = project();

    // Leader creates the task; policy routes it to claude_code.
    let created = p
        .engine
        .create_task(
            "Build X",
            Workstream::Backend,
            "",
            vec!["tests pass".to_string()],
            None,
        )
        .unwrap();
    assert_eq!(created.task.owner, "claude_code");

    // The worker handshakes with full identity; the connect auto-claims.
    p.handshake("claude_code");
    let task = p.engine.list_tasks(None, None).unwrap().remove(0);
    assert_eq!(task.status, TaskStatus::InProgress);

    // Report lands, strict manager cycle validates to done.
    let report = Report {
        task_id: created.task.id,
        agent: "claude_code".to_string(),
        commit_sha: "abc".to_string(),
        status: "done".to_string(),
        test_summary: TestSummary {
            command: "pytest".to_string(),
            passed: 3,
            failed: 0,
        },
        artifacts: Vec::new(),
        notes: String::new(),
    };
    p.engine.ingest_report(&report).unwrap();
    p.engine.manager_cycle(true).await.unwrap();

    let task = p.engine.list_tasks(None, None).unwrap().remove(0);
    assert_eq!(task.status, TaskStatus::Done);
    assert_eq!(p.events_of(kinds::VALIDATION_PASSED).len(), 1);
}

#[tokio::test]
async fn bug_loop_reopens_then_closes() {
    let p = project();
    let created = p
        .engine
        .create_task("Build X", Workstream::Backend, "", vec![], None)
        .unwrap();
    let id = created.task.id;
    p.handshake("claude_code");

    // First report fails one test: validation opens a high-severity bug.
    p.engine
        .ingest_report(&report_for(id, "claude_code", 1))
        .unwrap();
    p.engine.manager_cycle(true).await.unwrap();

    let task = p.engine.list_tasks(None, None).unwrap().remove(0);
    assert_eq!(task.status, TaskStatus::BugOpen);
    let bugs = p.engine.list_bugs(None, None).unwrap();
    assert_eq!(bugs.len(), 1);
    assert_eq!(bugs[0].severity, fm_core::Severity::High);
    assert_eq!(bugs[0].source_task, id);

    // Re-claim, fix, resubmit clean: the task closes and so does the bug.
    let reclaimed = p.engine.claim_next("claude_code").unwrap().unwrap();
    assert_eq!(reclaimed.id, id);
    p.engine
        .ingest_report(&report_for(id, "claude_code", 0))
        .unwrap();
    p.engine.manager_cycle(true).await.unwrap();

    let task = p.engine.list_tasks(None, None).unwrap().remove(0);
    assert_eq!(task.status, TaskStatus::Done);
    let bugs = p.engine.list_bugs(None, None).unwrap();
    assert_eq!(bugs[0].status, fm_core::BugStatus::Closed);
}

#[test]
fn stale_owner_work_moves_to_least_loaded_member() {
    let p = project();
    p.handshake("gemini");
    let created = p
        .engine
        .create_task(
            "Polish the UI",
            Workstream::Frontend,
            "",
            vec![],
            None,
        )
        .unwrap();
    assert_eq!(created.task.owner, "gemini");
    p.engine.claim_next("gemini").unwrap().unwrap();
    let task = p.engine.list_tasks(None, None).unwrap().remove(0);
    assert_eq!(task.status, TaskStatus::InProgress);

    // gemini's heartbeat ages past the policy timeout; claude_code is live.
    p.clock.advance(Duration::from_secs(700));
    p.handshake("claude_code");

    let reassigned = p
        .engine
        .reassign_stale_tasks("codex", 600, true)
        .unwrap();
    assert_eq!(reassigned.len(), 1);

    let task = p.engine.list_tasks(None, None).unwrap().remove(0);
    assert_eq!(task.owner, "claude_code");
    assert_eq!(task.status, TaskStatus::Assigned);
    assert_eq!(task.reassigned_from.as_deref(), Some("gemini"));
    assert!(task.degraded_comm);
    assert_eq!(p.events_of(kinds::TASK_REASSIGNED_STALE).len(), 1);
}

#[test]
fn cross_project_agents_cannot_claim() {
    let p = project();
    let elsewhere = tempfile::tempdir().unwrap();
    p.engine
        .register_agent("claude_code", identity_metadata(elsewhere.path()))
        .unwrap();
    p.engine
        .create_task("Build X", Workstream::Backend, "", vec![], None)
        .unwrap();

    let err = p.engine.claim_next("claude_code").unwrap_err();
    assert!(err
        .to_string()
        .starts_with("agent_not_operational_or_wrong_project"));
    let task = p.engine.list_tasks(None, None).unwrap().remove(0);
    assert_eq!(task.status, TaskStatus::Assigned);
}

#[tokio::test]
async fn audience_filtering_delivers_exactly_once() {
    let p = project();
    p.handshake("claude_code");
    p.handshake("gemini");
    let start = p.engine.bus().event_count().unwrap();

    p.engine
        .publish_event(
            "manager.briefing",
            "codex",
            serde_json::Map::new(),
            &["claude_code".to_string()],
        )
        .unwrap();

    // gemini's cursor passes the event without seeing it.
    let gemini = p
        .engine
        .poll_events("gemini", Some(start), 50, Duration::ZERO, true)
        .await
        .unwrap();
    assert!(gemini.events.is_empty());
    assert_eq!(gemini.next_cursor, start + 1);

    // claude_code sees it exactly once.
    let first = p
        .engine
        .poll_events("claude_code", Some(start), 50, Duration::ZERO, true)
        .await
        .unwrap();
    let briefings: Vec<_> = first
        .events
        .iter()
        .filter(|delivered| delivered.event.kind == "manager.briefing")
        .collect();
    assert_eq!(briefings.len(), 1);

    let second = p
        .engine
        .poll_events("claude_code", None, 50, Duration::ZERO, true)
        .await
        .unwrap();
    assert!(second.events.is_empty());
}

#[test]
fn duplicate_creation_within_a_second_yields_one_task() {
    let p = project();
    let first = p
        .engine
        .create_task("Build X", Workstream::Backend, "", vec![], None)
        .unwrap();
    let second = p
        .engine
        .create_task("Build X", Workstream::Backend, "", vec![], None)
        .unwrap();

    assert!(!first.deduplicated);
    assert!(second.deduplicated);
    assert_eq!(second.task.id, first.task.id);
    assert_eq!(p.engine.list_tasks(None, None).unwrap().len(), 1);
}

#[tokio::test]
async fn done_tasks_always_trace_back_to_a_validated_report() {
    let p = project();
    p.handshake("claude_code");
    let created = p
        .engine
        .create_task("Build X", Workstream::Backend, "", vec![], None)
        .unwrap();
    p.engine
        .ingest_report(&report_for(created.task.id, "claude_code", 0))
        .unwrap();
    p.engine.manager_cycle(true).await.unwrap();

    for task in p.engine.list_tasks(None, None).unwrap() {
        if task.status == TaskStatus::Done {
            let stored: Option<Report> =
                p.engine.bus().read_report(task.id.as_str()).unwrap();
            assert!(stored.is_some(), "done task without report file");
            let open_bugs = p
                .engine
                .list_bugs(Some(fm_core::BugStatus::Open), None)
                .unwrap();
            assert!(open_bugs.iter().all(|bug| bug.source_task != task.id));
        }
    }
}

#[test]
fn blocker_keeps_task_blocked_until_resolution() {
    let p = project();
    p.handshake("claude_code");
    let created = p
        .engine
        .create_task("Build X", Workstream::Backend, "", vec![], None)
        .unwrap();

    let blocker = p
        .engine
        .raise_blocker(
            created.task.id.as_str(),
            "claude_code",
            "Which API version?",
            vec!["v1".to_string(), "v2".to_string()],
            fm_core::Severity::Medium,
        )
        .unwrap();
    let task = p.engine.list_tasks(None, None).unwrap().remove(0);
    assert_eq!(task.status, TaskStatus::Blocked);

    let resolved = p
        .engine
        .resolve_blocker(blocker.id.as_str(), "v2", "codex")
        .unwrap();
    assert_eq!(resolved.blocker.status, fm_core::BlockerStatus::Resolved);
    let task = p.engine.list_tasks(None, None).unwrap().remove(0);
    assert_eq!(task.status, TaskStatus::InProgress);
}
