// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::engine::test_helpers::harness;
use fm_core::test_support::identity_metadata;
use std::time::Duration;

#[test]
fn complete_identity_in_project_verifies() {
    let h = harness();
    h.connect("claude_code");

    let agents = h.engine.state().agents().unwrap();
    let verification = h.engine.verification(&agents["claude_code"]);
    assert!(verification.identity_complete);
    assert!(verification.same_project);
    assert!(verification.fresh);
    assert!(verification.verified);
    assert!(verification.operational);
}

#[test]
fn freshness_is_not_required_for_operational() {
    let h = harness();
    h.connect("claude_code");
    h.clock.advance(Duration::from_secs(4000));

    let agents = h.engine.state().agents().unwrap();
    let verification = h.engine.verification(&agents["claude_code"]);
    assert!(!verification.fresh);
    assert!(!verification.verified);
    assert!(verification.operational);
}

#[test]
fn missing_identity_keys_block_operational() {
    let h = harness();
    let mut metadata = identity_metadata(h.dir.path());
    metadata.remove("session_id");
    h.engine.register_agent("gemini", metadata).unwrap();

    let agents = h.engine.state().agents().unwrap();
    let verification = h.engine.verification(&agents["gemini"]);
    assert!(!verification.identity_complete);
    assert!(verification.missing_identity.contains(&"session_id"));
    assert!(!verification.operational);
}

#[test]
fn cwd_inside_root_counts_as_same_project() {
    let h = harness();
    let nested = h.dir.path().join("src").join("deep");
    std::fs::create_dir_all(&nested).unwrap();
    let mut metadata = identity_metadata(h.dir.path());
    metadata.remove("project_root");
    metadata.insert(
        "cwd".to_string(),
        serde_json::json!(nested.display().to_string()),
    );
    h.engine.register_agent("gemini", metadata).unwrap();

    let agents = h.engine.state().agents().unwrap();
    assert!(h.engine.same_project(&agents["gemini"]));
}

#[test]
fn foreign_project_root_fails_same_project() {
    let h = harness();
    let elsewhere = tempfile::tempdir().unwrap();
    h.connect_elsewhere("gemini", elsewhere.path());

    let agents = h.engine.state().agents().unwrap();
    let verification = h.engine.verification(&agents["gemini"]);
    assert!(verification.identity_complete);
    assert!(!verification.same_project);
    assert!(!verification.operational);
}

#[test]
fn require_operational_names_the_failure() {
    let h = harness();
    let agents = h.engine.state().agents().unwrap();
    let err = h.engine.require_operational(&agents, "ghost").unwrap_err();
    assert!(err
        .to_string()
        .starts_with("agent_not_operational_or_wrong_project"));
}

#[test]
fn diagnostic_reason_precedence() {
    let h = harness();

    // Unregistered
    let agents = h.engine.state().agents().unwrap();
    let diag = h.engine.diagnostic(&agents, &[], "ghost", 600);
    assert!(!diag.registered);
    assert_eq!(diag.reason, "not_registered");

    // Stale but otherwise healthy
    h.connect("claude_code");
    h.clock.advance(Duration::from_secs(700));
    let agents = h.engine.state().agents().unwrap();
    let diag = h.engine.diagnostic(&agents, &[], "claude_code", 600);
    assert!(diag.registered);
    assert!(!diag.active);
    assert_eq!(diag.reason, "stale_heartbeat");

    // Wrong project beats staleness in the explanation
    let elsewhere = tempfile::tempdir().unwrap();
    h.connect_elsewhere("gemini", elsewhere.path());
    h.clock.advance(Duration::from_secs(700));
    let agents = h.engine.state().agents().unwrap();
    let diag = h.engine.diagnostic(&agents, &[], "gemini", 600);
    assert_eq!(diag.reason, "wrong_project");
}

#[test]
fn diagnostic_counts_open_tasks() {
    let h = harness();
    h.connect("claude_code");
    h.engine
        .create_task("Build X", fm_core::Workstream::Backend, "", vec![], None)
        .unwrap();

    let agents = h.engine.state().agents().unwrap();
    let tasks = h.engine.state().tasks().unwrap();
    let diag = h.engine.diagnostic(&agents, &tasks, "claude_code", 600);
    assert_eq!(diag.open_tasks, 1);
}
