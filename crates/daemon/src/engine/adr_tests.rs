// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::engine::test_helpers::harness;
use super::*;
use fm_core::event::kinds;
use std::collections::BTreeMap;

fn votes(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(agent, choice)| (agent.to_string(), choice.to_string()))
        .collect()
}

#[test]
fn majority_vote_wins_and_writes_adr() {
    let h = harness();
    let outcome = h
        .engine
        .record_architecture_decision(
            "Storage engine",
            &["postgres".to_string(), "sqlite".to_string()],
            &votes(&[
                ("codex", "postgres"),
                ("claude_code", "postgres"),
                ("gemini", "sqlite"),
            ]),
            &votes(&[("codex", "battle tested")]),
        )
        .unwrap();

    assert_eq!(outcome.winner, "postgres");
    assert!(outcome.decision_id.starts_with("ADR-"));
    assert_eq!(outcome.decision_id.len(), "ADR-".len() + 6);

    let body = std::fs::read_to_string(&outcome.path).unwrap();
    assert!(body.contains("# ADR-"));
    assert!(body.contains("Storage engine"));
    assert!(body.contains("- Winner: postgres"));
    assert!(body.contains("- codex: battle tested"));
    assert!(body.contains("- gemini: No rationale provided"));

    let decided = h.events_of(kinds::ARCHITECTURE_DECIDED);
    assert_eq!(decided.len(), 1);
    assert_eq!(decided[0].source, fm_core::SOURCE_GOVERNANCE);
    assert_eq!(decided[0].payload["winner"], "postgres");
}

#[test]
fn every_policy_voter_must_vote() {
    let h = harness();
    let err = h
        .engine
        .record_architecture_decision(
            "Topic",
            &["a".to_string()],
            &votes(&[("codex", "a")]),
            &BTreeMap::new(),
        )
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Missing votes for"));
    assert!(message.contains("claude_code"));
    assert!(message.contains("gemini"));
}

#[test]
fn unknown_option_is_rejected() {
    let h = harness();
    let err = h
        .engine
        .record_architecture_decision(
            "Topic",
            &["a".to_string()],
            &votes(&[("codex", "b"), ("claude_code", "a"), ("gemini", "a")]),
            &BTreeMap::new(),
        )
        .unwrap_err();
    assert!(err.to_string().contains("unknown option"));
}

#[test]
fn tie_goes_to_first_declared_option() {
    let h = harness();
    let outcome = h
        .engine
        .record_architecture_decision(
            "Topic",
            &["first".to_string(), "second".to_string()],
            &votes(&[
                ("codex", "second"),
                ("claude_code", "first"),
                ("gemini", "second"),
            ]),
            &BTreeMap::new(),
        )
        .unwrap();
    assert_eq!(outcome.winner, "second");

    let tie = h
        .engine
        .record_architecture_decision(
            "Tie",
            &["first".to_string(), "second".to_string()],
            &votes(&[
                ("codex", "second"),
                ("claude_code", "first"),
                ("gemini", "first"),
            ]),
            &BTreeMap::new(),
        )
        .unwrap();
    assert_eq!(tie.winner, "first");
}

#[test]
fn empty_options_rejected() {
    let h = harness();
    let err = h
        .engine
        .record_architecture_decision("Topic", &[], &BTreeMap::new(), &BTreeMap::new())
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}
