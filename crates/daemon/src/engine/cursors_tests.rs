// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::engine::test_helpers::harness;
use super::*;
use fm_core::event::kinds;
use std::time::Duration;

#[tokio::test]
async fn poll_requires_operational_agent() {
    let h = harness();
    let err = h
        .engine
        .poll_events("ghost", None, 50, Duration::ZERO, true)
        .await
        .unwrap_err();
    assert!(err
        .to_string()
        .starts_with("agent_not_operational_or_wrong_project"));
}

#[tokio::test]
async fn poll_delivers_and_advances() {
    let h = harness();
    h.connect("claude_code");
    // connect() emitted agent.registered at index 0.
    h.engine
        .publish_event("task.note", "codex", serde_json::Map::new(), &[])
        .unwrap();

    let polled = h
        .engine
        .poll_events("claude_code", None, 50, Duration::ZERO, true)
        .await
        .unwrap();

    assert_eq!(polled.cursor, 0);
    assert_eq!(polled.events.len(), 2);
    assert_eq!(polled.next_cursor, 2);
    assert_eq!(polled.events[0].offset, 0);
    assert_eq!(h.engine.get_agent_cursor("claude_code").unwrap(), 2);

    // A second poll sees nothing new (its own poll does not emit events).
    let again = h
        .engine
        .poll_events("claude_code", None, 50, Duration::ZERO, true)
        .await
        .unwrap();
    assert!(again.events.is_empty());
    assert_eq!(again.cursor, 2);
}

#[tokio::test]
async fn audience_filtered_events_advance_but_do_not_deliver() {
    let h = harness();
    h.connect("claude_code");
    h.connect("gemini");
    let start = h.engine.bus().event_count().unwrap();

    h.engine
        .publish_event(
            "manager.note",
            "codex",
            serde_json::Map::new(),
            &["claude_code".to_string()],
        )
        .unwrap();

    let gemini = h
        .engine
        .poll_events("gemini", Some(start), 50, Duration::ZERO, true)
        .await
        .unwrap();
    assert!(gemini.events.is_empty());
    assert_eq!(gemini.next_cursor, start + 1);

    let claude = h
        .engine
        .poll_events("claude_code", Some(start), 50, Duration::ZERO, true)
        .await
        .unwrap();
    assert_eq!(claude.events.len(), 1);
    assert_eq!(claude.events[0].event.kind, "manager.note");

    // Exactly once: the cursor has moved past it.
    let claude_again = h
        .engine
        .poll_events("claude_code", None, 50, Duration::ZERO, true)
        .await
        .unwrap();
    assert!(claude_again.events.is_empty());
}

#[tokio::test]
async fn limit_stops_delivery_and_cursor_together() {
    let h = harness();
    h.connect("claude_code");
    let start = h.engine.bus().event_count().unwrap();
    for n in 0..5 {
        h.engine
            .publish_event(
                &format!("note.{n}"),
                "codex",
                serde_json::Map::new(),
                &[],
            )
            .unwrap();
    }

    let polled = h
        .engine
        .poll_events("claude_code", Some(start), 2, Duration::ZERO, true)
        .await
        .unwrap();
    assert_eq!(polled.events.len(), 2);
    assert_eq!(polled.next_cursor, start + 2);

    let rest = h
        .engine
        .poll_events("claude_code", None, 50, Duration::ZERO, true)
        .await
        .unwrap();
    assert_eq!(rest.events.len(), 3);
}

#[tokio::test]
async fn explicit_cursor_does_not_require_stored_state() {
    let h = harness();
    h.connect("claude_code");
    h.engine
        .publish_event("note", "codex", serde_json::Map::new(), &[])
        .unwrap();

    let polled = h
        .engine
        .poll_events("claude_code", Some(0), 50, Duration::ZERO, false)
        .await
        .unwrap();
    assert!(!polled.events.is_empty());
    // auto_advance=false leaves the stored cursor untouched.
    assert_eq!(h.engine.get_agent_cursor("claude_code").unwrap(), 0);
}

#[tokio::test]
async fn zero_timeout_returns_immediately() {
    let h = harness();
    h.connect("claude_code");
    let started = std::time::Instant::now();
    h.engine
        .poll_events("claude_code", None, 50, Duration::ZERO, true)
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_millis(150));
}

#[tokio::test]
async fn positive_timeout_returns_within_bound() {
    let h = harness();
    h.connect("claude_code");
    // Consume everything so the wait actually waits.
    h.engine
        .poll_events("claude_code", None, 50, Duration::ZERO, true)
        .await
        .unwrap();

    let started = std::time::Instant::now();
    let polled = h
        .engine
        .poll_events("claude_code", None, 50, Duration::from_millis(200), true)
        .await
        .unwrap();
    assert!(polled.events.is_empty());
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(190), "returned too early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(350), "overslept: {elapsed:?}");
}

#[test]
fn ack_event_dedupes() {
    let h = harness();
    h.engine.ack_event("claude_code", "EVT-0000000001").unwrap();
    h.engine.ack_event("claude_code", "EVT-0000000001").unwrap();
    h.engine.ack_event("claude_code", "EVT-0000000002").unwrap();

    let acks = h.engine.state().acks().unwrap();
    assert_eq!(acks["claude_code"].len(), 2);
    assert_eq!(h.events_of(kinds::EVENT_ACKED).len(), 3);
}
