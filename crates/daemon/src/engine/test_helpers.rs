// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests: a tempdir-rooted engine on a manual
//! clock with the codex/claude_code/gemini trio wired through policy.

use super::Engine;
use fm_core::test_support::identity_metadata;
use fm_core::{Event, ManualClock, Policy};
use tempfile::TempDir;

pub(crate) struct Harness {
    pub dir: TempDir,
    pub clock: ManualClock,
    pub engine: Engine<ManualClock>,
}

pub(crate) fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new();
    let policy: Policy = serde_json::from_value(serde_json::json!({
        "name": "test-policy",
        "roles": {"manager": "codex"},
        "routing": {
            "backend": "claude_code",
            "frontend": "gemini",
            "default": "claude_code",
        },
    }))
    .unwrap();
    let engine = Engine::with_clock(dir.path(), policy, clock.clone()).unwrap();
    Harness { dir, clock, engine }
}

impl Harness {
    /// Register `agent` with complete identity rooted in this workspace.
    pub fn connect(&self, agent: &str) {
        self.engine
            .register_agent(agent, identity_metadata(self.dir.path()))
            .unwrap();
    }

    /// Register `agent` with identity pointing at a foreign project root.
    pub fn connect_elsewhere(&self, agent: &str, other_root: &std::path::Path) {
        self.engine
            .register_agent(agent, identity_metadata(other_root))
            .unwrap();
    }

    /// All events currently on the bus.
    pub fn events(&self) -> Vec<Event> {
        self.engine
            .bus()
            .events_from(0)
            .unwrap()
            .into_iter()
            .map(|(_, event)| event)
            .collect()
    }

    /// Events of one kind.
    pub fn events_of(&self, kind: &str) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|event| event.kind == kind)
            .collect()
    }
}
