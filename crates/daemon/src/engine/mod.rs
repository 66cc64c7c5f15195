// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The coordination engine.
//!
//! One [`Engine`] value owns the durable state under the project root: the
//! bus, the `state/` documents, the decisions directory, and the coarse
//! state lock. Every RPC handler and the manager-cycle daemon borrow the
//! same engine; there is no module-level mutable state.
//!
//! Locking: mutating sequences hold the coarse state lock (in-process mutex
//! plus the advisory OS lock on `state/.state.lock`) for their whole
//! read-modify-write; per-document locks nest inside it, never the reverse.
//! No lock is held across a wait.

mod adr;
mod blockers;
mod cursors;
mod cycle;
mod identity;
mod presence;
mod reports;
mod state;
mod status;
mod tasks;

pub use adr::DecisionOutcome;
pub use blockers::ResolvedBlocker;
pub use cursors::{AckOutcome, DeliveredEvent, PolledEvents};
pub use cycle::{run_auto_cycle, AutoConnect, CycleOutcome, OwnerRollup, ProcessedReport};
pub use identity::{ConnectDiagnostic, Verification};
pub use presence::{
    AgentView, ConnectOutcome, ConnectReport, DiscoveredAgents, TaskCounts,
};
pub use reports::{DrainOutcome, RetryOutcome, ValidationOutcome};
pub use state::StateDir;
pub use status::{LiveStatus, LiveStatusArgs};
pub use tasks::{CreatedTask, DedupeOutcome, ReassignedTask, RequeuedTask};

use crate::bus::EventBus;
use fm_core::{Clock, Event, EventId, Policy, Roles, SystemClock};
use fm_storage::{lock, LockGuard, LockMode, StorageError};
use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Caller is not the current leader.
    #[error("leader_mismatch: {0}")]
    LeaderMismatch(String),

    /// Non-leader tried to mutate a task it does not own.
    #[error("unauthorized_status_update: {0}")]
    UnauthorizedStatusUpdate(String),

    /// Caller's identity is incomplete or resolves outside this project.
    #[error("agent_not_operational_or_wrong_project: {0}")]
    NotOperational(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Blocker not found: {0}")]
    BlockerNotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Report(#[from] fm_core::ReportError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Coarse engine lock: thread exclusion in-process, advisory OS lock across
/// processes. Guards every multi-step read-modify-write over `state/`.
struct StateLock {
    mem: Mutex<()>,
    target: PathBuf,
}

pub(crate) struct StateGuard<'a> {
    _mem: MutexGuard<'a, ()>,
    _os: LockGuard,
}

impl StateLock {
    fn new(target: PathBuf) -> Self {
        Self { mem: Mutex::new(()), target }
    }

    fn acquire(&self) -> StateGuard<'_> {
        let mem = self.mem.lock();
        let os = lock(&self.target, LockMode::Exclusive);
        StateGuard { _mem: mem, _os: os }
    }
}

/// Bounded debug-trace window state.
#[derive(Debug, Default)]
struct DebugWindow {
    until_epoch_ms: u64,
    source: String,
    configured_minutes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DebugWindowState {
    pub enabled: bool,
    pub remaining_seconds: u64,
    pub until_utc: Option<String>,
    pub configured_minutes: u64,
    pub source: String,
}

pub struct Engine<C: Clock = SystemClock> {
    root: PathBuf,
    policy: Policy,
    bus: EventBus,
    state: StateDir,
    decisions_dir: PathBuf,
    guard: StateLock,
    debug: Mutex<DebugWindow>,
    clock: C,
}

impl Engine<SystemClock> {
    /// Open an engine on the system clock.
    pub fn open(root: impl Into<PathBuf>, policy: Policy) -> Result<Self, EngineError> {
        Self::with_clock(root, policy, SystemClock)
    }
}

impl<C: Clock> Engine<C> {
    pub fn with_clock(
        root: impl Into<PathBuf>,
        policy: Policy,
        clock: C,
    ) -> Result<Self, EngineError> {
        let root = root.into();
        let bus = EventBus::open(&root.join("bus"))?;
        let state = StateDir::new(root.join("state"));
        std::fs::create_dir_all(state.dir()).map_err(StorageError::from)?;
        let decisions_dir = root.join("decisions");
        std::fs::create_dir_all(&decisions_dir).map_err(StorageError::from)?;
        let guard = StateLock::new(state.coarse_lock_target());
        Ok(Self {
            root,
            policy,
            bus,
            state,
            decisions_dir,
            guard,
            debug: Mutex::new(DebugWindow::default()),
            clock,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub(crate) fn state(&self) -> &StateDir {
        &self.state
    }

    pub(crate) fn decisions_dir(&self) -> &Path {
        &self.decisions_dir
    }

    pub(crate) fn clock(&self) -> &C {
        &self.clock
    }

    pub(crate) fn lock_state(&self) -> StateGuard<'_> {
        self.guard.acquire()
    }

    /// Initialize state documents and announce the session.
    pub fn bootstrap(&self) -> Result<(), EngineError> {
        let _state = self.lock_state();
        let roles = self.default_roles();
        self.state.bootstrap(&roles)?;
        self.emit(
            fm_core::event::kinds::BOOTSTRAPPED,
            fm_core::SOURCE_ORCHESTRATOR,
            payload_of(serde_json::json!({
                "policy": &self.policy.name,
                "manager": self.policy.manager(),
            })),
        )?;
        Ok(())
    }

    /// Current roles: the stored document, else policy defaults.
    pub fn roles(&self) -> Result<Roles, EngineError> {
        Ok(self.state.roles()?.unwrap_or_else(|| self.default_roles()))
    }

    /// The current leader agent id.
    pub fn leader(&self) -> Result<String, EngineError> {
        Ok(self.roles()?.leader)
    }

    /// Policy-derived roles: manager leads, routing targets are members.
    fn default_roles(&self) -> Roles {
        let mut roles = Roles::new(self.policy.manager());
        for owner in self.policy.routing.values() {
            if owner != &roles.leader {
                roles.team_members.insert(owner.clone());
            }
        }
        roles
    }

    /// Leader-only role change. Takes effect for the next authority check.
    pub fn set_role(
        &self,
        agent: &str,
        role: fm_core::Role,
        source: &str,
    ) -> Result<Roles, EngineError> {
        let _state = self.lock_state();
        let mut roles = self.require_leader(source)?;
        if role == fm_core::Role::TeamMember && roles.is_leader(agent) {
            return Err(EngineError::Validation(format!(
                "'{agent}' is the current leader; assign a new leader first"
            )));
        }
        roles.assign(agent, role);
        self.state.put_roles(&roles)?;
        self.emit(
            fm_core::event::kinds::ROLE_UPDATED,
            source,
            payload_of(serde_json::json!({
                "agent": agent,
                "role": role,
                "leader": &roles.leader,
                "team_members": &roles.team_members,
            })),
        )?;
        Ok(roles)
    }

    pub(crate) fn require_leader(&self, source: &str) -> Result<Roles, EngineError> {
        let roles = self.roles()?;
        if !roles.is_leader(source) {
            return Err(EngineError::LeaderMismatch(format!(
                "'{source}' is not the leader ('{}')",
                roles.leader
            )));
        }
        Ok(roles)
    }

    pub(crate) fn heartbeat_timeout_secs(&self) -> u64 {
        self.policy.heartbeat_timeout().as_secs()
    }

    /// Current wall-clock time as an RFC 3339 UTC string.
    pub(crate) fn now_iso(&self) -> String {
        iso_from_ms(self.clock.epoch_ms())
    }

    /// Age of an RFC 3339 timestamp in whole seconds; `None` when unparseable.
    pub(crate) fn age_seconds(&self, timestamp: &str) -> Option<i64> {
        let then = parse_ms(timestamp)?;
        Some((self.clock.epoch_ms() as i64 - then) / 1000)
    }

    /// Append an event to the bus, stamped with this engine's clock.
    pub(crate) fn emit(
        &self,
        kind: &str,
        source: &str,
        payload: Map<String, Value>,
    ) -> Result<Event, EngineError> {
        let event = Event {
            event_id: EventId::new(),
            timestamp: self.now_iso(),
            kind: kind.to_string(),
            source: source.to_string(),
            payload,
        };
        self.bus.emit(&event)?;
        Ok(event)
    }

    /// Publish a caller-supplied event, folding the audience into the payload.
    pub fn publish_event(
        &self,
        kind: &str,
        source: &str,
        payload: Map<String, Value>,
        audience: &[String],
    ) -> Result<Event, EngineError> {
        let mut payload = payload;
        if !audience.is_empty() {
            payload.insert(
                "audience".to_string(),
                Value::Array(audience.iter().cloned().map(Value::String).collect()),
            );
        }
        self.emit(kind, source, payload)
    }

    /// Open a bounded debug-trace window (1–240 minutes).
    pub fn enable_debug_logging(&self, duration_minutes: u64, source: &str) -> DebugWindowState {
        let minutes = duration_minutes.clamp(1, 240);
        {
            let mut window = self.debug.lock();
            window.until_epoch_ms = self.clock.epoch_ms() + minutes * 60_000;
            window.source = source.to_string();
            window.configured_minutes = minutes;
        }
        self.debug_window_state()
    }

    pub fn debug_window_state(&self) -> DebugWindowState {
        let now = self.clock.epoch_ms();
        let window = self.debug.lock();
        let enabled = window.until_epoch_ms > now;
        DebugWindowState {
            enabled,
            remaining_seconds: window.until_epoch_ms.saturating_sub(now) / 1000,
            until_utc: enabled.then(|| iso_from_ms(window.until_epoch_ms)),
            configured_minutes: window.configured_minutes,
            source: window.source.clone(),
        }
    }
}

/// RFC 3339 UTC rendering of an epoch-milliseconds instant.
pub(crate) fn iso_from_ms(ms: u64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(ms as i64)
        .unwrap_or_default()
        .to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Epoch milliseconds of an RFC 3339 timestamp.
pub(crate) fn parse_ms(timestamp: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|parsed| parsed.timestamp_millis())
}

/// Treat a `json!` object literal as an event payload map.
pub(crate) fn payload_of(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

#[cfg(test)]
pub(crate) mod test_helpers;
