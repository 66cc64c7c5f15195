// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fm-daemon: The foreman orchestrator service.
//!
//! The [`engine::Engine`] owns all coordination state — tasks, bugs,
//! blockers, agent presence, cursors, the retry queue — and enforces the
//! protocol between the leader and team-member agents. The [`rpc`] module
//! exposes every engine operation as a tool over line-delimited JSON-RPC on
//! stdin/stdout; the manager cycle additionally runs as a background task.

pub mod bus;
pub mod engine;
pub mod env;
pub mod rpc;

pub use bus::EventBus;
pub use engine::{Engine, EngineError};
