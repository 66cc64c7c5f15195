// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent replay cursors over the event log.
//!
//! A cursor is a logical line index into `events.jsonl`, counting malformed
//! lines, so cursors never drift relative to the file. Audience-filtered
//! events still advance the cursor past themselves.

use super::{payload_of, Engine, EngineError};
use fm_core::event::kinds;
use fm_core::{Clock, Event};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

/// An event delivered to a poller, annotated with its log offset.
#[derive(Debug, Serialize)]
pub struct DeliveredEvent {
    #[serde(flatten)]
    pub event: Event,
    pub offset: u64,
}

/// `poll_events` result.
#[derive(Debug, Serialize)]
pub struct PolledEvents {
    pub agent: String,
    /// Where this poll started
    pub cursor: u64,
    /// Where the next poll should start
    pub next_cursor: u64,
    pub events: Vec<DeliveredEvent>,
}

/// `ack_event` result.
#[derive(Debug, Serialize)]
pub struct AckOutcome {
    pub agent: String,
    pub event_id: String,
    pub acked: bool,
}

impl<C: Clock> Engine<C> {
    /// Stored cursor for an agent (0 when none).
    pub fn get_agent_cursor(&self, agent: &str) -> Result<u64, EngineError> {
        Ok(self.state().cursors()?.get(agent).copied().unwrap_or(0))
    }

    /// Poll events for an agent with cursor-based replay and optional
    /// long-poll. Operational-gated; refreshes the caller's presence.
    pub async fn poll_events(
        &self,
        agent: &str,
        cursor: Option<u64>,
        limit: usize,
        timeout: Duration,
        auto_advance: bool,
    ) -> Result<PolledEvents, EngineError> {
        {
            let _state = self.lock_state();
            let mut agents = self.state().agents()?;
            self.require_operational(&agents, agent)?;
            self.touch(&mut agents, agent);
            self.state().put_agents(&agents)?;
        }

        let start = match cursor {
            Some(explicit) => explicit,
            None => self.get_agent_cursor(agent)?,
        };

        if !timeout.is_zero() {
            self.bus().wait_for_index(start, timeout).await?;
        }

        let mut delivered = Vec::new();
        let mut next_cursor = start;
        for (offset, event) in self.bus().events_from(start)? {
            next_cursor = offset + 1;
            if !event.delivers_to(agent) {
                continue;
            }
            delivered.push(DeliveredEvent { event, offset });
            if delivered.len() >= limit {
                break;
            }
        }

        if auto_advance {
            let _state = self.lock_state();
            let mut cursors = self.state().cursors()?;
            cursors.insert(agent.to_string(), next_cursor);
            self.state().put_cursors(&cursors)?;
        }

        Ok(PolledEvents {
            agent: agent.to_string(),
            cursor: start,
            next_cursor,
            events: delivered,
        })
    }

    /// Record an acknowledgement for an event id (informational; does not
    /// gate delivery).
    pub fn ack_event(&self, agent: &str, event_id: &str) -> Result<AckOutcome, EngineError> {
        let _state = self.lock_state();
        let mut acks = self.state().acks()?;
        let entry = acks.entry(agent.to_string()).or_default();
        if !entry.iter().any(|acked| acked == event_id) {
            entry.push(event_id.to_string());
            self.state().put_acks(&acks)?;
        }

        self.emit(
            kinds::EVENT_ACKED,
            agent,
            payload_of(json!({"agent": agent, "event_id": event_id})),
        )?;
        Ok(AckOutcome {
            agent: agent.to_string(),
            event_id: event_id.to_string(),
            acked: true,
        })
    }
}

#[cfg(test)]
#[path = "cursors_tests.rs"]
mod tests;
