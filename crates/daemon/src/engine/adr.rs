// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Architecture decision records: equal-rights votes tallied into an ADR
//! markdown artifact under `decisions/`.

use super::{payload_of, Engine, EngineError};
use fm_core::event::kinds;
use fm_core::Clock;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Serialize)]
pub struct DecisionOutcome {
    pub decision_id: String,
    pub topic: String,
    pub winner: String,
    pub path: PathBuf,
}

impl<C: Clock> Engine<C> {
    /// Tally votes from every policy voter and write the ADR artifact.
    pub fn record_architecture_decision(
        &self,
        topic: &str,
        options: &[String],
        votes: &BTreeMap<String, String>,
        rationale: &BTreeMap<String, String>,
    ) -> Result<DecisionOutcome, EngineError> {
        if options.is_empty() {
            return Err(EngineError::Validation(
                "options must contain at least one entry".to_string(),
            ));
        }
        let members = self.policy().voters();
        let missing: Vec<&String> =
            members.iter().filter(|member| !votes.contains_key(*member)).collect();
        if !missing.is_empty() {
            return Err(EngineError::Validation(format!(
                "Missing votes for: {}",
                missing
                    .iter()
                    .map(|member| member.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        let mut counts: BTreeMap<&str, usize> =
            options.iter().map(|option| (option.as_str(), 0)).collect();
        for choice in votes.values() {
            match counts.get_mut(choice.as_str()) {
                Some(count) => *count += 1,
                None => {
                    return Err(EngineError::Validation(format!(
                        "Vote contains unknown option: {choice}"
                    )))
                }
            }
        }
        // First option in declared order wins ties.
        let mut winner = options.first().cloned().unwrap_or_default();
        let mut best = counts.get(winner.as_str()).copied().unwrap_or(0);
        for option in options {
            let count = counts.get(option.as_str()).copied().unwrap_or(0);
            if count > best {
                winner = option.clone();
                best = count;
            }
        }

        let decision_id = format!("ADR-{}", fm_core::hex_suffix(6));
        let path = self.decisions_dir().join(format!("{decision_id}.md"));

        let mut lines = vec![
            format!("# {decision_id}: {topic}"),
            String::new(),
            format!("- Mode: {}", self.policy().architecture_mode()),
            format!("- Members: {}", members.join(", ")),
            format!("- Winner: {winner}"),
            String::new(),
            "## Options".to_string(),
        ];
        lines.extend(options.iter().map(|option| format!("- {option}")));
        lines.push(String::new());
        lines.push("## Votes".to_string());
        for member in &members {
            if let Some(choice) = votes.get(member) {
                lines.push(format!("- {member}: {choice}"));
            }
        }
        lines.push(String::new());
        lines.push("## Rationale".to_string());
        for member in &members {
            let reason = rationale
                .get(member)
                .map(String::as_str)
                .unwrap_or("No rationale provided");
            lines.push(format!("- {member}: {reason}"));
        }
        lines.push(String::new());
        std::fs::write(&path, lines.join("\n"))
            .map_err(fm_storage::StorageError::from)?;

        self.emit(
            kinds::ARCHITECTURE_DECIDED,
            fm_core::SOURCE_GOVERNANCE,
            payload_of(json!({
                "decision_id": &decision_id,
                "topic": topic,
                "winner": &winner,
                "votes": votes,
            })),
        )?;

        Ok(DecisionOutcome {
            decision_id,
            topic: topic.to_string(),
            winner,
            path,
        })
    }
}

#[cfg(test)]
#[path = "adr_tests.rs"]
mod tests;
