// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime role assignments.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Assignable roles. Exactly one leader exists at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Leader,
    TeamMember,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leader => f.write_str("leader"),
            Self::TeamMember => f.write_str("team_member"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "leader" => Ok(Self::Leader),
            "team_member" => Ok(Self::TeamMember),
            other => Err(format!("unknown role '{other}' (expected leader|team_member)")),
        }
    }
}

/// The roles document: one leader plus a disjoint set of team members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    pub leader: String,
    #[serde(default)]
    pub team_members: BTreeSet<String>,
}

impl Roles {
    pub fn new(leader: impl Into<String>) -> Self {
        Self { leader: leader.into(), team_members: BTreeSet::new() }
    }

    pub fn is_leader(&self, agent: &str) -> bool {
        self.leader == agent
    }

    /// Apply a role change, keeping leader and team_members disjoint.
    pub fn assign(&mut self, agent: &str, role: Role) {
        match role {
            Role::Leader => {
                let previous = std::mem::replace(&mut self.leader, agent.to_string());
                self.team_members.remove(agent);
                if previous != agent {
                    self.team_members.insert(previous);
                }
            }
            Role::TeamMember => {
                self.team_members.insert(agent.to_string());
            }
        }
    }
}

#[cfg(test)]
#[path = "roles_tests.rs"]
mod tests;
