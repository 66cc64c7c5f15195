// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn promote_demotes_previous_leader() {
    let mut roles = Roles::new("codex");
    roles.assign("claude_code", Role::Leader);

    assert_eq!(roles.leader, "claude_code");
    assert!(roles.team_members.contains("codex"));
    assert!(!roles.team_members.contains("claude_code"));
}

#[test]
fn promote_removes_new_leader_from_members() {
    let mut roles = Roles::new("codex");
    roles.assign("gemini", Role::TeamMember);
    roles.assign("gemini", Role::Leader);

    assert_eq!(roles.leader, "gemini");
    assert!(!roles.team_members.contains("gemini"));
    assert!(roles.team_members.contains("codex"));
}

#[test]
fn team_member_assignment_is_idempotent() {
    let mut roles = Roles::new("codex");
    roles.assign("gemini", Role::TeamMember);
    roles.assign("gemini", Role::TeamMember);
    assert_eq!(roles.team_members.len(), 1);
}

#[test]
fn role_parse() {
    assert_eq!("leader".parse::<Role>(), Ok(Role::Leader));
    assert_eq!("team_member".parse::<Role>(), Ok(Role::TeamMember));
    assert!("manager".parse::<Role>().is_err());
}
