// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    assigned = { TaskStatus::Assigned, true, true },
    in_progress = { TaskStatus::InProgress, true, false },
    blocked = { TaskStatus::Blocked, true, false },
    reported = { TaskStatus::Reported, true, false },
    bug_open = { TaskStatus::BugOpen, true, true },
    done = { TaskStatus::Done, false, false },
    duplicate_closed = { TaskStatus::DuplicateClosed, false, false },
)]
fn status_classification(status: TaskStatus, open: bool, claimable: bool) {
    assert_eq!(status.is_open(), open);
    assert_eq!(status.is_claimable(), claimable);
}

#[test]
fn status_serializes_snake_case() {
    let json = serde_json::to_string(&TaskStatus::BugOpen).unwrap();
    assert_eq!(json, "\"bug_open\"");
    let back: TaskStatus = serde_json::from_str("\"duplicate_closed\"").unwrap();
    assert_eq!(back, TaskStatus::DuplicateClosed);
}

#[test]
fn fingerprint_normalizes_case_and_whitespace() {
    let a = fingerprint("Claude_Code", Workstream::Backend, "Build   the API");
    let b = fingerprint("claude_code", Workstream::Backend, "build the api");
    assert_eq!(a, b);
}

#[test]
fn fingerprint_distinguishes_workstreams() {
    let a = fingerprint("claude_code", Workstream::Backend, "Build X");
    let b = fingerprint("claude_code", Workstream::Frontend, "Build X");
    assert_ne!(a, b);
}

#[test]
fn optional_fields_are_omitted_when_unset() {
    let task = crate::test_support::TaskBuilder::new("Build X").build();
    let json = serde_json::to_string(&task).unwrap();
    assert!(!json.contains("reassigned_from"));
    assert!(!json.contains("degraded_comm"));
    assert!(!json.contains("duplicate_of"));
}

#[test]
fn workstream_from_str_rejects_unknown() {
    assert!("backend".parse::<Workstream>().is_ok());
    assert!("mobile".parse::<Workstream>().is_err());
}
