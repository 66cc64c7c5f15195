// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn lock_path_is_hidden_sibling() {
    let path = lock_path(Path::new("/state/tasks.json"));
    assert_eq!(path, Path::new("/state/.tasks.json.lock"));
}

#[test]
fn exclusive_lock_acquires_and_releases() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("tasks.json");

    {
        let guard = lock(&target, LockMode::Exclusive);
        assert!(guard.is_held());
    }
    // Released on drop: a second exclusive acquisition succeeds.
    let guard = lock(&target, LockMode::Exclusive);
    assert!(guard.is_held());
}

#[test]
fn shared_locks_coexist() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("tasks.json");

    let first = lock(&target, LockMode::Shared);
    let second = lock(&target, LockMode::Shared);
    assert!(first.is_held());
    assert!(second.is_held());
}

#[test]
fn try_lock_exclusive_rejects_second_holder() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("singleton.lock");

    let held = try_lock_exclusive(&target);
    assert!(held.is_some());
    assert!(try_lock_exclusive(&target).is_none());

    drop(held);
    assert!(try_lock_exclusive(&target).is_some());
}
