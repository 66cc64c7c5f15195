// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon.

use std::path::PathBuf;
use std::time::Duration;

/// Resolve the project root: `ORCHESTRATOR_ROOT`, else the executable's
/// directory, else the current directory.
pub fn root_dir() -> PathBuf {
    if let Ok(root) = std::env::var("ORCHESTRATOR_ROOT") {
        if !root.trim().is_empty() {
            return canonicalized(PathBuf::from(root));
        }
    }
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));
    canonicalized(fallback)
}

/// `ORCHESTRATOR_EXPECTED_ROOT`, when set: the resolved root must match or
/// startup fails.
pub fn expected_root() -> Option<PathBuf> {
    std::env::var("ORCHESTRATOR_EXPECTED_ROOT")
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(|raw| canonicalized(PathBuf::from(raw)))
}

/// Policy document path: `ORCHESTRATOR_POLICY`, else `<root>/config/policy.json`.
pub fn policy_path(root: &std::path::Path) -> PathBuf {
    match std::env::var("ORCHESTRATOR_POLICY") {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => root.join("config").join("policy.json"),
    }
}

/// Auto manager-cycle interval (`ORCHESTRATOR_AUTO_MANAGER_CYCLE_SECONDS`),
/// clamped to 5–300 seconds, default 15.
pub fn auto_cycle_interval() -> Duration {
    let seconds = std::env::var("ORCHESTRATOR_AUTO_MANAGER_CYCLE_SECONDS")
        .ok()
        .and_then(|raw| raw.parse::<u64>().ok())
        .unwrap_or(15);
    Duration::from_secs(seconds.clamp(5, 300))
}

/// Whether `status` output includes full filesystem paths
/// (`ORCHESTRATOR_STATUS_VERBOSE_PATHS` ∈ {1, true, yes}).
pub fn status_verbose_paths() -> bool {
    std::env::var("ORCHESTRATOR_STATUS_VERBOSE_PATHS")
        .map(|raw| {
            matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes")
        })
        .unwrap_or(false)
}

fn canonicalized(path: PathBuf) -> PathBuf {
    std::fs::canonicalize(&path).unwrap_or(path)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
