// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn record_with(keys: &[&str]) -> AgentRecord {
    let mut record = AgentRecord::new("claude_code");
    for key in keys {
        record
            .metadata
            .insert(key.to_string(), json!(format!("value-{key}")));
    }
    record
}

#[test]
fn identity_complete_requires_all_nine_keys() {
    let record = record_with(&IDENTITY_KEYS);
    assert!(record.identity_complete());
    assert!(record.missing_identity().is_empty());
}

#[test]
fn missing_identity_reports_absent_keys() {
    let record = record_with(&["client", "model"]);
    let missing = record.missing_identity();
    assert_eq!(missing.len(), IDENTITY_KEYS.len() - 2);
    assert!(missing.contains(&"session_id"));
}

#[test]
fn empty_string_values_do_not_count() {
    let mut record = record_with(&IDENTITY_KEYS);
    record.metadata.insert("model".to_string(), json!("   "));
    assert!(!record.identity_complete());
    assert!(record.missing_identity().contains(&"model"));
}

#[test]
fn non_string_values_do_not_count() {
    let mut record = record_with(&IDENTITY_KEYS);
    record.metadata.insert("session_id".to_string(), json!(42));
    assert!(record.missing_identity().contains(&"session_id"));
}

#[test]
fn merge_metadata_is_shallow() {
    let mut record = record_with(&["client"]);
    let mut patch = serde_json::Map::new();
    patch.insert("model".to_string(), json!("opus"));
    patch.insert("client".to_string(), json!("updated"));
    record.merge_metadata(&patch);

    assert_eq!(record.meta_str("model"), Some("opus"));
    assert_eq!(record.meta_str("client"), Some("updated"));
}
