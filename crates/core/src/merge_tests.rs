// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::record::Fields;
use serde_json::{json, Value};
use yare::parameterized;

fn record(id: &str, pairs: &[(&str, Value)]) -> Record {
    let fields: Fields = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    Record::new(id, fields)
}

#[parameterized(
    lww = { MergeStrategy::LastWriteWins },
    field = { MergeStrategy::FieldMerge },
)]
fn missing_local_is_no_conflict(strategy: MergeStrategy) {
    let remote = record("r-1", &[("name", json!("Acme"))]);
    let merged = reconcile(None, remote.clone(), strategy);
    assert_eq!(merged.conflict, Conflict::NoConflict);
    assert_eq!(merged.record, remote);
}

#[test]
fn equal_fields_are_no_conflict() {
    let local = record("r-1", &[("name", json!("Acme"))]);
    let remote = record("r-1", &[("name", json!("Acme"))]);
    let merged = reconcile(Some(&local), remote, MergeStrategy::LastWriteWins);
    assert_eq!(merged.conflict, Conflict::NoConflict);
}

#[test]
fn last_write_wins_replaces_fields() {
    let local = record("r-1", &[("name", json!("Old")), ("note", json!("local only"))]);
    let remote = record("r-1", &[("name", json!("New"))]);

    let merged = reconcile(Some(&local), remote.clone(), MergeStrategy::LastWriteWins);
    assert_eq!(merged.conflict, Conflict::LastWriteWins);
    assert_eq!(merged.record, remote);
    assert!(!merged.record.fields.contains_key("note"));
}

#[test]
fn field_merge_overlays_remote_keys() {
    let local = record(
        "r-1",
        &[("name", json!("Old")), ("note", json!("local only"))],
    );
    let remote = record("r-1", &[("name", json!("New")), ("phone", json!("555"))]);

    let merged = reconcile(Some(&local), remote.clone(), MergeStrategy::FieldMerge);
    assert_eq!(merged.conflict, Conflict::FieldMerge);
    assert_eq!(merged.record.fields["name"], json!("New"));
    assert_eq!(merged.record.fields["phone"], json!("555"));
    assert_eq!(merged.record.fields["note"], json!("local only"));
    assert_eq!(merged.record.updated_at, remote.updated_at);
}

#[test]
fn field_merge_is_shallow() {
    let local = record("r-1", &[("address", json!({"city": "A", "zip": "1"}))]);
    let remote = record("r-1", &[("address", json!({"city": "B"}))]);

    let merged = reconcile(Some(&local), remote, MergeStrategy::FieldMerge);
    assert_eq!(merged.record.fields["address"], json!({"city": "B"}));
}

#[test]
fn strategy_parses_from_snake_case() {
    let s: MergeStrategy = serde_json::from_str("\"field_merge\"").unwrap();
    assert_eq!(s, MergeStrategy::FieldMerge);
    assert_eq!(MergeStrategy::default(), MergeStrategy::LastWriteWins);
}
