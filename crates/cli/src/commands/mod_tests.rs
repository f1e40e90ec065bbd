// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde_json::json;
use yare::parameterized;

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn assignments_keep_json_types() {
    let fields = parse_assignments(&args(&[
        "name=Acme",
        "total=129.5",
        "paid=true",
        "tags=[\"a\",\"b\"]",
        "note=",
    ]))
    .unwrap();

    assert_eq!(fields["name"], json!("Acme"));
    assert_eq!(fields["total"], json!(129.5));
    assert_eq!(fields["paid"], json!(true));
    assert_eq!(fields["tags"], json!(["a", "b"]));
    assert_eq!(fields["note"], json!(""));
}

#[test]
fn assignment_value_may_contain_equals() {
    let fields = parse_assignments(&args(&["memo=a=b"])).unwrap();
    assert_eq!(fields["memo"], json!("a=b"));
}

#[parameterized(
    no_equals = { "name" },
    empty_key = { "=x" },
)]
fn invalid_assignment(arg: &str) {
    let err = parse_assignments(&args(&[arg])).unwrap_err();
    assert!(matches!(err, Error::InvalidAssignment(_)));
}

#[parameterized(
    plural = { "parties", StoreName::Parties },
    singular = { "sale", StoreName::Sales },
    mixed_case = { "Payments", StoreName::Payments },
)]
fn store_names(name: &str, expected: StoreName) {
    assert_eq!(parse_store(name).unwrap(), expected);
}

#[test]
fn control_collection_is_not_a_store_argument() {
    assert!(matches!(
        parse_store("pendingActions"),
        Err(Error::NotAnEntityStore(_))
    ));
    assert!(matches!(parse_store("invoices"), Err(Error::InvalidStoreName(_))));
}
