// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

#[parameterized(
    record_not_found = { Error::RecordNotFound { store: StoreName::Parties, id: "p-1".into() }, "parties/p-1" },
    duplicate = { Error::DuplicateRecord { store: StoreName::Items, id: "i-9".into() }, "already exists" },
    queue_entry = { Error::QueueEntryNotFound(42), "42" },
    store_name = { Error::InvalidStoreName("orders".into()), "orders" },
    control = { Error::NotAnEntityStore(StoreName::PendingActions), "pendingActions" },
    schema = { Error::SchemaTooNew { found: 9, supported: 1 }, "newer" },
)]
fn error_display_contains(err: Error, expected: &str) {
    assert!(err.to_string().contains(expected));
}

#[test]
fn error_from_io() {
    let io_err = std::io::Error::new(std::io::ErrorKind::StorageFull, "disk full");
    let err: Error = io_err.into();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn error_from_json() {
    let json_err = serde_json::from_str::<()>("invalid").unwrap_err();
    let err: Error = json_err.into();
    assert!(matches!(err, Error::Json(_)));
}
