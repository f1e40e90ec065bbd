// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use crate::record::Fields;
use serde_json::json;
use yare::parameterized;

fn test_record(id: &str) -> Record {
    let mut fields = Fields::new();
    fields.insert("name".into(), json!("Acme"));
    Record::new(id, fields)
}

#[test]
fn collection_path_format() {
    assert_eq!(
        collection_path("u-42", StoreName::Parties),
        "users/u-42/parties"
    );
    assert_eq!(
        collection_path("u-42", StoreName::PendingActions),
        "users/u-42/pendingActions"
    );
}

#[test]
fn client_message_wire_shape() {
    let msg = ClientMessage::upsert(7, "users/u/sales", test_record("s-1"));
    let value: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();

    assert_eq!(value["type"], "upsert");
    assert_eq!(value["request_id"], 7);
    assert_eq!(value["id"], "s-1");
    assert_eq!(value["record"]["name"], "Acme");
}

#[test]
fn client_message_roundtrip() {
    let msg = ClientMessage::add(1, "users/u/parties", test_record("local_1_abcde"));
    let parsed = ClientMessage::from_json(&msg.to_json().unwrap()).unwrap();
    assert_eq!(msg, parsed);
}

#[parameterized(
    get_all = { ClientMessage::get_all(3, "c"), Some(3) },
    delete = { ClientMessage::delete(4, "c", "x"), Some(4) },
    ping = { ClientMessage::ping(5), None },
)]
fn client_request_id(msg: ClientMessage, expected: Option<u64>) {
    assert_eq!(msg.request_id(), expected);
}

#[test]
fn server_records_roundtrip() {
    let msg = ServerMessage::records(9, vec![test_record("a"), test_record("b")]);
    let parsed = ServerMessage::from_json(&msg.to_json().unwrap()).unwrap();
    assert_eq!(msg, parsed);
}

#[parameterized(
    added = { ServerMessage::added(1, "srv-1"), Some(1) },
    ack = { ServerMessage::ack(2), Some(2) },
    error_correlated = { ServerMessage::error(Some(3), "nope"), Some(3) },
    error_bare = { ServerMessage::error(None, "bad json"), None },
    pong = { ServerMessage::pong(4), None },
)]
fn server_request_id(msg: ServerMessage, expected: Option<u64>) {
    assert_eq!(msg.request_id(), expected);
}

#[test]
fn unknown_type_is_rejected() {
    assert!(ClientMessage::from_json(r#"{"type":"snapshot"}"#).is_err());
}
