// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// Nothing listens on port 1, so connects are refused immediately.
pub const UNREACHABLE_REMOTE: &str = "ws://127.0.0.1:1";

pub fn tally() -> Command {
    let mut cmd = cargo_bin_cmd!("tally");
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Helper to create an initialized temp directory without a remote
pub fn init_temp_local() -> TempDir {
    let temp = TempDir::new().unwrap();
    tally()
        .args(["init", "--owner", "u-test"])
        .current_dir(temp.path())
        .assert()
        .success();
    temp
}

/// Helper to create an initialized temp directory whose remote is down
pub fn init_temp_unreachable() -> TempDir {
    let temp = TempDir::new().unwrap();
    tally()
        .args(["init", "--owner", "u-test", "--remote", UNREACHABLE_REMOTE])
        .current_dir(temp.path())
        .assert()
        .success();
    temp
}

/// Helper to create a record and return its id
pub fn create_record(temp: &TempDir, store: &str, fields: &[&str]) -> String {
    let output = tally()
        .arg("add")
        .arg(store)
        .args(fields)
        .args(["-o", "json"])
        .current_dir(temp.path())
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let saved: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    saved["record"]["id"].as_str().unwrap().to_string()
}

/// Parse the JSON stdout of a successful command
pub fn json_output(temp: &TempDir, args: &[&str]) -> serde_json::Value {
    let output = tally().args(args).current_dir(temp.path()).output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}
