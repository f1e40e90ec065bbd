// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! CLI argument parsing tests for sync commands.

#![allow(clippy::unwrap_used)]

use super::*;

fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(args)
}

#[test]
fn test_sync_without_stores_means_all() {
    let cli = parse(&["tally", "sync"]).unwrap();
    assert!(matches!(cli.command, Command::Sync { ref stores, .. } if stores.is_empty()));
}

#[test]
fn test_sync_named_stores() {
    let cli = parse(&["tally", "sync", "parties", "items"]).unwrap();
    assert!(matches!(
        cli.command,
        Command::Sync { ref stores, .. } if stores == &["parties", "items"]
    ));
}

#[test]
fn test_push_and_watch_take_no_args() {
    assert!(matches!(parse(&["tally", "push"]).unwrap().command, Command::Push));
    assert!(matches!(parse(&["tally", "watch"]).unwrap().command, Command::Watch));
    assert!(parse(&["tally", "push", "extra"]).is_err());
}

#[test]
fn test_status_json() {
    let cli = parse(&["tally", "status", "-o", "json"]).unwrap();
    assert!(matches!(
        cli.command,
        Command::Status { output: OutputArgs { output: OutputFormat::Json } }
    ));
}
