// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! CLI argument parsing tests for `queue` and `orphans`.

#![allow(clippy::unwrap_used)]

use super::*;

fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(args)
}

#[test]
fn test_queue_list_status_filter() {
    let cli = parse(&["tally", "queue", "list", "--status", "failed"]).unwrap();
    assert!(matches!(
        cli.command,
        Command::Queue(QueueCommand::List { status: Some(ref s), .. }) if s == "failed"
    ));
}

#[test]
fn test_queue_retry_one() {
    let cli = parse(&["tally", "queue", "retry", "7"]).unwrap();
    assert!(matches!(
        cli.command,
        Command::Queue(QueueCommand::Retry { id: Some(7), all: false })
    ));
}

#[test]
fn test_queue_retry_all() {
    let cli = parse(&["tally", "queue", "retry", "--all"]).unwrap();
    assert!(matches!(
        cli.command,
        Command::Queue(QueueCommand::Retry { id: None, all: true })
    ));
}

#[test]
fn test_queue_retry_id_conflicts_with_all() {
    assert!(parse(&["tally", "queue", "retry", "7", "--all"]).is_err());
}

#[test]
fn test_orphans_resolve_needs_a_choice() {
    assert!(parse(&["tally", "orphans", "resolve", "parties", "p-1"]).is_err());
    assert!(parse(&[
        "tally", "orphans", "resolve", "parties", "p-1", "--repush", "--drop"
    ])
    .is_err());
}

#[test]
fn test_orphans_resolve_drop() {
    let cli = parse(&["tally", "orphans", "resolve", "parties", "p-1", "--drop"]).unwrap();
    assert!(matches!(
        cli.command,
        Command::Orphans(OrphansCommand::Resolve { repush: false, drop: true, .. })
    ));
}
