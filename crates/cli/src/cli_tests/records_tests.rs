// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! CLI argument parsing tests for record commands.

#![allow(clippy::unwrap_used)]

use super::*;
use yare::parameterized;

fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(args)
}

#[test]
fn test_add_collects_assignments() {
    let cli = parse(&["tally", "add", "parties", "name=Acme", "phone=555"]).unwrap();
    match cli.command {
        Command::Add {
            store,
            fields,
            output,
        } => {
            assert_eq!(store, "parties");
            assert_eq!(fields, vec!["name=Acme", "phone=555"]);
            assert_eq!(output.output, OutputFormat::Text);
        }
        _ => unreachable!("expected add"),
    }
}

#[test]
fn test_add_requires_fields() {
    assert!(parse(&["tally", "add", "parties"]).is_err());
}

#[test]
fn test_edit_parses_id() {
    let cli = parse(&["tally", "edit", "sales", "srv-1", "total=10"]).unwrap();
    assert!(matches!(
        cli.command,
        Command::Edit { ref id, .. } if id == "srv-1"
    ));
}

#[parameterized(
    long = { &["tally", "list", "items", "--output", "json"] },
    short = { &["tally", "list", "items", "-o", "json"] },
)]
fn test_list_json_output(args: &[&str]) {
    let cli = parse(args).unwrap();
    assert!(matches!(
        cli.command,
        Command::List { output: OutputArgs { output: OutputFormat::Json }, .. }
    ));
}

#[test]
fn test_rm_requires_id() {
    assert!(parse(&["tally", "rm", "parties"]).is_err());
}

#[test]
fn test_verbose_is_global() {
    let cli = parse(&["tally", "show", "parties", "p-1", "-v"]).unwrap();
    assert!(cli.verbose);
}
