// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

// Custom help template that groups commands into sections
const HELP_TEMPLATE: &str = "{about-with-newline}
{usage-heading} {usage}

{before-help}Options:
{options}{after-help}";

const COMMANDS_HELP: &str = "\
Records:
  add         Create a record
  edit        Change fields of a record
  rm          Delete a record
  list        List records of a store
  show        Show one record

Sync:
  push        Replay queued changes to the remote
  sync        Pull, merge and push every store
  status      Show connectivity and queue state
  queue       Inspect and manage the sync queue
  orphans     Settle records deleted remotely
  watch       Keep syncing in the foreground

Setup:
  init        Initialize a tally directory";

const QUICKSTART_HELP: &str = "\
Get started:
  tally init --owner u-42 --remote ws://localhost:7890
  tally add parties name=Acme phone=555-0100
  tally list parties
  tally sync";

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Offline-first records with a durable sync queue")]
#[command(
    long_about = "Offline-first records with a durable sync queue.\n\n\
    Every change is written locally first and replayed to the remote document store when it is reachable."
)]
#[command(help_template = HELP_TEMPLATE)]
#[command(before_help = COMMANDS_HELP)]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    /// Log sync activity to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    // ─────────────────────────────────────────────────────────────────────────
    // Records
    // ─────────────────────────────────────────────────────────────────────────
    /// Create a record
    #[command(
        arg_required_else_help = true,
        after_help = "Examples:\n  \
        tally add parties name=Acme phone=555-0100   Strings stay strings\n  \
        tally add sales total=129.5 partyId=srv-1     Numbers are parsed as JSON\n  \
        tally add items 'name=Widget' 'tags=[\"a\"]'     Arrays and objects too"
    )]
    Add {
        /// Store name (parties, sales, purchases, payments, items)
        store: String,

        /// Field assignments as key=value
        #[arg(required = true)]
        fields: Vec<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Change fields of a record
    #[command(arg_required_else_help = true)]
    Edit {
        store: String,

        id: String,

        /// Field assignments as key=value
        #[arg(required = true)]
        fields: Vec<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Delete a record
    #[command(arg_required_else_help = true)]
    Rm { store: String, id: String },

    /// List records of a store
    #[command(arg_required_else_help = true)]
    List {
        store: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show one record
    #[command(arg_required_else_help = true)]
    Show {
        store: String,

        id: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Sync
    // ─────────────────────────────────────────────────────────────────────────
    /// Replay queued changes to the remote
    Push,

    /// Pull, merge and push stores (all entity stores by default)
    #[command(after_help = "Examples:\n  \
        tally sync                 Sync every store\n  \
        tally sync parties items   Sync only these stores")]
    Sync {
        /// Stores to sync
        stores: Vec<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show connectivity and queue state
    Status {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Inspect and manage the sync queue
    #[command(subcommand)]
    Queue(QueueCommand),

    /// Settle records that were deleted remotely
    #[command(subcommand)]
    Orphans(OrphansCommand),

    /// Probe connectivity and sync in the foreground until interrupted
    Watch,

    // ─────────────────────────────────────────────────────────────────────────
    // Setup
    // ─────────────────────────────────────────────────────────────────────────
    /// Initialize a tally directory
    #[command(after_help = "Examples:\n  \
        tally init --owner u-42                              Local-only\n  \
        tally init --owner u-42 --remote ws://host:7890      With a remote")]
    Init {
        /// User whose remote collections are synced
        #[arg(long)]
        owner: String,

        /// WebSocket URL of the remote document store
        #[arg(long)]
        remote: Option<String>,

        /// Directory to initialize (default: current directory)
        #[arg(long)]
        path: Option<String>,

        /// Prefix for ids minted offline
        #[arg(long)]
        local_id_prefix: Option<String>,
    },
}

#[derive(Args, Clone, Copy, Debug, Default)]
pub struct OutputArgs {
    /// Output format
    #[arg(long, short = 'o', value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

/// Sync queue management commands.
#[derive(Subcommand)]
pub enum QueueCommand {
    /// List queue entries
    List {
        /// Only entries with this status (pending, retry, failed)
        #[arg(long, short)]
        status: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Return failed entries to pending
    #[command(arg_required_else_help = true)]
    Retry {
        /// Entry id
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        id: Option<i64>,

        /// Retry every failed entry
        #[arg(long)]
        all: bool,
    },

    /// Drop failed entries
    Clear,
}

/// Orphaned record commands.
#[derive(Subcommand)]
pub enum OrphansCommand {
    /// List records held because the remote deleted them
    List {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Push the local copy back or accept the deletion
    #[command(
        arg_required_else_help = true,
        after_help = "Examples:\n  \
        tally orphans resolve parties srv-1 --repush   Restore on the remote\n  \
        tally orphans resolve parties srv-1 --drop     Delete locally too"
    )]
    Resolve {
        store: String,

        id: String,

        /// Upload the local copy again
        #[arg(long, conflicts_with = "drop", required_unless_present = "drop")]
        repush: bool,

        /// Remove the local copy
        #[arg(long)]
        drop: bool,
    },
}

#[cfg(test)]
#[path = "cli_tests/mod.rs"]
mod tests;
