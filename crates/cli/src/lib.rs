// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tallyrs - offline-first records with a durable sync queue.
//!
//! This crate provides the functionality behind the `tally` CLI: entity
//! services that write locally first, a network monitor, and the
//! reconciler that replays queued changes and pulls remote collections.
//!
//! # Main Components
//!
//! - [`EntityService`] - create, update and delete records of one store
//! - [`NetworkMonitor`] - observed connectivity with change events
//! - [`Reconciler`](sync::Reconciler) - queue drain and full resync
//! - [`SyncScheduler`](sync::SyncScheduler) - drains on reconnect and after backoff
//! - [`Config`] - Project configuration (owner, remote, retry policy)
//!
//! # Wiring
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tallyrs::sync::{Reconciler, RemoteClient};
//! use tallyrs::{find_work_dir, get_db_path, Config, EntityContext, EntityService, NetworkMonitor};
//!
//! let work_dir = find_work_dir()?;
//! let config = Config::load(&work_dir)?;
//! let store = tally_core::Store::open(&get_db_path(&work_dir))?;
//! let remote = Arc::new(RemoteClient::new("ws://localhost:7890", Duration::from_secs(2)));
//! let reconciler = Reconciler::new(store.clone(), remote.clone(), config.reconciler_config());
//! let ctx = EntityContext::new(store, NetworkMonitor::new(true), &config.owner)
//!     .with_remote(remote, reconciler.status());
//! let parties = EntityService::new(StoreName::Parties, ctx)?;
//! ```

mod cli;
mod commands;

pub mod config;
pub mod entities;
pub mod error;
pub mod network;
pub mod sync;

pub use cli::{Cli, Command, OrphansCommand, OutputArgs, OutputFormat, QueueCommand};
pub use config::{find_work_dir, get_db_path, init_work_dir, Config, RemoteConfig};
pub use entities::{Confirmation, EntityContext, EntityService, Saved};
pub use error::{Error, Result};
pub use network::{NetworkEvent, NetworkMonitor, Quality};

/// Execute a CLI command. This is the main entry point for library users
/// and provides a testable way to run commands without process execution.
pub fn run(command: Command) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(dispatch(command))
}

async fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Init {
            owner,
            remote,
            path,
            local_id_prefix,
        } => commands::init::run(owner, remote, path, local_id_prefix),
        Command::Add {
            store,
            fields,
            output,
        } => commands::records::add(&store, &fields, output.output).await,
        Command::Edit {
            store,
            id,
            fields,
            output,
        } => commands::records::edit(&store, &id, &fields, output.output).await,
        Command::Rm { store, id } => commands::records::rm(&store, &id).await,
        Command::List { store, output } => commands::records::list(&store, output.output),
        Command::Show { store, id, output } => commands::records::show(&store, &id, output.output),
        Command::Push => commands::sync::push().await,
        Command::Sync { stores, output } => commands::sync::sync(&stores, output.output).await,
        Command::Status { output } => commands::sync::status(output.output).await,
        Command::Queue(cmd) => match cmd {
            QueueCommand::List { status, output } => {
                commands::queue::list(status.as_deref(), output.output)
            }
            QueueCommand::Retry { id, all } => commands::queue::retry(id, all),
            QueueCommand::Clear => commands::queue::clear(),
        },
        Command::Orphans(cmd) => match cmd {
            OrphansCommand::List { output } => commands::orphans::list(output.output),
            OrphansCommand::Resolve {
                store,
                id,
                repush,
                drop: _,
            } => commands::orphans::resolve(&store, &id, repush),
        },
        Command::Watch => commands::sync::watch().await,
    }
}
