// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronization with the remote document store.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Scheduler  │────►│ Reconciler  │────►│RemoteClient │────►│  Transport  │
//! │ (net events)│     │ (pull/push) │◄────│(RemoteStore)│◄────│   (trait)   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                            │
//!                            ▼
//!                     ┌─────────────┐
//!                     │ Store/Queue │  (tally-core, SQLite)
//!                     └─────────────┘
//! ```
//!
//! # Features
//!
//! - Durable queue replay in insertion order with per-entry retry budget
//! - Local id replacement when the remote assigns the canonical id
//! - Full pull and merge per collection, with remote-deletion detection
//! - Single-flight passes observable through [`StatusHandle`]
//! - Injectable transport and remote store traits for testing

mod policy;
mod reconciler;
mod remote;
mod scheduler;
mod status;
mod transport;

pub use policy::RetryPolicy;
pub use reconciler::{
    CollectionReport, DrainReport, IdRemap, Reconciler, ReconcilerConfig, Resolution,
    SyncOutcome, SyncReport, SyncScope,
};
pub use remote::{RemoteClient, RemoteError, RemoteFuture, RemoteResult, RemoteStore};
pub use scheduler::{SchedulerHandle, SyncScheduler};
pub use status::{StatusHandle, SyncPhase, SyncStatus};
pub use transport::{Transport, TransportError, TransportResult, WebSocketTransport};

#[cfg(test)]
pub(crate) mod test_helpers;



#[cfg(test)]
mod scheduler_tests;
