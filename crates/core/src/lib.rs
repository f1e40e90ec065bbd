// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tally-core: Shared library for the tally sync engine
//!
//! This crate provides the record model, the SQLite local store, the durable
//! sync queue, the merge policy, and the wire protocol spoken with the
//! remote document store. It is used by both the tally CLI and tally-remote.

pub mod error;
pub mod merge;
pub mod pending;
pub mod protocol;
pub mod queue;
pub mod record;
pub mod store;

pub use error::{Error, Result};
pub use merge::{reconcile, Conflict, MergeStrategy, Merged};
pub use pending::{PendingAction, PendingReason};
pub use queue::{ActionType, QueueAction, QueueCounts, QueueEntry, QueueStatus, SyncQueue};
pub use record::{generate_local_id, is_local_id, Fields, Record, StoreName};
pub use store::Store;
