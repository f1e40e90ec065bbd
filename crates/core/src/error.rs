// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for tally-core operations.

use thiserror::Error;

use crate::record::StoreName;

/// All possible errors that can occur in tally-core operations.
///
/// Everything here is a local storage failure from the caller's point of
/// view: it aborts the failing operation and is never retried internally.
#[derive(Debug, Error)]
pub enum Error {
    #[error("record not found: {store}/{id}")]
    RecordNotFound { store: StoreName, id: String },

    #[error("record already exists: {store}/{id}\n  hint: use update to overwrite an existing record")]
    DuplicateRecord { store: StoreName, id: String },

    #[error("queue entry not found: {0}")]
    QueueEntryNotFound(i64),

    #[error("invalid store name: '{0}'\n  hint: valid stores are: parties, sales, purchases, payments, items")]
    InvalidStoreName(String),

    #[error("'{0}' is a control collection, not an entity store")]
    NotAnEntityStore(StoreName),

    #[error("invalid queue status: '{0}'\n  hint: valid statuses are: pending, retry, failed")]
    InvalidStatus(String),

    #[error("invalid action type: '{0}'\n  hint: valid types are: add, update, delete")]
    InvalidActionType(String),

    #[error("local schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: i64, supported: i64 },

    #[error("local store lock poisoned")]
    LockPoisoned,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupted data: {0}")]
    CorruptedData(String),
}

/// A specialized Result type for tally-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
