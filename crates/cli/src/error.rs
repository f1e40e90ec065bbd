// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use tally_core::StoreName;
use thiserror::Error;

use crate::sync::RemoteError;

/// All possible errors that can occur in the tallyrs library.
///
/// Errors provide user-friendly messages with hints for common issues.
#[derive(Debug, Error)]
pub enum Error {
    #[error("not initialized: run 'tally init' first")]
    NotInitialized,

    #[error("already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("record not found: {store}/{id}")]
    RecordNotFound { store: StoreName, id: String },

    #[error("record already exists: {store}/{id}")]
    DuplicateRecord { store: StoreName, id: String },

    #[error("invalid {store} record: {reason}")]
    Validation { store: StoreName, reason: String },

    #[error("invalid field assignment '{0}'\n  hint: use key=value, values are parsed as JSON when possible")]
    InvalidAssignment(String),

    #[error("invalid store name: '{0}'\n  hint: valid stores are: parties, sales, purchases, payments, items")]
    InvalidStoreName(String),

    #[error("'{0}' is a control collection, not an entity store")]
    NotAnEntityStore(StoreName),

    #[error("invalid queue status: '{0}'\n  hint: valid statuses are: pending, retry, failed")]
    InvalidStatus(String),

    #[error("queue entry not found: {0}")]
    QueueEntryNotFound(i64),

    #[error("no held record for {store}/{id}\n  hint: run 'tally orphans list' to see held records")]
    OrphanNotFound { store: StoreName, id: String },

    #[error("{0} is required")]
    FieldRequired(&'static str),

    #[error("no remote configured\n  hint: run 'tally init --remote ws://...' or add a [remote] section to .tally/config.toml")]
    NoRemoteConfigured,

    #[error("invalid remote URL '{0}': must start with ws:// or wss://")]
    InvalidRemoteUrl(String),

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("storage error: {0}")]
    Storage(tally_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

/// A specialized Result type for tallyrs operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<tally_core::Error> for Error {
    fn from(e: tally_core::Error) -> Self {
        match e {
            tally_core::Error::RecordNotFound { store, id } => Error::RecordNotFound { store, id },
            tally_core::Error::DuplicateRecord { store, id } => {
                Error::DuplicateRecord { store, id }
            }
            tally_core::Error::QueueEntryNotFound(id) => Error::QueueEntryNotFound(id),
            tally_core::Error::InvalidStoreName(s) => Error::InvalidStoreName(s),
            tally_core::Error::NotAnEntityStore(s) => Error::NotAnEntityStore(s),
            tally_core::Error::InvalidStatus(s) => Error::InvalidStatus(s),
            tally_core::Error::Io(e) => Error::Io(e),
            other => Error::Storage(other),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
