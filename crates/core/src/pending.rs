// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Records held back from sync until an operator decides what to do.

use serde::{Deserialize, Serialize};

use crate::record::{Record, StoreName};

/// Why a record is being held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingReason {
    /// The record was known on the remote and has since disappeared there.
    Orphaned,
}

impl PendingReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingReason::Orphaned => "orphaned",
        }
    }
}

impl std::fmt::Display for PendingReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A held record and the store it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAction {
    pub store_name: StoreName,
    pub reason: PendingReason,
    pub record: Record,
}

impl PendingAction {
    /// Key of a held record inside the `pendingActions` store.
    pub fn key(store: StoreName, id: &str) -> String {
        format!("{}/{}", store, id)
    }
}
