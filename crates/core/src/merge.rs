// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Apply a pulled remote record on top of the local copy.
//!
//! Merge rules:
//! - No local copy, or identical fields: take the remote record, no conflict
//! - LastWriteWins: remote fields replace local fields wholesale
//! - FieldMerge: remote keys overwrite local keys; local-only keys survive
//!
//! The remote id and timestamps always win. Merging is shallow: nested
//! objects are replaced, never merged recursively.

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Configured policy for divergent copies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    #[default]
    LastWriteWins,
    FieldMerge,
}

/// What happened when a remote record met the local copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conflict {
    NoConflict,
    LastWriteWins,
    FieldMerge,
}

/// Result of reconciling one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    pub record: Record,
    pub conflict: Conflict,
}

/// Merge `remote` into `local` according to `strategy`.
pub fn reconcile(local: Option<&Record>, remote: Record, strategy: MergeStrategy) -> Merged {
    let Some(local) = local else {
        return Merged {
            record: remote,
            conflict: Conflict::NoConflict,
        };
    };

    if local.fields == remote.fields {
        return Merged {
            record: remote,
            conflict: Conflict::NoConflict,
        };
    }

    match strategy {
        MergeStrategy::LastWriteWins => Merged {
            record: remote,
            conflict: Conflict::LastWriteWins,
        },
        MergeStrategy::FieldMerge => {
            let mut fields = local.fields.clone();
            fields.extend(remote.fields);
            Merged {
                record: Record {
                    id: remote.id,
                    fields,
                    created_at: remote.created_at,
                    updated_at: remote.updated_at,
                },
                conflict: Conflict::FieldMerge,
            }
        }
    }
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
