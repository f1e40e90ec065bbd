// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable queue of local mutations awaiting remote confirmation.
//!
//! Each entry holds a full snapshot of the record at the time of the
//! mutation. Entries are never coalesced: several entries for one record
//! replay in insertion order, and the remote ends up with whichever snapshot
//! was applied last.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::{Record, StoreName};
use crate::store::{format_timestamp, parse_json, parse_timestamp, Store};

/// Kind of mutation carried by a queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Add,
    Update,
    Delete,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Add => "add",
            ActionType::Update => "update",
            ActionType::Delete => "delete",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "add" => Ok(ActionType::Add),
            "update" => Ok(ActionType::Update),
            "delete" => Ok(ActionType::Delete),
            _ => Err(Error::InvalidActionType(s.to_string())),
        }
    }
}

/// A queued mutation and the record snapshot it carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum QueueAction {
    Add { store_name: StoreName, data: Record },
    Update { store_name: StoreName, data: Record },
    /// `data` is the last known snapshot of the deleted record.
    Delete { store_name: StoreName, data: Record },
}

impl QueueAction {
    pub fn new(kind: ActionType, store_name: StoreName, data: Record) -> Self {
        match kind {
            ActionType::Add => QueueAction::Add { store_name, data },
            ActionType::Update => QueueAction::Update { store_name, data },
            ActionType::Delete => QueueAction::Delete { store_name, data },
        }
    }

    pub fn kind(&self) -> ActionType {
        match self {
            QueueAction::Add { .. } => ActionType::Add,
            QueueAction::Update { .. } => ActionType::Update,
            QueueAction::Delete { .. } => ActionType::Delete,
        }
    }

    pub fn store(&self) -> StoreName {
        match self {
            QueueAction::Add { store_name, .. }
            | QueueAction::Update { store_name, .. }
            | QueueAction::Delete { store_name, .. } => *store_name,
        }
    }

    pub fn record(&self) -> &Record {
        match self {
            QueueAction::Add { data, .. }
            | QueueAction::Update { data, .. }
            | QueueAction::Delete { data, .. } => data,
        }
    }

    pub fn record_id(&self) -> &str {
        &self.record().id
    }
}

/// Processing state of a queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    /// Not attempted yet.
    Pending,
    /// Failed at least once, below the attempt limit.
    Retry,
    /// Hit the attempt limit. Only an operator moves it out of this state.
    Failed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Retry => "retry",
            QueueStatus::Failed => "failed",
        }
    }

    /// Whether a drain pass should attempt this entry.
    pub fn is_open(&self) -> bool {
        !matches!(self, QueueStatus::Failed)
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for QueueStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(QueueStatus::Pending),
            "retry" => Ok(QueueStatus::Retry),
            "failed" => Ok(QueueStatus::Failed),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }
}

/// A row of the sync queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: i64,
    #[serde(flatten)]
    pub action: QueueAction,
    pub status: QueueStatus,
    pub retry_count: u32,
    pub timestamp: DateTime<Utc>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Number of entries per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub retry: usize,
    pub failed: usize,
}

impl QueueCounts {
    pub fn total(&self) -> usize {
        self.pending + self.retry + self.failed
    }

    /// Entries a drain pass would still attempt.
    pub fn open(&self) -> usize {
        self.pending + self.retry
    }
}

const SELECT_ENTRY: &str = "SELECT id, type, store_name, data, status, retry_count,
        timestamp, last_attempt, last_error FROM sync_queue";

fn parse_db<T: FromStr>(value: &str, column: &str) -> std::result::Result<T, rusqlite::Error> {
    value.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(Error::CorruptedData(format!(
                "invalid value '{value}' in column '{column}'"
            ))),
        )
    })
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> std::result::Result<QueueEntry, rusqlite::Error> {
    let kind: String = row.get(1)?;
    let store: String = row.get(2)?;
    let data: String = row.get(3)?;
    let status: String = row.get(4)?;
    let timestamp: String = row.get(6)?;
    let last_attempt: Option<String> = row.get(7)?;

    Ok(QueueEntry {
        id: row.get(0)?,
        action: QueueAction::new(
            parse_db(&kind, "type")?,
            parse_db(&store, "store_name")?,
            parse_json(&data, "data")?,
        ),
        status: parse_db(&status, "status")?,
        retry_count: row.get(5)?,
        timestamp: parse_timestamp(&timestamp, "timestamp")?,
        last_attempt: last_attempt
            .map(|s| parse_timestamp(&s, "last_attempt"))
            .transpose()?,
        last_error: row.get(8)?,
    })
}

/// The sync queue, stored alongside the records it refers to.
#[derive(Clone)]
pub struct SyncQueue {
    store: Store,
}

impl SyncQueue {
    pub fn new(store: Store) -> Self {
        SyncQueue { store }
    }

    /// Append an action with status `pending`. Returns the new entry id.
    pub fn enqueue(&self, action: QueueAction) -> Result<i64> {
        let store = action.store().require_entity()?;
        let data = serde_json::to_string(action.record())?;
        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sync_queue (type, store_name, record_id, data, status, retry_count, timestamp)
                 VALUES (?1, ?2, ?3, ?4, 'pending', 0, ?5)",
                params![
                    action.kind().as_str(),
                    store.as_str(),
                    action.record_id(),
                    data,
                    format_timestamp(&Utc::now()),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Remove an entry after the remote confirmed it. Returns whether it existed.
    pub fn dequeue(&self, id: i64) -> Result<bool> {
        self.store.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM sync_queue WHERE id = ?1", params![id])? > 0)
        })
    }

    pub fn get(&self, id: i64) -> Result<Option<QueueEntry>> {
        let sql = format!("{SELECT_ENTRY} WHERE id = ?1");
        self.store
            .with_conn(|conn| Ok(conn.query_row(&sql, params![id], row_to_entry).optional()?))
    }

    /// Every entry in insertion order.
    pub fn all(&self) -> Result<Vec<QueueEntry>> {
        self.query(&format!("{SELECT_ENTRY} ORDER BY id"), [])
    }

    /// Entries a drain pass should attempt, in insertion order.
    pub fn processable(&self) -> Result<Vec<QueueEntry>> {
        self.query(
            &format!("{SELECT_ENTRY} WHERE status IN ('pending', 'retry') ORDER BY id"),
            [],
        )
    }

    pub fn by_status(&self, status: QueueStatus) -> Result<Vec<QueueEntry>> {
        self.query(
            &format!("{SELECT_ENTRY} WHERE status = ?1 ORDER BY id"),
            params![status.as_str()],
        )
    }

    fn query(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<QueueEntry>> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let entries = stmt
                .query_map(params, row_to_entry)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    pub fn counts(&self) -> Result<QueueCounts> {
        self.store.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM sync_queue GROUP BY status")?;
            let rows = stmt.query_map([], |row| {
                let status: String = row.get(0)?;
                let n: i64 = row.get(1)?;
                Ok((status, n))
            })?;

            let mut counts = QueueCounts::default();
            for row in rows {
                let (status, n) = row?;
                let n = usize::try_from(n).unwrap_or_default();
                match status.parse::<QueueStatus>()? {
                    QueueStatus::Pending => counts.pending = n,
                    QueueStatus::Retry => counts.retry = n,
                    QueueStatus::Failed => counts.failed = n,
                }
            }
            Ok(counts)
        })
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.counts()?.total())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Record a failed attempt.
    ///
    /// Increments `retry_count` and stores the error. The entry becomes
    /// `failed` once `retry_count >= max_attempts`, otherwise `retry`.
    /// Entries that are already `failed` are returned unchanged.
    pub fn record_failure(&self, id: i64, error: &str, max_attempts: u32) -> Result<QueueEntry> {
        let entry = self.get(id)?.ok_or(Error::QueueEntryNotFound(id))?;
        if entry.status == QueueStatus::Failed {
            return Ok(entry);
        }

        let retry_count = entry.retry_count.saturating_add(1);
        let status = if retry_count >= max_attempts {
            QueueStatus::Failed
        } else {
            QueueStatus::Retry
        };
        let now = Utc::now();

        self.store.with_conn(|conn| {
            conn.execute(
                "UPDATE sync_queue
                 SET status = ?1, retry_count = ?2, last_attempt = ?3, last_error = ?4
                 WHERE id = ?5",
                params![status.as_str(), retry_count, format_timestamp(&now), error, id],
            )?;
            Ok(())
        })?;

        Ok(QueueEntry {
            status,
            retry_count,
            last_attempt: Some(now),
            last_error: Some(error.to_string()),
            ..entry
        })
    }

    /// Put a failed entry back to `pending` with a fresh attempt budget.
    ///
    /// Returns false if the entry is not `failed`.
    pub fn retry_failed(&self, id: i64) -> Result<bool> {
        let changed = self.store.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE sync_queue SET status = 'pending', retry_count = 0
                 WHERE id = ?1 AND status = 'failed'",
                params![id],
            )?)
        })?;
        if changed == 0 && self.get(id)?.is_none() {
            return Err(Error::QueueEntryNotFound(id));
        }
        Ok(changed > 0)
    }

    /// Put every failed entry back to `pending`. Returns how many moved.
    pub fn retry_all_failed(&self) -> Result<usize> {
        self.store.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE sync_queue SET status = 'pending', retry_count = 0 WHERE status = 'failed'",
                [],
            )?)
        })
    }

    /// Delete every failed entry. Returns how many were removed.
    pub fn clear_failed(&self) -> Result<usize> {
        self.store.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM sync_queue WHERE status = 'failed'", [])?)
        })
    }

    /// Delete one entry regardless of status.
    pub fn remove(&self, id: i64) -> Result<()> {
        if self.dequeue(id)? {
            Ok(())
        } else {
            Err(Error::QueueEntryNotFound(id))
        }
    }

    /// Whether a pending or retry entry exists for the record.
    pub fn has_open_entry(&self, store: StoreName, record_id: &str) -> Result<bool> {
        self.store.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) > 0 FROM sync_queue
                 WHERE store_name = ?1 AND record_id = ?2 AND status IN ('pending', 'retry')",
                params![store.as_str(), record_id],
                |row| row.get(0),
            )?)
        })
    }

    /// Whether any entry exists for the record, failed ones included.
    pub fn has_entry(&self, store: StoreName, record_id: &str) -> Result<bool> {
        self.store.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) > 0 FROM sync_queue WHERE store_name = ?1 AND record_id = ?2",
                params![store.as_str(), record_id],
                |row| row.get(0),
            )?)
        })
    }

    /// Point every entry for `old_id` at `new_id`, snapshots included.
    ///
    /// Returns the number of entries rewritten.
    pub fn remap_record_id(&self, store: StoreName, old_id: &str, new_id: &str) -> Result<usize> {
        self.store.with_conn(|conn| {
            let tx = conn.transaction()?;
            let rows: Vec<(i64, String)> = {
                let mut stmt = tx.prepare(
                    "SELECT id, data FROM sync_queue WHERE store_name = ?1 AND record_id = ?2",
                )?;
                let rows = stmt
                    .query_map(params![store.as_str(), old_id], |row| {
                        Ok((row.get(0)?, row.get(1)?))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            };

            for (id, data) in &rows {
                let mut record: Record = serde_json::from_str(data)?;
                record.id = new_id.to_string();
                tx.execute(
                    "UPDATE sync_queue SET record_id = ?1, data = ?2 WHERE id = ?3",
                    params![new_id, serde_json::to_string(&record)?, id],
                )?;
            }
            tx.commit()?;
            Ok(rows.len())
        })
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
