// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed local store for business records.
//!
//! The [`Store`] owns one table per [`StoreName`] with the same shape
//! (`id`, `data`, `created_at`, `updated_at`), plus the control tables used
//! by the sync queue and the remote-id index. Every call takes the
//! connection mutex for its own duration only; there is no cross-call
//! transaction.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use crate::error::{Error, Result};
use crate::pending::{PendingAction, PendingReason};
use crate::record::{Fields, Record, StoreName};

/// Schema version written to `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Control tables shared by every store.
pub const SCHEMA: &str = r#"
-- Operations awaiting remote confirmation
CREATE TABLE IF NOT EXISTS sync_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    type TEXT NOT NULL,
    store_name TEXT NOT NULL,
    record_id TEXT NOT NULL,
    data TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    retry_count INTEGER NOT NULL DEFAULT 0,
    timestamp TEXT NOT NULL,
    last_attempt TEXT,
    last_error TEXT
);

-- Ids seen on the remote at the last successful pull or push
CREATE TABLE IF NOT EXISTS remote_ids (
    store_name TEXT NOT NULL,
    record_id TEXT NOT NULL,
    PRIMARY KEY (store_name, record_id)
);

CREATE INDEX IF NOT EXISTS idx_sync_queue_status ON sync_queue(status);
CREATE INDEX IF NOT EXISTS idx_sync_queue_record ON sync_queue(store_name, record_id);
"#;

fn record_table_ddl(store: StoreName) -> String {
    let table = store.table();
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY,
            data TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_{table}_updated ON {table}(updated_at);"
    )
}

/// Format a timestamp so that text order matches time order.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse an RFC3339 timestamp from the database.
pub(crate) fn parse_timestamp(
    value: &str,
    column: &str,
) -> std::result::Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(Error::CorruptedData(format!(
                    "invalid timestamp '{value}' in column '{column}'"
                ))),
            )
        })
}

/// Parse a JSON column from the database.
pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(
    value: &str,
    column: &str,
) -> std::result::Result<T, rusqlite::Error> {
    serde_json::from_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(Error::CorruptedData(format!(
                "invalid json in column '{column}': {e}"
            ))),
        )
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

fn row_to_record(row: &rusqlite::Row<'_>) -> std::result::Result<Record, rusqlite::Error> {
    let data: String = row.get(1)?;
    let created: String = row.get(2)?;
    let updated: String = row.get(3)?;
    Ok(Record {
        id: row.get(0)?,
        fields: parse_json::<Fields>(&data, "data")?,
        created_at: parse_timestamp(&created, "created_at")?,
        updated_at: parse_timestamp(&updated, "updated_at")?,
    })
}

/// Run schema creation on a connection.
///
/// Safe to call on every open. Fails if the database was written by a newer
/// schema than this build understands.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let found: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if found > SCHEMA_VERSION {
        return Err(Error::SchemaTooNew {
            found,
            supported: SCHEMA_VERSION,
        });
    }

    for store in StoreName::ALL {
        conn.execute_batch(&record_table_ddl(store))?;
    }
    conn.execute_batch(SCHEMA)?;

    if found < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    Ok(())
}

/// Handle to the on-device database. Cloning shares the connection.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Open the store at the given path, creating and migrating if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        run_migrations(&conn)?;
        Ok(Store {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        run_migrations(&conn)?;
        Ok(Store {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` with exclusive access to the connection.
    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        f(&mut conn)
    }

    /// Insert a new record. Fails if the id is already present.
    pub fn add(&self, store: StoreName, record: &Record) -> Result<()> {
        let data = serde_json::to_string(&record.fields)?;
        let sql = format!(
            "INSERT INTO {} (id, data, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            store.table()
        );
        self.with_conn(|conn| {
            conn.execute(
                &sql,
                params![
                    record.id,
                    data,
                    format_timestamp(&record.created_at),
                    format_timestamp(&record.updated_at),
                ],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    Error::DuplicateRecord {
                        store,
                        id: record.id.clone(),
                    }
                } else {
                    Error::Database(e)
                }
            })?;
            Ok(())
        })
    }

    /// Get a record by id.
    pub fn get(&self, store: StoreName, id: &str) -> Result<Option<Record>> {
        let sql = format!(
            "SELECT id, data, created_at, updated_at FROM {} WHERE id = ?1",
            store.table()
        );
        self.with_conn(|conn| {
            Ok(conn
                .query_row(&sql, params![id], row_to_record)
                .optional()?)
        })
    }

    /// Get a record by id, failing if it is missing.
    pub fn require(&self, store: StoreName, id: &str) -> Result<Record> {
        self.get(store, id)?.ok_or_else(|| Error::RecordNotFound {
            store,
            id: id.to_string(),
        })
    }

    /// All records in a store, oldest first.
    pub fn get_all(&self, store: StoreName) -> Result<Vec<Record>> {
        let sql = format!(
            "SELECT id, data, created_at, updated_at FROM {} ORDER BY created_at, id",
            store.table()
        );
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let records = stmt
                .query_map([], row_to_record)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(records)
        })
    }

    /// Insert or overwrite a record.
    pub fn update(&self, store: StoreName, record: &Record) -> Result<()> {
        let data = serde_json::to_string(&record.fields)?;
        let sql = format!(
            "INSERT INTO {} (id, data, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                data = excluded.data,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at",
            store.table()
        );
        self.with_conn(|conn| {
            conn.execute(
                &sql,
                params![
                    record.id,
                    data,
                    format_timestamp(&record.created_at),
                    format_timestamp(&record.updated_at),
                ],
            )?;
            Ok(())
        })
    }

    /// Remove a record. Returns whether a row was deleted.
    pub fn delete(&self, store: StoreName, id: &str) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", store.table());
        self.with_conn(|conn| Ok(conn.execute(&sql, params![id])? > 0))
    }

    /// Move a record to a new id.
    ///
    /// Any row already stored under `new_id` is replaced. Returns whether a
    /// record existed under `old_id`.
    pub fn replace_id(&self, store: StoreName, old_id: &str, new_id: &str) -> Result<bool> {
        if old_id == new_id {
            return Ok(self.get(store, old_id)?.is_some());
        }
        let table = store.table();
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let exists: bool = tx.query_row(
                &format!("SELECT COUNT(*) > 0 FROM {table} WHERE id = ?1"),
                params![old_id],
                |row| row.get(0),
            )?;
            if exists {
                tx.execute(&format!("DELETE FROM {table} WHERE id = ?1"), params![new_id])?;
                tx.execute(
                    &format!("UPDATE {table} SET id = ?1 WHERE id = ?2"),
                    params![new_id, old_id],
                )?;
            }
            tx.commit()?;
            Ok(exists)
        })
    }

    /// All ids in a store.
    pub fn ids(&self, store: StoreName) -> Result<Vec<String>> {
        let sql = format!("SELECT id FROM {} ORDER BY created_at, id", store.table());
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(ids)
        })
    }

    /// Number of records in a store.
    pub fn count(&self, store: StoreName) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", store.table());
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
            Ok(usize::try_from(n).unwrap_or_default())
        })
    }

    /// Records modified strictly after `since`, least recently updated first.
    pub fn updated_since(&self, store: StoreName, since: &DateTime<Utc>) -> Result<Vec<Record>> {
        let sql = format!(
            "SELECT id, data, created_at, updated_at FROM {}
             WHERE updated_at > ?1 ORDER BY updated_at, id",
            store.table()
        );
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let records = stmt
                .query_map(params![format_timestamp(since)], row_to_record)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(records)
        })
    }

    // Remote-id index

    /// Ids last seen on the remote for a store.
    pub fn known_remote_ids(&self, store: StoreName) -> Result<HashSet<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT record_id FROM remote_ids WHERE store_name = ?1")?;
            let ids = stmt
                .query_map(params![store.as_str()], |row| row.get(0))?
                .collect::<std::result::Result<HashSet<String>, _>>()?;
            Ok(ids)
        })
    }

    /// Replace the remote-id index of a store with `ids`.
    pub fn set_known_remote_ids<'a>(
        &self,
        store: StoreName,
        ids: impl IntoIterator<Item = &'a String>,
    ) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM remote_ids WHERE store_name = ?1",
                params![store.as_str()],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO remote_ids (store_name, record_id) VALUES (?1, ?2)",
                )?;
                for id in ids {
                    stmt.execute(params![store.as_str(), id])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Record that `id` exists on the remote.
    pub fn mark_remote(&self, store: StoreName, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO remote_ids (store_name, record_id) VALUES (?1, ?2)",
                params![store.as_str(), id],
            )?;
            Ok(())
        })
    }

    /// Record that `id` no longer exists on the remote.
    pub fn forget_remote(&self, store: StoreName, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM remote_ids WHERE store_name = ?1 AND record_id = ?2",
                params![store.as_str(), id],
            )?;
            Ok(())
        })
    }

    // Pending actions

    /// Hold a record for operator resolution.
    ///
    /// Holding the same record twice refreshes the held snapshot.
    pub fn hold_pending(
        &self,
        store: StoreName,
        record: &Record,
        reason: PendingReason,
    ) -> Result<()> {
        let action = PendingAction {
            store_name: store,
            reason,
            record: record.clone(),
        };
        let held = Record::new(PendingAction::key(store, &record.id), action).to_untyped()?;
        self.update(StoreName::PendingActions, &held)
    }

    /// All held records, oldest first.
    pub fn pending_actions(&self) -> Result<Vec<Record<PendingAction>>> {
        self.get_all(StoreName::PendingActions)?
            .into_iter()
            .map(Record::into_typed)
            .collect()
    }

    /// Look up a held record.
    pub fn get_pending(&self, store: StoreName, id: &str) -> Result<Option<PendingAction>> {
        self.get(StoreName::PendingActions, &PendingAction::key(store, id))?
            .map(|r| r.into_typed().map(|t| t.fields))
            .transpose()
    }

    /// Stop holding a record. Returns the held action if there was one.
    pub fn release_pending(&self, store: StoreName, id: &str) -> Result<Option<PendingAction>> {
        let held = self.get_pending(store, id)?;
        if held.is_some() {
            self.delete(StoreName::PendingActions, &PendingAction::key(store, id))?;
        }
        Ok(held)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
