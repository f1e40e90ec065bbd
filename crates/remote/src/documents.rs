// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed document table.
//!
//! One row per `(collection, id)`. The full record is kept as JSON.
//! Ids handed out for added documents are remembered per client id, so a
//! repeated add of the same client record resolves to the same document.

use std::path::Path;

use chrono::SecondsFormat;
use rusqlite::{params, Connection, OptionalExtension};
use tally_core::{Record, Result};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    data TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (collection, id)
);

CREATE TABLE IF NOT EXISTS assigned_ids (
    collection TEXT NOT NULL,
    client_id TEXT NOT NULL,
    id TEXT NOT NULL,
    PRIMARY KEY (collection, client_id)
);
"#;

pub struct Documents {
    conn: Connection,
}

impl Documents {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
        Self::init(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Documents { conn })
    }

    pub fn get_all(&self, collection: &str) -> Result<Vec<Record>> {
        let mut stmt = self
            .conn
            .prepare("SELECT data FROM documents WHERE collection = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![collection], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for data in rows {
            records.push(serde_json::from_str(&data?)?);
        }
        Ok(records)
    }

    #[cfg(test)]
    pub fn get(&self, collection: &str, id: &str) -> Result<Option<Record>> {
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;
        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, collection: &str, id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Insert or replace the document with `record.id`.
    pub fn put(&self, collection: &str, record: &Record) -> Result<()> {
        let data = serde_json::to_string(record)?;
        self.conn.execute(
            "INSERT INTO documents (collection, id, data, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(collection, id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            params![
                collection,
                record.id,
                data,
                record.updated_at.to_rfc3339_opts(SecondsFormat::Nanos, true)
            ],
        )?;
        Ok(())
    }

    /// Id previously assigned to a document added under `client_id`.
    pub fn assigned_id(&self, collection: &str, client_id: &str) -> Result<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM assigned_ids WHERE collection = ?1 AND client_id = ?2",
                params![collection, client_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Store `record` and remember its id as the one assigned to `client_id`.
    pub fn put_assigned(&self, collection: &str, client_id: &str, record: &Record) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO assigned_ids (collection, client_id, id) VALUES (?1, ?2, ?3)",
            params![collection, client_id, record.id],
        )?;
        self.put(collection, record)?;
        tx.commit()?;
        Ok(())
    }

    /// Returns whether a document was removed.
    pub fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id],
        )?;
        Ok(removed > 0)
    }
}
