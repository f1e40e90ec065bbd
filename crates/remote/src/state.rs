// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Server state management.
//!
//! Wraps the document database for shared access and assigns ids to added
//! documents.

use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::debug;

use tally_core::{Error, Record, Result, StoreName};

use crate::documents::Documents;

const DB_FILE_NAME: &str = "documents.db";

/// Shared server state containing the document database.
#[derive(Clone)]
pub struct ServerState {
    inner: Arc<ServerStateInner>,
}

struct ServerStateInner {
    docs: Mutex<Documents>,
    /// Mixed into assigned ids so two adds in the same nanosecond differ.
    next_seq: AtomicU64,
}

/// Check that `collection` is `users/{owner}/{store}` with an entity store.
pub fn validate_collection(collection: &str) -> Result<()> {
    let mut parts = collection.split('/');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some("users"), Some(owner), Some(store), None) if !owner.is_empty() => {
            StoreName::from_str(store)?.require_entity()?;
            Ok(())
        }
        _ => Err(Error::CorruptedData(format!(
            "invalid collection path '{collection}': expected users/<owner>/<store>"
        ))),
    }
}

impl ServerState {
    /// Opens the document database in the given directory.
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        Ok(Self::with_documents(Documents::open(
            &data_dir.join(DB_FILE_NAME),
        )?))
    }

    fn with_documents(docs: Documents) -> Self {
        ServerState {
            inner: Arc::new(ServerStateInner {
                docs: Mutex::new(docs),
                next_seq: AtomicU64::new(0),
            }),
        }
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        Ok(Self::with_documents(Documents::open_in_memory()?))
    }

    /// Derive a fresh document id: 20 hex chars of SHA-256 over the
    /// collection, the clock and a sequence number.
    fn assign_id(&self, collection: &str) -> String {
        let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let hash = Sha256::digest(format!("{collection}:{nanos}:{seq}").as_bytes());
        hex::encode(&hash[..10])
    }

    pub async fn get_all(&self, collection: &str) -> Result<Vec<Record>> {
        validate_collection(collection)?;
        self.inner.docs.lock().await.get_all(collection)
    }

    #[cfg(test)]
    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Record>> {
        self.inner.docs.lock().await.get(collection, id)
    }

    /// Store `record` under a server-assigned id and return the id.
    ///
    /// A non-empty client id is remembered: adding a record with the same client
    /// id again replaces that document instead of creating another one.
    pub async fn add(&self, collection: &str, mut record: Record) -> Result<String> {
        validate_collection(collection)?;
        let client_id = std::mem::take(&mut record.id);
        let docs = self.inner.docs.lock().await;

        let remembered = if client_id.is_empty() {
            None
        } else {
            docs.assigned_id(collection, &client_id)?
        };
        let id = match remembered {
            Some(id) => {
                debug!(collection, %client_id, %id, "repeated add");
                id
            }
            None => {
                let mut id = self.assign_id(collection);
                while docs.contains(collection, &id)? {
                    id = self.assign_id(collection);
                }
                debug!(collection, %client_id, %id, "assigned id");
                id
            }
        };
        record.id = id.clone();
        if client_id.is_empty() {
            docs.put(collection, &record)?;
        } else {
            docs.put_assigned(collection, &client_id, &record)?;
        }
        Ok(id)
    }

    /// Create or replace the document `id`.
    pub async fn upsert(&self, collection: &str, id: &str, mut record: Record) -> Result<()> {
        validate_collection(collection)?;
        record.id = id.to_string();
        self.inner.docs.lock().await.put(collection, &record)
    }

    /// Remove the document `id`. Removing a missing document succeeds.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        validate_collection(collection)?;
        let removed = self.inner.docs.lock().await.delete(collection, id)?;
        if !removed {
            debug!(collection, id, "delete of missing document");
        }
        Ok(())
    }
}
