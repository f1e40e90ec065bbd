// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Create, update and delete records of one entity store.
//!
//! Every mutation lands in the local store first. It is then pushed to the
//! remote directly when that is safe, or queued for the reconciler.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tally_core::protocol::collection_path;
use tally_core::record::RESERVED_KEYS;
use tally_core::{
    generate_local_id, is_local_id, Fields, QueueAction, Record, Store, StoreName, SyncQueue,
};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::network::NetworkMonitor;
use crate::sync::{RemoteStore, StatusHandle};

/// Whether a mutation reached the remote or is waiting in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confirmation {
    Synced,
    Queued,
}

/// A stored record and how far it got.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Saved {
    pub record: Record,
    pub confirmation: Confirmation,
}

/// Everything an [`EntityService`] needs. Cheap to clone.
#[derive(Clone)]
pub struct EntityContext {
    store: Store,
    queue: SyncQueue,
    remote: Option<Arc<dyn RemoteStore>>,
    network: NetworkMonitor,
    status: Option<StatusHandle>,
    owner: String,
    local_id_prefix: String,
}

impl EntityContext {
    /// Context without a remote. Every mutation is queued.
    pub fn new(store: Store, network: NetworkMonitor, owner: impl Into<String>) -> Self {
        EntityContext {
            queue: SyncQueue::new(store.clone()),
            store,
            remote: None,
            network,
            status: None,
            owner: owner.into(),
            local_id_prefix: tally_core::record::DEFAULT_LOCAL_PREFIX.to_string(),
        }
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteStore>, status: StatusHandle) -> Self {
        self.remote = Some(remote);
        self.status = Some(status);
        self
    }

    pub fn with_local_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.local_id_prefix = prefix.into();
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn queue(&self) -> &SyncQueue {
        &self.queue
    }
}

/// Mutations and reads for one entity store.
pub struct EntityService {
    store_name: StoreName,
    ctx: EntityContext,
}

impl EntityService {
    pub fn new(store_name: StoreName, ctx: EntityContext) -> Result<Self> {
        let store_name = store_name.require_entity()?;
        Ok(EntityService { store_name, ctx })
    }

    pub fn store_name(&self) -> StoreName {
        self.store_name
    }

    fn collection(&self) -> String {
        collection_path(&self.ctx.owner, self.store_name)
    }

    /// Validate and store a new record.
    ///
    /// When online the remote assigns the id. Otherwise the record keeps a
    /// local id until the queued `add` is replayed.
    pub async fn create(&self, fields: Fields) -> Result<Saved> {
        validate(self.store_name, &fields)?;

        let local_id = generate_local_id(&self.ctx.local_id_prefix, self.store_name, &Utc::now());
        let mut record = Record::new(local_id, fields);

        if let Some(remote) = self.reachable_remote() {
            match remote.add(&self.collection(), &record).await {
                Ok(id) => {
                    record.id = id;
                    self.ctx.store.add(self.store_name, &record)?;
                    self.ctx.store.mark_remote(self.store_name, &record.id)?;
                    info!(store = %self.store_name, id = %record.id, "created");
                    return Ok(Saved {
                        record,
                        confirmation: Confirmation::Synced,
                    });
                }
                Err(e) => warn!(store = %self.store_name, error = %e, "remote add failed, queueing"),
            }
        }

        self.ctx.store.add(self.store_name, &record)?;
        self.ctx.queue.enqueue(QueueAction::Add {
            store_name: self.store_name,
            data: record.clone(),
        })?;
        debug!(store = %self.store_name, id = %record.id, "created offline");
        Ok(Saved {
            record,
            confirmation: Confirmation::Queued,
        })
    }

    /// Overlay `patch` on the stored record.
    pub async fn update(&self, id: &str, patch: Fields) -> Result<Saved> {
        let mut record = self.ctx.store.require(self.store_name, id)?;
        reject_reserved(self.store_name, &patch)?;
        record.fields.extend(patch);
        validate(self.store_name, &record.fields)?;
        record.touch();

        self.ctx.store.update(self.store_name, &record)?;
        let confirmation = self
            .push_or_enqueue(QueueAction::Update {
                store_name: self.store_name,
                data: record.clone(),
            })
            .await?;
        Ok(Saved {
            record,
            confirmation,
        })
    }

    /// Remove the record locally and propagate the deletion.
    pub async fn delete(&self, id: &str) -> Result<Confirmation> {
        let record = self.ctx.store.require(self.store_name, id)?;
        self.ctx.store.delete(self.store_name, id)?;
        self.push_or_enqueue(QueueAction::Delete {
            store_name: self.store_name,
            data: record,
        })
        .await
    }

    pub fn get(&self, id: &str) -> Result<Option<Record>> {
        Ok(self.ctx.store.get(self.store_name, id)?)
    }

    pub fn list(&self) -> Result<Vec<Record>> {
        Ok(self.ctx.store.get_all(self.store_name)?)
    }

    /// Whether the reconciler is mid-pass.
    pub fn is_syncing(&self) -> bool {
        self.ctx.status.as_ref().is_some_and(StatusHandle::is_syncing)
    }

    fn reachable_remote(&self) -> Option<&Arc<dyn RemoteStore>> {
        self.ctx
            .remote
            .as_ref()
            .filter(|_| self.ctx.network.is_online())
    }

    /// Push `action` now if nothing queued for the record must go first.
    async fn push_or_enqueue(&self, action: QueueAction) -> Result<Confirmation> {
        let id = action.record_id();
        let direct = match self.reachable_remote() {
            Some(remote)
                if !is_local_id(id, &self.ctx.local_id_prefix)
                    && !self.ctx.queue.has_open_entry(self.store_name, id)? =>
            {
                Some(remote)
            }
            _ => None,
        };

        if let Some(remote) = direct {
            let collection = self.collection();
            let pushed = match &action {
                QueueAction::Delete { .. } => remote.delete(&collection, id).await,
                _ => remote.upsert(&collection, action.record()).await,
            };
            match pushed {
                Ok(()) => {
                    if matches!(action, QueueAction::Delete { .. }) {
                        self.ctx.store.forget_remote(self.store_name, id)?;
                    } else {
                        self.ctx.store.mark_remote(self.store_name, id)?;
                    }
                    info!(store = %self.store_name, id, kind = %action.kind(), "synced");
                    return Ok(Confirmation::Synced);
                }
                Err(e) => {
                    warn!(store = %self.store_name, id, error = %e, "remote write failed, queueing")
                }
            }
        }

        debug!(store = %self.store_name, id, kind = %action.kind(), "queued");
        self.ctx.queue.enqueue(action)?;
        Ok(Confirmation::Queued)
    }
}

fn invalid(store: StoreName, reason: impl Into<String>) -> Error {
    Error::Validation {
        store,
        reason: reason.into(),
    }
}

fn reject_reserved(store: StoreName, fields: &Fields) -> Result<()> {
    match RESERVED_KEYS.iter().find(|key| fields.contains_key(**key)) {
        Some(key) => Err(invalid(store, format!("'{key}' is managed by the store"))),
        None => Ok(()),
    }
}

fn require_name(store: StoreName, fields: &Fields) -> Result<()> {
    match fields.get("name").and_then(|v| v.as_str()) {
        Some(name) if !name.trim().is_empty() => Ok(()),
        _ => Err(invalid(store, "'name' must be a non-empty string")),
    }
}

fn require_number(store: StoreName, fields: &Fields, key: &str) -> Result<()> {
    match fields.get(key) {
        Some(v) if v.is_number() => Ok(()),
        _ => Err(invalid(store, format!("'{key}' must be a number"))),
    }
}

/// Check the fields of a record about to be written to `store`.
pub fn validate(store: StoreName, fields: &Fields) -> Result<()> {
    reject_reserved(store, fields)?;
    match store {
        StoreName::Parties | StoreName::Items => require_name(store, fields),
        StoreName::Sales | StoreName::Purchases => require_number(store, fields, "total"),
        StoreName::Payments => require_number(store, fields, "amount"),
        StoreName::PendingActions => Err(Error::NotAnEntityStore(store)),
    }
}

#[cfg(test)]
#[path = "entities_tests.rs"]
mod tests;
