// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciliation between the local store and the remote document store.
//!
//! Two entry points, both single-flight per [`Reconciler`]:
//!
//! - [`Reconciler::process_sync_queue`] replays queued mutations in order.
//! - [`Reconciler::sync_all_data`] pulls each collection, merges it into
//!   the local store, queues local-only records, then drains the queue.
//!
//! A remote failure on one queue entry is contained: the entry is charged
//! an attempt and the pass moves on. Storage errors and failed pulls abort
//! the pass.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tally_core::protocol::collection_path;
use tally_core::{
    is_local_id, reconcile, Conflict, MergeStrategy, PendingReason, QueueAction, QueueCounts,
    QueueEntry, QueueStatus, Store, StoreName, SyncQueue,
};
use tracing::{debug, info, warn};

use super::policy::RetryPolicy;
use super::remote::{RemoteError, RemoteStore};
use super::status::{StatusCell, StatusHandle};
use crate::error::{Error, Result};

/// Settings bound at construction.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// User whose collections are synced (`users/{owner}/...`).
    pub owner: String,
    pub local_id_prefix: String,
    pub retry: RetryPolicy,
    pub merge: MergeStrategy,
}

impl ReconcilerConfig {
    pub fn new(owner: impl Into<String>) -> Self {
        ReconcilerConfig {
            owner: owner.into(),
            local_id_prefix: tally_core::record::DEFAULT_LOCAL_PREFIX.to_string(),
            retry: RetryPolicy::default(),
            merge: MergeStrategy::default(),
        }
    }
}

/// Result of a request that may have been turned away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome<T> {
    Completed(T),
    /// Another pass was already running on this reconciler.
    Skipped,
}

impl<T> SyncOutcome<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            SyncOutcome::Completed(t) => Some(t),
            SyncOutcome::Skipped => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, SyncOutcome::Skipped)
    }
}

/// Which collections a full sync covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncScope {
    All,
    Only(Vec<StoreName>),
}

impl SyncScope {
    fn stores(&self) -> Result<Vec<StoreName>> {
        match self {
            SyncScope::All => Ok(StoreName::ENTITIES.to_vec()),
            SyncScope::Only(stores) => stores
                .iter()
                .map(|s| s.require_entity().map_err(Error::from))
                .collect(),
        }
    }
}

/// How to settle a record held as orphaned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Push the local copy back to the remote under the same id.
    Repush,
    /// Accept the remote deletion and drop the local copy.
    DropLocal,
}

/// A local id replaced by the id the remote assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdRemap {
    pub store: StoreName,
    pub from: String,
    pub to: String,
}

/// What one drain pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub synced: usize,
    /// Failed this pass, still under the attempt limit.
    pub retrying: usize,
    /// Failed this pass and hit the attempt limit.
    pub failed: usize,
    /// Not attempted because an earlier entry for the same record failed.
    pub deferred: usize,
    pub remapped: Vec<IdRemap>,
}

/// What a full sync of one collection did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    pub store: StoreName,
    /// Remote records written locally.
    pub pulled: usize,
    /// Pulled records that differed from the local copy.
    pub conflicts: usize,
    /// Remote records left alone because local changes are still queued.
    pub skipped: usize,
    /// Local-only records queued for upload.
    pub enqueued: usize,
    /// Records deleted remotely and held for resolution.
    pub orphaned: usize,
    pub drain: DrainReport,
}

impl CollectionReport {
    fn new(store: StoreName) -> Self {
        CollectionReport {
            store,
            pulled: 0,
            conflicts: 0,
            skipped: 0,
            enqueued: 0,
            orphaned: 0,
            drain: DrainReport::default(),
        }
    }
}

/// What a full sync did, per collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub collections: Vec<CollectionReport>,
}

enum Pushed {
    Assigned(String),
    Upserted,
    Deleted,
}

/// Orchestrates pulls and queue drains for one owner.
pub struct Reconciler {
    store: Store,
    queue: SyncQueue,
    remote: Arc<dyn RemoteStore>,
    config: ReconcilerConfig,
    status: StatusCell,
}

impl Reconciler {
    pub fn new(store: Store, remote: Arc<dyn RemoteStore>, config: ReconcilerConfig) -> Self {
        Reconciler {
            queue: SyncQueue::new(store.clone()),
            store,
            remote,
            config,
            status: StatusCell::new(),
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn queue(&self) -> &SyncQueue {
        &self.queue
    }

    pub fn remote(&self) -> Arc<dyn RemoteStore> {
        Arc::clone(&self.remote)
    }

    /// Read-only view of this reconciler's state.
    pub fn status(&self) -> StatusHandle {
        self.status.handle()
    }

    pub fn queue_counts(&self) -> Result<QueueCounts> {
        Ok(self.queue.counts()?)
    }

    /// Replay every pending and retry entry in insertion order.
    pub async fn process_sync_queue(&self) -> Result<SyncOutcome<DrainReport>> {
        let Some(mut guard) = self.status.try_begin() else {
            debug!("sync already running, skipping drain");
            return Ok(SyncOutcome::Skipped);
        };
        match self.drain().await {
            Ok(report) => Ok(SyncOutcome::Completed(report)),
            Err(e) => {
                guard.fail(&e);
                Err(e)
            }
        }
    }

    /// Pull, merge and push every collection in `scope`.
    pub async fn sync_all_data(&self, scope: &SyncScope) -> Result<SyncOutcome<SyncReport>> {
        let stores = scope.stores()?;
        let Some(mut guard) = self.status.try_begin() else {
            debug!("sync already running, skipping full sync");
            return Ok(SyncOutcome::Skipped);
        };

        let mut report = SyncReport::default();
        for store in stores {
            match self.sync_collection_inner(store).await {
                Ok(collection) => report.collections.push(collection),
                Err(e) => {
                    guard.fail(&e);
                    return Err(e);
                }
            }
        }
        info!(collections = report.collections.len(), "full sync finished");
        Ok(SyncOutcome::Completed(report))
    }

    /// Pull, merge and push one collection.
    pub async fn sync_collection(&self, store: StoreName) -> Result<SyncOutcome<CollectionReport>> {
        let store = store.require_entity()?;
        let Some(mut guard) = self.status.try_begin() else {
            return Ok(SyncOutcome::Skipped);
        };
        match self.sync_collection_inner(store).await {
            Ok(report) => Ok(SyncOutcome::Completed(report)),
            Err(e) => {
                guard.fail(&e);
                Err(e)
            }
        }
    }

    /// Settle a record held because the remote deleted it.
    pub fn resolve_orphan(&self, store: StoreName, id: &str, resolution: Resolution) -> Result<()> {
        let Some(held) = self.store.release_pending(store, id)? else {
            return Err(Error::OrphanNotFound {
                store,
                id: id.to_string(),
            });
        };

        match resolution {
            Resolution::Repush => {
                // The local copy may have been edited after it was held
                let record = match self.store.get(store, id)? {
                    Some(record) => record,
                    None => {
                        self.store.update(store, &held.record)?;
                        held.record
                    }
                };
                self.queue.enqueue(QueueAction::Add {
                    store_name: store,
                    data: record,
                })?;
                info!(%store, id, "orphan queued for re-upload");
            }
            Resolution::DropLocal => {
                self.store.delete(store, id)?;
                info!(%store, id, "orphan dropped locally");
            }
        }
        Ok(())
    }

    /// How long to wait before the next drain is worth running.
    ///
    /// `None` when nothing is left to attempt.
    pub fn next_retry_delay(&self) -> Result<Option<Duration>> {
        let mut min_count: Option<u32> = None;
        for entry in self.queue.processable()? {
            let count = entry.retry_count.max(1);
            min_count = Some(min_count.map_or(count, |m| m.min(count)));
        }
        Ok(min_count.map(|n| self.config.retry.delay_for(n)))
    }

    async fn drain(&self) -> Result<DrainReport> {
        let mut report = DrainReport::default();
        let mut blocked: HashSet<(StoreName, String)> = HashSet::new();

        for listed in self.queue.processable()? {
            // Re-read: an earlier entry in this pass may have remapped the snapshot
            let Some(entry) = self.queue.get(listed.id)? else {
                continue;
            };
            if !entry.status.is_open() {
                continue;
            }

            let key = (entry.action.store(), entry.action.record_id().to_string());
            if blocked.contains(&key) {
                report.deferred += 1;
                continue;
            }

            match self.push(&entry).await {
                Ok(pushed) => {
                    if let Some(remap) = self.confirm(&entry, pushed)? {
                        report.remapped.push(remap);
                    }
                    report.synced += 1;
                }
                Err(err) => {
                    blocked.insert(key);
                    match self.handle_sync_error(&entry, &err)? {
                        QueueStatus::Failed => report.failed += 1,
                        _ => report.retrying += 1,
                    }
                }
            }
        }

        if report != DrainReport::default() {
            info!(
                synced = report.synced,
                retrying = report.retrying,
                failed = report.failed,
                deferred = report.deferred,
                "drained sync queue"
            );
        }
        Ok(report)
    }

    async fn push(&self, entry: &QueueEntry) -> std::result::Result<Pushed, RemoteError> {
        let store = entry.action.store();
        let collection = collection_path(&self.config.owner, store);
        let record = entry.action.record();
        debug!(entry = entry.id, kind = %entry.action.kind(), %store, id = %record.id, "pushing");

        match &entry.action {
            QueueAction::Add { .. } if is_local_id(&record.id, &self.config.local_id_prefix) => {
                let id = self.remote.add(&collection, record).await?;
                Ok(Pushed::Assigned(id))
            }
            QueueAction::Add { .. } | QueueAction::Update { .. } => {
                self.remote.upsert(&collection, record).await?;
                Ok(Pushed::Upserted)
            }
            QueueAction::Delete { .. } => {
                self.remote.delete(&collection, &record.id).await?;
                Ok(Pushed::Deleted)
            }
        }
    }

    /// Apply the local side of a confirmed push and drop the entry.
    fn confirm(&self, entry: &QueueEntry, pushed: Pushed) -> Result<Option<IdRemap>> {
        let store = entry.action.store();
        let record_id = entry.action.record_id();

        let remap = match pushed {
            Pushed::Assigned(new_id) => {
                self.store.replace_id(store, record_id, &new_id)?;
                self.queue.remap_record_id(store, record_id, &new_id)?;
                self.store.mark_remote(store, &new_id)?;
                info!(%store, from = record_id, to = %new_id, "adopted remote id");
                Some(IdRemap {
                    store,
                    from: record_id.to_string(),
                    to: new_id,
                })
            }
            Pushed::Upserted => {
                self.store.mark_remote(store, record_id)?;
                None
            }
            Pushed::Deleted => {
                self.store.forget_remote(store, record_id)?;
                None
            }
        };

        self.queue.dequeue(entry.id)?;
        Ok(remap)
    }

    /// Charge a failed attempt to the entry. Returns its new status.
    fn handle_sync_error(&self, entry: &QueueEntry, err: &RemoteError) -> Result<QueueStatus> {
        let updated = self
            .queue
            .record_failure(entry.id, &err.to_string(), self.config.retry.max_attempts)?;

        let message = if updated.status == QueueStatus::Failed {
            "queue entry failed permanently"
        } else {
            "queue entry failed, will retry"
        };
        warn!(
            entry = entry.id,
            store = %entry.action.store(),
            id = entry.action.record_id(),
            attempts = updated.retry_count,
            error = %err,
            "{message}"
        );
        Ok(updated.status)
    }

    async fn sync_collection_inner(&self, store: StoreName) -> Result<CollectionReport> {
        let collection = collection_path(&self.config.owner, store);
        let remote_records = self.remote.get_all(&collection).await?;
        let mut report = CollectionReport::new(store);

        let mut remote_ids = HashSet::with_capacity(remote_records.len());
        for remote in remote_records {
            remote_ids.insert(remote.id.clone());

            if self.queue.has_open_entry(store, &remote.id)? {
                report.skipped += 1;
                continue;
            }

            let local = self.store.get(store, &remote.id)?;
            let merged = reconcile(local.as_ref(), remote, self.config.merge);
            if merged.conflict != Conflict::NoConflict {
                debug!(%store, id = %merged.record.id, conflict = ?merged.conflict, "merged divergent record");
                report.conflicts += 1;
            }
            self.store.update(store, &merged.record)?;
            // Back on the remote, so no longer an orphan
            self.store.release_pending(store, &merged.record.id)?;
            report.pulled += 1;
        }

        let previously_known = self.store.known_remote_ids(store)?;
        for local in self.store.get_all(store)? {
            // Failed entries count too: they wait for the operator
            if remote_ids.contains(&local.id)
                || self.queue.has_entry(store, &local.id)?
                || self.store.get_pending(store, &local.id)?.is_some()
            {
                continue;
            }

            if previously_known.contains(&local.id) {
                warn!(%store, id = %local.id, "record deleted remotely, holding for resolution");
                self.store
                    .hold_pending(store, &local, PendingReason::Orphaned)?;
                report.orphaned += 1;
            } else {
                debug!(%store, id = %local.id, "queueing local-only record");
                self.queue.enqueue(QueueAction::Add {
                    store_name: store,
                    data: local,
                })?;
                report.enqueued += 1;
            }
        }

        self.store.set_known_remote_ids(store, &remote_ids)?;
        report.drain = self.drain().await?;
        Ok(report)
    }
}
