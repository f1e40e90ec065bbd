// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use tally_core::{QueueAction, Store, StoreName};

use super::policy::RetryPolicy;
use super::reconciler::{Reconciler, ReconcilerConfig};
use super::scheduler::SyncScheduler;
use super::test_helpers::{party, MockRemote};
use crate::network::NetworkMonitor;

const PARTIES: &str = "users/u1/parties";

fn fast_reconciler(store: &Store, remote: &MockRemote) -> Arc<Reconciler> {
    let config = ReconcilerConfig {
        retry: RetryPolicy {
            max_attempts: 5,
            initial_delay_ms: 10,
            max_delay_ms: 50,
        },
        ..ReconcilerConfig::new("u1")
    };
    Arc::new(Reconciler::new(
        store.clone(),
        Arc::new(remote.clone()),
        config,
    ))
}

fn enqueue_update(rec: &Reconciler, id: &str, phone: &str) {
    rec.queue()
        .enqueue(QueueAction::Update {
            store_name: StoreName::Parties,
            data: party(id, phone),
        })
        .unwrap();
}

/// Poll `cond` until it holds or two seconds pass.
async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

#[tokio::test]
async fn drains_when_connectivity_returns() {
    let store = Store::open_in_memory().unwrap();
    let remote = MockRemote::new();
    let rec = fast_reconciler(&store, &remote);
    enqueue_update(&rec, "p-1", "X");

    let network = NetworkMonitor::new(false);
    let handle = SyncScheduler::new(Arc::clone(&rec), &network).spawn();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(remote.write_count(), 0);

    network.set_online(true);
    assert!(eventually(|| rec.queue().is_empty().unwrap()).await);
    assert!(remote.get(PARTIES, "p-1").is_some());

    handle.shutdown().await;
}

#[tokio::test]
async fn drains_on_start_when_online() {
    let store = Store::open_in_memory().unwrap();
    let remote = MockRemote::new();
    let rec = fast_reconciler(&store, &remote);
    enqueue_update(&rec, "p-1", "X");

    let network = NetworkMonitor::new(true);
    let handle = SyncScheduler::new(Arc::clone(&rec), &network).spawn();

    assert!(eventually(|| rec.queue().is_empty().unwrap()).await);
    handle.shutdown().await;
}

#[tokio::test]
async fn failed_attempt_is_retried_after_backoff() {
    let store = Store::open_in_memory().unwrap();
    let remote = MockRemote::new();
    remote.fail_next(2);
    let rec = fast_reconciler(&store, &remote);
    enqueue_update(&rec, "p-1", "X");

    let network = NetworkMonitor::new(true);
    let handle = SyncScheduler::new(Arc::clone(&rec), &network).spawn();

    assert!(eventually(|| rec.queue().is_empty().unwrap()).await);
    assert_eq!(remote.write_count(), 3);
    handle.shutdown().await;
}

#[tokio::test]
async fn idle_poll_picks_up_new_entries() {
    let store = Store::open_in_memory().unwrap();
    let remote = MockRemote::new();
    let rec = fast_reconciler(&store, &remote);

    let network = NetworkMonitor::new(true);
    let handle = SyncScheduler::new(Arc::clone(&rec), &network)
        .idle_poll(Duration::from_millis(20))
        .spawn();

    tokio::time::sleep(Duration::from_millis(30)).await;
    enqueue_update(&rec, "p-2", "Y");

    assert!(eventually(|| rec.queue().is_empty().unwrap()).await);
    handle.shutdown().await;
}

#[tokio::test]
async fn shutdown_stops_the_task() {
    let store = Store::open_in_memory().unwrap();
    let rec = fast_reconciler(&store, &MockRemote::new());
    let network = NetworkMonitor::new(false);

    let handle = SyncScheduler::new(rec, &network).spawn();
    assert!(!handle.is_finished());

    tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
        .await
        .unwrap();
}
