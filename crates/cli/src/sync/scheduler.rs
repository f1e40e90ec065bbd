// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Background task that drains the sync queue when it is worth doing.
//!
//! A drain runs when connectivity comes back and again after the backoff
//! delay of the entries still waiting. Going offline cancels any pending
//! retry until the next online transition.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, warn};

use super::reconciler::{Reconciler, SyncOutcome};
use crate::network::{NetworkEvent, NetworkMonitor};

/// Builder for the background drain task.
pub struct SyncScheduler {
    reconciler: Arc<Reconciler>,
    network: NetworkMonitor,
    idle_poll: Option<Duration>,
}

impl SyncScheduler {
    pub fn new(reconciler: Arc<Reconciler>, network: &NetworkMonitor) -> Self {
        SyncScheduler {
            reconciler,
            network: network.clone(),
            idle_poll: None,
        }
    }

    /// While online with nothing to retry, check the queue this often.
    ///
    /// Picks up entries enqueued by other processes sharing the database.
    pub fn idle_poll(mut self, interval: Duration) -> Self {
        self.idle_poll = Some(interval);
        self
    }

    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let events = self.network.subscribe();
        let task = tokio::spawn(self.run(events, shutdown_rx));
        SchedulerHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    async fn run(
        self,
        mut events: broadcast::Receiver<NetworkEvent>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let mut deadline = self.network.is_online().then(Instant::now);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!("sync scheduler stopping");
                    break;
                }
                event = events.recv() => match event {
                    Ok(NetworkEvent::Online) => deadline = Some(Instant::now()),
                    Ok(NetworkEvent::Offline) => {
                        debug!("offline, pausing sync");
                        deadline = None;
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "network events lagged");
                        deadline = self.network.is_online().then(Instant::now);
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = self.tick().await;
                }
            }
        }
    }

    /// Run one drain and decide when the next one is due.
    async fn tick(&self) -> Option<Instant> {
        let policy = self.reconciler.config().retry;

        let delay = match self.reconciler.process_sync_queue().await {
            Ok(SyncOutcome::Completed(_)) => match self.reconciler.next_retry_delay() {
                Ok(delay) => delay.or(self.idle_poll),
                Err(e) => {
                    error!(error = %e, "failed to read sync queue");
                    Some(policy.max_delay())
                }
            },
            // Someone else is draining; look again shortly
            Ok(SyncOutcome::Skipped) => Some(policy.initial_delay()),
            Err(e) => {
                error!(error = %e, "sync queue drain failed");
                Some(policy.max_delay())
            }
        };

        if !self.network.is_online() {
            return None;
        }
        delay.map(|d| Instant::now() + d)
    }
}

/// Owner of the running scheduler task.
pub struct SchedulerHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the task and wait for an in-flight drain to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            error!(error = %e, "sync scheduler task panicked");
        }
    }
}
