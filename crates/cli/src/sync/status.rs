// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight guard and observable state of the reconciler.
//!
//! A [`StatusCell`] belongs to one reconciler. Feature code only ever sees
//! the read side, a [`StatusHandle`].

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

/// Whether a sync pass is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    Idle,
    Running,
}

/// Snapshot published after every phase change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub last_started: Option<DateTime<Utc>>,
    pub last_finished: Option<DateTime<Utc>>,
    /// Error that aborted the most recent pass, if any.
    pub last_error: Option<String>,
}

impl SyncStatus {
    fn idle() -> Self {
        SyncStatus {
            phase: SyncPhase::Idle,
            last_started: None,
            last_finished: None,
            last_error: None,
        }
    }
}

/// Read side of the reconciler state.
#[derive(Debug, Clone)]
pub struct StatusHandle {
    rx: watch::Receiver<SyncStatus>,
}

impl StatusHandle {
    pub fn current(&self) -> SyncStatus {
        self.rx.borrow().clone()
    }

    pub fn is_syncing(&self) -> bool {
        self.rx.borrow().phase == SyncPhase::Running
    }

    /// Wait for the next published status. Returns `None` once the
    /// reconciler is gone.
    pub async fn changed(&mut self) -> Option<SyncStatus> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// Owner side: the in-flight flag plus the status channel.
pub(crate) struct StatusCell {
    in_flight: AtomicBool,
    tx: watch::Sender<SyncStatus>,
}

impl StatusCell {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(SyncStatus::idle());
        StatusCell {
            in_flight: AtomicBool::new(false),
            tx,
        }
    }

    pub(crate) fn handle(&self) -> StatusHandle {
        StatusHandle {
            rx: self.tx.subscribe(),
        }
    }

    /// Claim the flag. Returns `None` if a pass is already running.
    pub(crate) fn try_begin(&self) -> Option<RunGuard<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        self.tx.send_modify(|s| {
            s.phase = SyncPhase::Running;
            s.last_started = Some(Utc::now());
        });
        Some(RunGuard {
            cell: self,
            error: None,
        })
    }
}

/// Releases the flag and publishes `Idle` when dropped.
pub(crate) struct RunGuard<'a> {
    cell: &'a StatusCell,
    error: Option<String>,
}

impl RunGuard<'_> {
    /// Record the error that ended this pass.
    pub(crate) fn fail(&mut self, error: impl ToString) {
        self.error = Some(error.to_string());
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let error = self.error.take();
        self.cell.tx.send_modify(|s| {
            s.phase = SyncPhase::Idle;
            s.last_finished = Some(Utc::now());
            s.last_error = error;
        });
        self.cell.in_flight.store(false, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
