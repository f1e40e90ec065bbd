// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use serde::Serialize;
use tally_core::QueueCounts;

use crate::cli::OutputFormat;
use crate::error::{Error, Result};
use crate::network::{watch_probe, NetworkMonitor, TcpProbe};
use crate::sync::{
    CollectionReport, DrainReport, Reconciler, SyncOutcome, SyncPhase, SyncScheduler, SyncScope,
};

use super::{parse_store, print_json, Workspace};

fn print_drain(report: &DrainReport) {
    println!("Pushed {} change(s)", report.synced);
    for remap in &report.remapped {
        println!("  {}/{} -> {}", remap.store, remap.from, remap.to);
    }
    if report.retrying > 0 {
        println!("{} change(s) will be retried", report.retrying);
    }
    if report.deferred > 0 {
        println!("{} change(s) waiting on an earlier failure", report.deferred);
    }
    if report.failed > 0 {
        println!(
            "{} change(s) failed permanently (see 'tally queue list --status failed')",
            report.failed
        );
    }
}

fn print_collection(report: &CollectionReport) {
    let mut line = format!(
        "{}: pulled {} ({} changed), uploaded {}",
        report.store, report.pulled, report.conflicts, report.drain.synced
    );
    if report.skipped > 0 {
        line.push_str(&format!(", {} kept local", report.skipped));
    }
    if report.orphaned > 0 {
        line.push_str(&format!(", {} deleted remotely (see 'tally orphans list')", report.orphaned));
    }
    if report.drain.retrying + report.drain.failed > 0 {
        line.push_str(&format!(
            ", {} not uploaded",
            report.drain.retrying + report.drain.failed
        ));
    }
    println!("{}", line);
}

/// Drain the sync queue once.
pub async fn push() -> Result<()> {
    let ws = Workspace::open()?;
    let reconciler = ws.reconciler()?;
    match reconciler.process_sync_queue().await? {
        SyncOutcome::Completed(report) => print_drain(&report),
        SyncOutcome::Skipped => println!("Sync already running"),
    }
    Ok(())
}

/// Pull, merge and push the given stores (all when empty).
pub async fn sync(stores: &[String], output: OutputFormat) -> Result<()> {
    let scope = if stores.is_empty() {
        SyncScope::All
    } else {
        SyncScope::Only(
            stores
                .iter()
                .map(|s| parse_store(s))
                .collect::<Result<Vec<_>>>()?,
        )
    };

    let ws = Workspace::open()?;
    let reconciler = ws.reconciler()?;
    let report = match reconciler.sync_all_data(&scope).await? {
        SyncOutcome::Completed(report) => report,
        SyncOutcome::Skipped => {
            println!("Sync already running");
            return Ok(());
        }
    };

    match output {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            for collection in &report.collections {
                print_collection(collection);
            }
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct StatusJson {
    owner: String,
    remote: Option<String>,
    online: bool,
    queue: QueueCounts,
    orphans: usize,
}

pub async fn status(output: OutputFormat) -> Result<()> {
    let ws = Workspace::open()?;
    let network = ws.probe_network().await;
    let queue = tally_core::SyncQueue::new(ws.store.clone()).counts()?;
    let status = StatusJson {
        owner: ws.config.owner.clone(),
        remote: ws.config.remote_url().map(String::from),
        online: network.is_online(),
        queue,
        orphans: ws.store.pending_actions()?.len(),
    };

    match output {
        OutputFormat::Json => print_json(&status),
        OutputFormat::Text => {
            println!("Owner: {}", status.owner);
            match &status.remote {
                Some(url) => println!(
                    "Remote: {} ({})",
                    url,
                    if status.online { "reachable" } else { "unreachable" }
                ),
                None => println!("Remote: none (local-only)"),
            }
            println!(
                "Queue: {} pending, {} retrying, {} failed",
                status.queue.pending, status.queue.retry, status.queue.failed
            );
            if status.orphans > 0 {
                println!("Orphans: {} (see 'tally orphans list')", status.orphans);
            }
            Ok(())
        }
    }
}

fn report_pass(reconciler: &Reconciler, last_error: Option<&str>) -> Result<()> {
    match last_error {
        Some(err) => eprintln!("sync failed: {}", err),
        None => {
            let counts = reconciler.queue_counts()?;
            println!(
                "Queue: {} waiting, {} failed",
                counts.open(),
                counts.failed
            );
        }
    }
    Ok(())
}

/// Probe connectivity and drain the queue in the foreground until Ctrl-C.
pub async fn watch() -> Result<()> {
    let ws = Workspace::open()?;
    let remote = ws.config.remote.clone().ok_or(Error::NoRemoteConfigured)?;
    let probe = TcpProbe::from_url(&remote.url, remote.connect_timeout())
        .ok_or_else(|| Error::InvalidRemoteUrl(remote.url.clone()))?;

    let reconciler = Arc::new(ws.reconciler()?);
    let network = NetworkMonitor::new(false);
    let probe_task = watch_probe(network.clone(), probe, remote.probe_interval());
    let scheduler = SyncScheduler::new(Arc::clone(&reconciler), &network)
        .idle_poll(remote.probe_interval())
        .spawn();

    println!("Watching {} (Ctrl-C to stop)", remote.url);
    let mut status = reconciler.status();
    let result = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => break signal.map_err(Error::from),
            changed = status.changed() => match changed {
                Some(s) if s.phase == SyncPhase::Idle => {
                    if let Err(e) = report_pass(&reconciler, s.last_error.as_deref()) {
                        break Err(e);
                    }
                }
                Some(_) => {}
                None => break Ok(()),
            },
        }
    };

    probe_task.abort();
    scheduler.shutdown().await;
    result
}
