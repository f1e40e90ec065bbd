// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::str::FromStr;

use tally_core::{QueueEntry, QueueStatus, SyncQueue};

use crate::cli::OutputFormat;
use crate::error::Result;

use super::{print_json, Workspace};

pub(crate) fn format_entry(entry: &QueueEntry) -> String {
    let mut line = format!(
        "#{:<4} {:<6} {}/{}  {}",
        entry.id,
        entry.action.kind().as_str(),
        entry.action.store(),
        entry.action.record_id(),
        entry.status,
    );
    if entry.retry_count > 0 {
        line.push_str(&format!(" (attempts: {})", entry.retry_count));
    }
    if let Some(err) = &entry.last_error {
        line.push_str(&format!("\n       last error: {}", err));
    }
    line
}

pub fn list(status: Option<&str>, output: OutputFormat) -> Result<()> {
    let status = status.map(QueueStatus::from_str).transpose()?;
    let ws = Workspace::open()?;
    let queue = SyncQueue::new(ws.store.clone());
    let entries = match status {
        Some(status) => queue.by_status(status)?,
        None => queue.all()?,
    };

    match output {
        OutputFormat::Json => print_json(&entries),
        OutputFormat::Text => {
            if entries.is_empty() {
                println!("Queue is empty");
            }
            for entry in &entries {
                println!("{}", format_entry(entry));
            }
            Ok(())
        }
    }
}

pub fn retry(id: Option<i64>, all: bool) -> Result<()> {
    let ws = Workspace::open()?;
    let queue = SyncQueue::new(ws.store.clone());

    match id {
        Some(id) if !all => {
            if queue.retry_failed(id)? {
                println!("Entry #{} returned to pending", id);
            } else {
                println!("Entry #{} is not failed", id);
            }
        }
        _ => {
            let count = queue.retry_all_failed()?;
            println!("Returned {} failed entries to pending", count);
        }
    }
    Ok(())
}

pub fn clear() -> Result<()> {
    let ws = Workspace::open()?;
    let count = SyncQueue::new(ws.store.clone()).clear_failed()?;
    println!("Removed {} failed entries", count);
    Ok(())
}
