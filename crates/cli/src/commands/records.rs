// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use serde::Serialize;
use tally_core::{Record, StoreName, SyncQueue};

use crate::cli::OutputFormat;
use crate::entities::{Confirmation, Saved};
use crate::error::{Error, Result};

use super::{parse_assignments, parse_store, print_json, Workspace};

fn confirmation_label(confirmation: Confirmation) -> &'static str {
    match confirmation {
        Confirmation::Synced => "synced",
        Confirmation::Queued => "queued",
    }
}

fn print_saved(verb: &str, store: StoreName, saved: &Saved, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => print_json(saved),
        OutputFormat::Text => {
            println!(
                "{} {}/{} ({})",
                verb,
                store,
                saved.record.id,
                confirmation_label(saved.confirmation)
            );
            Ok(())
        }
    }
}

pub async fn add(store: &str, assignments: &[String], output: OutputFormat) -> Result<()> {
    let store = parse_store(store)?;
    let fields = parse_assignments(assignments)?;
    let ws = Workspace::open()?;
    let saved = ws.entity_service(store).await?.create(fields).await?;
    print_saved("Created", store, &saved, output)
}

pub async fn edit(
    store: &str,
    id: &str,
    assignments: &[String],
    output: OutputFormat,
) -> Result<()> {
    let store = parse_store(store)?;
    let patch = parse_assignments(assignments)?;
    let ws = Workspace::open()?;
    let saved = ws.entity_service(store).await?.update(id, patch).await?;
    print_saved("Updated", store, &saved, output)
}

pub async fn rm(store: &str, id: &str) -> Result<()> {
    let store = parse_store(store)?;
    let ws = Workspace::open()?;
    let confirmation = ws.entity_service(store).await?.delete(id).await?;
    println!(
        "Deleted {}/{} ({})",
        store,
        id,
        confirmation_label(confirmation)
    );
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListedRecord<'a> {
    #[serde(flatten)]
    record: &'a Record,
    /// Local changes not yet confirmed by the remote.
    unsynced: bool,
}

pub fn list(store: &str, output: OutputFormat) -> Result<()> {
    let store = parse_store(store)?;
    let ws = Workspace::open()?;
    let queue = SyncQueue::new(ws.store.clone());
    let records = ws.store.get_all(store)?;

    let mut listed = Vec::with_capacity(records.len());
    for record in &records {
        let unsynced = queue.has_open_entry(store, &record.id)?;
        listed.push(ListedRecord { record, unsynced });
    }

    match output {
        OutputFormat::Json => print_json(&listed),
        OutputFormat::Text => {
            if listed.is_empty() {
                println!("No {}", store);
            }
            for item in &listed {
                let marker = if item.unsynced { "*" } else { " " };
                println!(
                    "{} {}  {}",
                    marker,
                    item.record.id,
                    serde_json::Value::Object(item.record.fields.clone())
                );
            }
            Ok(())
        }
    }
}

pub fn show(store: &str, id: &str, output: OutputFormat) -> Result<()> {
    let store = parse_store(store)?;
    let ws = Workspace::open()?;
    let record = ws
        .store
        .get(store, id)?
        .ok_or_else(|| Error::RecordNotFound {
            store,
            id: id.to_string(),
        })?;

    match output {
        OutputFormat::Json => print_json(&record),
        OutputFormat::Text => {
            println!("{}/{}", store, record.id);
            println!("Created: {}", record.created_at.format("%Y-%m-%d %H:%M:%S"));
            println!("Updated: {}", record.updated_at.format("%Y-%m-%d %H:%M:%S"));
            for (key, value) in &record.fields {
                match value {
                    serde_json::Value::String(s) => println!("  {}: {}", key, s),
                    other => println!("  {}: {}", key, other),
                }
            }
            Ok(())
        }
    }
}
