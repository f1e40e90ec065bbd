// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::sync::Resolution;

use super::{parse_store, print_json, Workspace};

pub fn list(output: OutputFormat) -> Result<()> {
    let ws = Workspace::open()?;
    let held = ws.store.pending_actions()?;

    match output {
        OutputFormat::Json => {
            let actions: Vec<_> = held.iter().map(|r| &r.fields).collect();
            print_json(&actions)
        }
        OutputFormat::Text => {
            if held.is_empty() {
                println!("No orphaned records");
            }
            for entry in &held {
                let action = &entry.fields;
                println!(
                    "{}/{}  {}  held {}",
                    action.store_name,
                    action.record.id,
                    action.reason,
                    entry.created_at.format("%Y-%m-%d %H:%M")
                );
            }
            Ok(())
        }
    }
}

pub fn resolve(store: &str, id: &str, repush: bool) -> Result<()> {
    let store = parse_store(store)?;
    let ws = Workspace::open()?;
    let resolution = if repush {
        Resolution::Repush
    } else {
        Resolution::DropLocal
    };
    ws.reconciler()?.resolve_orphan(store, id, resolution)?;

    match resolution {
        Resolution::Repush => println!("Queued {}/{} for upload (run 'tally push')", store, id),
        Resolution::DropLocal => println!("Dropped {}/{}", store, id),
    }
    Ok(())
}
