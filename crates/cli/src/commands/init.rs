// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use tally_core::Store;

use crate::config::{get_db_path, init_work_dir, Config, RemoteConfig};
use crate::error::Result;

pub fn run(
    owner: String,
    remote: Option<String>,
    path: Option<String>,
    local_id_prefix: Option<String>,
) -> Result<()> {
    let target_path = match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir()?,
    };

    let mut config = Config::new(owner)?;
    if let Some(prefix) = local_id_prefix {
        config.local_id_prefix = prefix;
    }
    if let Some(url) = remote {
        config.remote = Some(RemoteConfig::new(url)?);
    }

    let work_dir = init_work_dir(&target_path, &config)?;
    Store::open(&get_db_path(&work_dir))?;

    println!("Initialized tally at {}", work_dir.display());
    println!("Owner: {}", config.owner);
    match config.remote_url() {
        Some(url) => println!("Remote: {}", url),
        None => println!("Remote: none (local-only, changes stay queued)"),
    }
    Ok(())
}

#[cfg(test)]
#[path = "init_tests.rs"]
mod tests;
