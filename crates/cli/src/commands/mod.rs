// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod init;
pub mod orphans;
pub mod queue;
pub mod records;
pub mod sync;

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tally_core::{Fields, Store, StoreName};
use tracing::debug;

use crate::config::{find_work_dir, get_db_path, Config};
use crate::entities::{EntityContext, EntityService};
use crate::error::{Error, Result};
use crate::network::{ConnectivityProbe, NetworkMonitor, TcpProbe};
use crate::sync::{Reconciler, RemoteClient};

/// An opened `.tally` directory.
pub struct Workspace {
    pub work_dir: PathBuf,
    pub config: Config,
    pub store: Store,
}

impl Workspace {
    /// Open the workspace found from the current directory.
    pub fn open() -> Result<Self> {
        let work_dir = find_work_dir()?;
        let config = Config::load(&work_dir)?;
        let store = Store::open(&get_db_path(&work_dir))?;
        debug!(work_dir = %work_dir.display(), "opened workspace");
        Ok(Workspace {
            work_dir,
            config,
            store,
        })
    }

    /// Reconciler bound to the configured remote.
    pub fn reconciler(&self) -> Result<Reconciler> {
        let remote = self.config.remote.as_ref().ok_or(Error::NoRemoteConfigured)?;
        let client = RemoteClient::new(remote.url.clone(), remote.connect_timeout());
        Ok(Reconciler::new(
            self.store.clone(),
            Arc::new(client),
            self.config.reconciler_config(),
        ))
    }

    /// Probe the remote host once. Offline when no remote is configured.
    pub async fn probe_network(&self) -> NetworkMonitor {
        let probe = self
            .config
            .remote
            .as_ref()
            .and_then(|r| TcpProbe::from_url(&r.url, r.connect_timeout()));
        let online = match probe {
            Some(probe) => probe.check().await,
            None => false,
        };
        debug!(online, "probed connectivity");
        NetworkMonitor::new(online)
    }

    /// Service for one entity store, pushing directly when the remote is up.
    pub async fn entity_service(&self, store: StoreName) -> Result<EntityService> {
        let network = self.probe_network().await;
        let mut ctx = EntityContext::new(self.store.clone(), network, self.config.owner.clone())
            .with_local_id_prefix(self.config.local_id_prefix.clone());
        if self.config.remote.is_some() {
            let reconciler = self.reconciler()?;
            ctx = ctx.with_remote(reconciler.remote(), reconciler.status());
        }
        EntityService::new(store, ctx)
    }
}

/// Parse a user-supplied entity store name.
pub fn parse_store(name: &str) -> Result<StoreName> {
    let store = StoreName::from_str(name)?;
    Ok(store.require_entity()?)
}

/// Parse `key=value` assignments. Values that parse as JSON keep their
/// type; anything else is a string.
pub fn parse_assignments(args: &[String]) -> Result<Fields> {
    let mut fields = Fields::new();
    for arg in args {
        let (key, raw) = arg
            .split_once('=')
            .ok_or_else(|| Error::InvalidAssignment(arg.clone()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::InvalidAssignment(arg.clone()));
        }
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        fields.insert(key.to_string(), value);
    }
    Ok(fields)
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
