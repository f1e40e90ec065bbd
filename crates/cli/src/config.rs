// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Project configuration management.
//!
//! Configuration is stored in `.tally/config.toml` and includes:
//! - `owner`: the user whose remote collections are synced (`users/{owner}/...`)
//! - `local_id_prefix`: prefix of ids minted offline (default "local")
//! - `[remote]`: optional WebSocket remote; without it the CLI runs local-only
//! - `[retry]`: attempt budget and backoff for queued operations

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tally_core::MergeStrategy;

use crate::error::{Error, Result};
use crate::sync::{ReconcilerConfig, RetryPolicy};

const WORK_DIR_NAME: &str = ".tally";
const CONFIG_FILE_NAME: &str = "config.toml";
const DB_FILE_NAME: &str = "tally.db";

/// Project configuration stored in `.tally/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub owner: String,
    #[serde(default = "default_local_id_prefix")]
    pub local_id_prefix: String,
    /// How pulled records are combined with local copies.
    #[serde(default)]
    pub merge: MergeStrategy,
    /// Remote sync configuration (optional - if absent, runs in local-only mode).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub retry: RetryPolicy,
}

/// WebSocket remote configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// `ws://...` or `wss://...`
    pub url: String,
    /// Max time to wait for a connection in seconds (default: 2).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Seconds between reachability probes in `tally watch` (default: 5).
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
}

fn default_local_id_prefix() -> String {
    tally_core::record::DEFAULT_LOCAL_PREFIX.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    2
}

fn default_probe_interval_secs() -> u64 {
    5
}

impl RemoteConfig {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let remote = RemoteConfig {
            url: url.into(),
            connect_timeout_secs: default_connect_timeout_secs(),
            probe_interval_secs: default_probe_interval_secs(),
        };
        remote.validate_url()?;
        Ok(remote)
    }

    pub fn validate_url(&self) -> Result<()> {
        let rest = self
            .url
            .strip_prefix("ws://")
            .or_else(|| self.url.strip_prefix("wss://"));
        match rest {
            Some(host) if !host.is_empty() => Ok(()),
            _ => Err(Error::InvalidRemoteUrl(self.url.clone())),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs.max(1))
    }
}

impl Config {
    /// Creates a local-only config for `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldRequired`] for an empty owner and
    /// [`Error::Config`] if it contains a path separator.
    pub fn new(owner: impl Into<String>) -> Result<Self> {
        let owner = owner.into();
        validate_owner(&owner)?;
        Ok(Config {
            owner,
            local_id_prefix: default_local_id_prefix(),
            merge: MergeStrategy::default(),
            remote: None,
            retry: RetryPolicy::default(),
        })
    }

    /// Loads configuration from the given `.tally/` directory.
    pub fn load(work_dir: &Path) -> Result<Self> {
        let config_path = work_dir.join(CONFIG_FILE_NAME);
        let content = fs::read_to_string(&config_path)
            .map_err(|e| Error::Config(format!("failed to read config: {}", e)))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;
        validate_owner(&config.owner)?;
        if let Some(remote) = &config.remote {
            remote.validate_url()?;
        }
        Ok(config)
    }

    /// Saves configuration to the given `.tally/` directory.
    pub fn save(&self, work_dir: &Path) -> Result<()> {
        let config_path = work_dir.join(CONFIG_FILE_NAME);
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(&config_path, content)?;
        Ok(())
    }

    /// Returns the remote URL if configured.
    pub fn remote_url(&self) -> Option<&str> {
        self.remote.as_ref().map(|r| r.url.as_str())
    }

    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            owner: self.owner.clone(),
            local_id_prefix: self.local_id_prefix.clone(),
            retry: self.retry,
            merge: self.merge,
        }
    }
}

fn validate_owner(owner: &str) -> Result<()> {
    if owner.trim().is_empty() {
        return Err(Error::FieldRequired("owner"));
    }
    if owner.contains('/') {
        return Err(Error::Config(format!(
            "owner '{owner}' must not contain '/'"
        )));
    }
    Ok(())
}

/// Find the .tally directory by walking up from the current directory
pub fn find_work_dir() -> Result<PathBuf> {
    let mut current = std::env::current_dir()?;
    loop {
        let work_dir = current.join(WORK_DIR_NAME);
        if work_dir.is_dir() {
            return Ok(work_dir);
        }
        if !current.pop() {
            return Err(Error::NotInitialized);
        }
    }
}

pub fn get_db_path(work_dir: &Path) -> PathBuf {
    work_dir.join(DB_FILE_NAME)
}

/// Initialize a new .tally directory at the given path
pub fn init_work_dir(path: &Path, config: &Config) -> Result<PathBuf> {
    let work_dir = path.join(WORK_DIR_NAME);

    if work_dir.join(CONFIG_FILE_NAME).exists() {
        return Err(Error::AlreadyInitialized(work_dir.display().to_string()));
    }

    fs::create_dir_all(&work_dir)?;
    config.save(&work_dir)?;

    Ok(work_dir)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
