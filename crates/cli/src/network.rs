// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity observation.
//!
//! The [`NetworkMonitor`] only reports. It never starts a sync itself;
//! the scheduler subscribes to its transitions and decides what to do.
//! "Online" means the probe could reach the remote host, which says nothing
//! about whether the next request will succeed.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Coarse link quality derived from a platform hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Poor,
    Fair,
    Good,
    Unknown,
}

impl Quality {
    /// Map a connection-type hint such as `"4g"` or `"wifi"`.
    pub fn from_hint(hint: &str) -> Self {
        match hint.trim().to_lowercase().as_str() {
            "slow-2g" | "2g" => Quality::Poor,
            "3g" => Quality::Fair,
            "4g" | "5g" | "wifi" | "ethernet" => Quality::Good,
            _ => Quality::Unknown,
        }
    }
}

/// A connectivity transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkEvent {
    Online,
    Offline,
}

struct NetworkState {
    online: bool,
    quality: Quality,
}

struct Inner {
    state: Mutex<NetworkState>,
    events: broadcast::Sender<NetworkEvent>,
}

/// Current connectivity plus edge-triggered change notifications.
///
/// Clones share state.
#[derive(Clone)]
pub struct NetworkMonitor {
    inner: Arc<Inner>,
}

impl NetworkMonitor {
    pub fn new(online: bool) -> Self {
        let (events, _) = broadcast::channel(16);
        NetworkMonitor {
            inner: Arc::new(Inner {
                state: Mutex::new(NetworkState {
                    online,
                    quality: Quality::Unknown,
                }),
                events,
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, NetworkState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_online(&self) -> bool {
        self.state().online
    }

    pub fn quality(&self) -> Quality {
        self.state().quality
    }

    /// Record the observed connectivity.
    ///
    /// Emits an event only when the value changes. Returns whether it did.
    pub fn set_online(&self, online: bool) -> bool {
        {
            let mut state = self.state();
            if state.online == online {
                return false;
            }
            state.online = online;
        }

        let event = if online {
            NetworkEvent::Online
        } else {
            NetworkEvent::Offline
        };
        info!(?event, "connectivity changed");
        // No subscribers is fine
        let _ = self.inner.events.send(event);
        true
    }

    pub fn set_quality_hint(&self, hint: &str) {
        let quality = Quality::from_hint(hint);
        debug!(hint, ?quality, "connection quality hint");
        self.state().quality = quality;
    }

    /// Subscribe to future transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<NetworkEvent> {
        self.inner.events.subscribe()
    }
}

/// Something that can tell whether the remote is reachable.
pub trait ConnectivityProbe: Send + Sync {
    fn check(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;
}

/// Probe that opens (and drops) a TCP connection.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    addr: String,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
        TcpProbe {
            addr: addr.into(),
            timeout,
        }
    }

    /// Probe the host of a `ws://` or `wss://` URL.
    ///
    /// Uses the default port of the scheme when the URL has none.
    pub fn from_url(url: &str, timeout: Duration) -> Option<Self> {
        let (rest, default_port) = if let Some(rest) = url.strip_prefix("ws://") {
            (rest, 80)
        } else if let Some(rest) = url.strip_prefix("wss://") {
            (rest, 443)
        } else {
            return None;
        };

        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if authority.is_empty() {
            return None;
        }

        let has_port = match authority.rfind(':') {
            // IPv6 literals contain colons inside brackets
            Some(i) => !authority[i..].contains(']'),
            None => false,
        };
        let addr = if has_port {
            authority.to_string()
        } else {
            format!("{authority}:{default_port}")
        };
        Some(TcpProbe::new(addr, timeout))
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl ConnectivityProbe for TcpProbe {
    fn check(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(async move {
            matches!(
                tokio::time::timeout(self.timeout, TcpStream::connect(&self.addr)).await,
                Ok(Ok(_))
            )
        })
    }
}

/// Poll `probe` every `interval` and feed the result into `monitor`.
///
/// The first check runs immediately. The task runs until aborted.
pub fn watch_probe<P>(monitor: NetworkMonitor, probe: P, interval: Duration) -> JoinHandle<()>
where
    P: ConnectivityProbe + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let reachable = probe.check().await;
            monitor.set_online(reachable);
        }
    })
}

#[cfg(test)]
#[path = "network_tests.rs"]
mod tests;
