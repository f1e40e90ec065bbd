// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The remote document store as seen by the sync engine.
//!
//! [`RemoteStore`] is the seam the reconciler and feature modules talk to.
//! [`RemoteClient`] implements it over any [`Transport`], matching each
//! response to its request by `request_id`.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tally_core::protocol::{ClientMessage, ServerMessage};
use tally_core::Record;
use tokio::sync::Mutex;
use tracing::debug;

use super::transport::{Transport, TransportError, WebSocketTransport};

/// Error type for remote store operations.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with an error.
    #[error("rejected by remote: {0}")]
    Rejected(String),

    /// The server answered with a message of the wrong kind.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

/// Result type for remote store operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Boxed future returned by [`RemoteStore`] methods.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = RemoteResult<T>> + Send + 'a>>;

/// Operations the remote document store supports.
///
/// Collections are addressed by path (see
/// [`collection_path`](tally_core::protocol::collection_path)).
pub trait RemoteStore: Send + Sync {
    /// Every document in a collection.
    fn get_all<'a>(&'a self, collection: &'a str) -> RemoteFuture<'a, Vec<Record>>;

    /// Create a document and return the id the remote assigned to it.
    ///
    /// Adding the same client `record.id` to a collection again returns the
    /// id from the first add and creates no second document.
    fn add<'a>(&'a self, collection: &'a str, record: &'a Record) -> RemoteFuture<'a, String>;

    /// Create or replace the document with `record.id`.
    fn upsert<'a>(&'a self, collection: &'a str, record: &'a Record) -> RemoteFuture<'a, ()>;

    /// Remove a document. Removing a missing document is not an error.
    fn delete<'a>(&'a self, collection: &'a str, id: &'a str) -> RemoteFuture<'a, ()>;
}

/// [`RemoteStore`] over a message transport.
///
/// Connects lazily on the first request and again after any transport
/// failure. Requests are serialized: one request is in flight at a time.
pub struct RemoteClient<T: Transport = WebSocketTransport> {
    url: String,
    connect_timeout: Duration,
    transport: Mutex<T>,
    next_request_id: AtomicU64,
}

impl RemoteClient<WebSocketTransport> {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self::with_transport(url, connect_timeout, WebSocketTransport::new())
    }
}

impl<T: Transport> RemoteClient<T> {
    /// Create a client with a custom transport (for testing).
    pub fn with_transport(url: impl Into<String>, connect_timeout: Duration, transport: T) -> Self {
        RemoteClient {
            url: url.into(),
            connect_timeout,
            transport: Mutex::new(transport),
            next_request_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn next_id(&self) -> u64 {
        self.next_request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Send one request and wait for the response carrying its id.
    async fn request(&self, msg: ClientMessage) -> RemoteResult<ServerMessage> {
        let request_id = msg.request_id();
        let mut transport = self.transport.lock().await;

        if !transport.is_connected() {
            debug!(url = %self.url, "connecting to remote");
            transport.connect(&self.url, self.connect_timeout).await?;
        }

        transport.send(msg).await?;

        loop {
            let Some(response) = transport.recv().await? else {
                return Err(TransportError::ConnectionClosed.into());
            };
            match response {
                ServerMessage::Error {
                    request_id: None,
                    message,
                } => return Err(RemoteError::Rejected(message)),
                // Late answers to abandoned requests and keepalives
                other if other.request_id() != request_id => {
                    debug!(?other, "skipping uncorrelated message");
                    continue;
                }
                ServerMessage::Error { message, .. } => return Err(RemoteError::Rejected(message)),
                other => return Ok(other),
            }
        }
    }
}

fn unexpected(expected: &str, got: &ServerMessage) -> RemoteError {
    RemoteError::UnexpectedResponse(format!("expected {expected}, got {got:?}"))
}

impl<T: Transport> RemoteStore for RemoteClient<T> {
    fn get_all<'a>(&'a self, collection: &'a str) -> RemoteFuture<'a, Vec<Record>> {
        Box::pin(async move {
            match self
                .request(ClientMessage::get_all(self.next_id(), collection))
                .await?
            {
                ServerMessage::Records { records, .. } => Ok(records),
                other => Err(unexpected("records", &other)),
            }
        })
    }

    fn add<'a>(&'a self, collection: &'a str, record: &'a Record) -> RemoteFuture<'a, String> {
        Box::pin(async move {
            match self
                .request(ClientMessage::add(self.next_id(), collection, record.clone()))
                .await?
            {
                ServerMessage::Added { id, .. } => Ok(id),
                other => Err(unexpected("added", &other)),
            }
        })
    }

    fn upsert<'a>(&'a self, collection: &'a str, record: &'a Record) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            match self
                .request(ClientMessage::upsert(self.next_id(), collection, record.clone()))
                .await?
            {
                ServerMessage::Ack { .. } => Ok(()),
                other => Err(unexpected("ack", &other)),
            }
        })
    }

    fn delete<'a>(&'a self, collection: &'a str, id: &'a str) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            match self
                .request(ClientMessage::delete(self.next_id(), collection, id))
                .await?
            {
                ServerMessage::Ack { .. } => Ok(()),
                other => Err(unexpected("ack", &other)),
            }
        })
    }
}
