// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for sync module tests.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tally_core::protocol::{ClientMessage, ServerMessage};
use tally_core::{Fields, Record};

use super::remote::{RemoteError, RemoteFuture, RemoteStore};
use super::transport::{Transport, TransportError, TransportResult};

/// A party record with a name and phone.
pub fn party(id: &str, phone: &str) -> Record {
    let mut fields = Fields::new();
    fields.insert("name".into(), json!("Acme"));
    fields.insert("phone".into(), json!(phone));
    Record::new(id, fields)
}

/// A remote call observed by [`MockRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetAll(String),
    Add(String, String),
    Upsert(String, String),
    Delete(String, String),
}

#[derive(Default)]
struct MockState {
    collections: HashMap<String, BTreeMap<String, Record>>,
    next_id: u64,
    /// Ids handed out by `add`, keyed by collection and client id.
    assigned: HashMap<(String, String), String>,
    offline: bool,
    lost_replies: u32,
    fail_next: u32,
    fail_ids: HashSet<String>,
    calls: Vec<Call>,
}

impl MockState {
    fn check(&mut self, record_id: Option<&str>) -> Result<(), RemoteError> {
        if self.offline {
            return Err(TransportError::ConnectionFailed("mock offline".into()).into());
        }
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(TransportError::ReceiveFailed("mock failure".into()).into());
        }
        if record_id.is_some_and(|id| self.fail_ids.contains(id)) {
            return Err(RemoteError::Rejected("mock rejected".into()));
        }
        Ok(())
    }

    /// Fail a write that was already applied, as a dropped reply would.
    fn reply(&mut self) -> Result<(), RemoteError> {
        if self.lost_replies > 0 {
            self.lost_replies -= 1;
            return Err(TransportError::ReceiveFailed("mock reply lost".into()).into());
        }
        Ok(())
    }
}

/// In-memory remote document store with failure injection.
///
/// Clones share state, so a test can keep one handle while the code under
/// test owns another.
#[derive(Clone, Default)]
pub struct MockRemote {
    state: Arc<Mutex<MockState>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    /// Fail the next `n` calls.
    pub fn fail_next(&self, n: u32) {
        self.state.lock().unwrap().fail_next = n;
    }

    /// Apply the next `n` writes but report them as failed.
    pub fn lose_next_reply(&self, n: u32) {
        self.state.lock().unwrap().lost_replies = n;
    }

    /// Reject every mutation of the given record id.
    pub fn fail_id(&self, id: &str) {
        self.state.lock().unwrap().fail_ids.insert(id.to_string());
    }

    /// Put a document directly into a collection.
    pub fn seed(&self, collection: &str, record: Record) {
        self.state
            .lock()
            .unwrap()
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(record.id.clone(), record);
    }

    /// Remove a document behind the client's back.
    pub fn remove(&self, collection: &str, id: &str) {
        if let Some(docs) = self.state.lock().unwrap().collections.get_mut(collection) {
            docs.remove(id);
        }
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<Record> {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned())
    }

    pub fn records(&self, collection: &str) -> Vec<Record> {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of mutating calls (add, upsert, delete).
    pub fn write_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| !matches!(c, Call::GetAll(_)))
            .count()
    }
}

impl RemoteStore for MockRemote {
    fn get_all<'a>(&'a self, collection: &'a str) -> RemoteFuture<'a, Vec<Record>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::GetAll(collection.to_string()));
            state.check(None)?;
            Ok(state
                .collections
                .get(collection)
                .map(|docs| docs.values().cloned().collect())
                .unwrap_or_default())
        })
    }

    fn add<'a>(&'a self, collection: &'a str, record: &'a Record) -> RemoteFuture<'a, String> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state
                .calls
                .push(Call::Add(collection.to_string(), record.id.clone()));
            state.check(Some(&record.id))?;
            let key = (collection.to_string(), record.id.clone());
            let id = match state.assigned.get(&key).cloned() {
                Some(id) => id,
                None => {
                    state.next_id += 1;
                    let id = format!("srv-{}", state.next_id);
                    state.assigned.insert(key, id.clone());
                    id
                }
            };
            let mut stored = record.clone();
            stored.id = id.clone();
            state
                .collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.clone(), stored);
            state.reply()?;
            Ok(id)
        })
    }

    fn upsert<'a>(&'a self, collection: &'a str, record: &'a Record) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state
                .calls
                .push(Call::Upsert(collection.to_string(), record.id.clone()));
            state.check(Some(&record.id))?;
            state
                .collections
                .entry(collection.to_string())
                .or_default()
                .insert(record.id.clone(), record.clone());
            state.reply()
        })
    }

    fn delete<'a>(&'a self, collection: &'a str, id: &'a str) -> RemoteFuture<'a, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state
                .calls
                .push(Call::Delete(collection.to_string(), id.to_string()));
            state.check(Some(id))?;
            if let Some(docs) = state.collections.get_mut(collection) {
                docs.remove(id);
            }
            state.reply()
        })
    }
}

type Responder = Box<dyn FnMut(&ClientMessage) -> Vec<ServerMessage> + Send>;

/// Transport whose server side is a closure.
///
/// Every sent message is recorded and handed to the responder; whatever it
/// returns is queued for `recv`. An empty queue reads as a closed connection.
pub struct MockTransport {
    connected: bool,
    connect_failures: u32,
    respond: Responder,
    incoming: VecDeque<ServerMessage>,
    outgoing: Arc<Mutex<Vec<ClientMessage>>>,
    connects: Arc<Mutex<u32>>,
}

impl MockTransport {
    pub fn new(respond: impl FnMut(&ClientMessage) -> Vec<ServerMessage> + Send + 'static) -> Self {
        MockTransport {
            connected: false,
            connect_failures: 0,
            respond: Box::new(respond),
            incoming: VecDeque::new(),
            outgoing: Arc::new(Mutex::new(Vec::new())),
            connects: Arc::new(Mutex::new(0)),
        }
    }

    /// Fail the next `n` connection attempts.
    pub fn fail_connects(mut self, n: u32) -> Self {
        self.connect_failures = n;
        self
    }

    /// Shared log of sent messages.
    pub fn outgoing(&self) -> Arc<Mutex<Vec<ClientMessage>>> {
        Arc::clone(&self.outgoing)
    }

    /// Shared count of successful connects.
    pub fn connects(&self) -> Arc<Mutex<u32>> {
        Arc::clone(&self.connects)
    }
}

impl Transport for MockTransport {
    fn connect<'a>(
        &'a mut self,
        _url: &'a str,
        _timeout: Duration,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = TransportResult<()>> + Send + 'a>>
    {
        Box::pin(async move {
            if self.connect_failures > 0 {
                self.connect_failures -= 1;
                return Err(TransportError::ConnectionFailed("mock failure".into()));
            }
            self.connected = true;
            *self.connects.lock().unwrap() += 1;
            Ok(())
        })
    }

    fn disconnect(
        &mut self,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = TransportResult<()>> + Send + '_>>
    {
        Box::pin(async move {
            self.connected = false;
            Ok(())
        })
    }

    fn send(
        &mut self,
        msg: ClientMessage,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = TransportResult<()>> + Send + '_>>
    {
        Box::pin(async move {
            if !self.connected {
                return Err(TransportError::ConnectionClosed);
            }
            let replies = (self.respond)(&msg);
            self.incoming.extend(replies);
            self.outgoing.lock().unwrap().push(msg);
            Ok(())
        })
    }

    fn recv(
        &mut self,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = TransportResult<Option<ServerMessage>>> + Send + '_>,
    > {
        Box::pin(async move {
            match self.incoming.pop_front() {
                Some(msg) => Ok(Some(msg)),
                None => {
                    self.connected = false;
                    Ok(None)
                }
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
