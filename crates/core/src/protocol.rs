// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol messages for the remote document store.
//!
//! The protocol is request/response:
//! - Client sends a request carrying a `request_id`
//! - Server answers with exactly one message echoing that `request_id`
//!
//! Collections are addressed by path, `users/{owner}/{store}`.

use serde::{Deserialize, Serialize};

use crate::record::{Record, StoreName};

/// Path of a user's collection on the remote.
pub fn collection_path(owner: &str, store: StoreName) -> String {
    format!("users/{}/{}", owner, store)
}

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Fetch every document in a collection.
    GetAll { request_id: u64, collection: String },

    /// Create a document. The server assigns its id; the record's own id
    /// is ignored.
    Add {
        request_id: u64,
        collection: String,
        record: Record,
    },

    /// Create or replace the document stored under `id`.
    Upsert {
        request_id: u64,
        collection: String,
        id: String,
        record: Record,
    },

    /// Remove a document. Removing a missing document succeeds.
    Delete {
        request_id: u64,
        collection: String,
        id: String,
    },

    /// Ping message for keepalive.
    Ping {
        /// Client-chosen ID echoed in Pong.
        id: u64,
    },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Response to GetAll.
    Records {
        request_id: u64,
        records: Vec<Record>,
    },

    /// Response to Add, carrying the assigned id.
    Added { request_id: u64, id: String },

    /// Response to Upsert and Delete.
    Ack { request_id: u64 },

    /// Pong response to client Ping.
    Pong { id: u64 },

    /// A request could not be served.
    ///
    /// `request_id` is absent when the request itself could not be parsed.
    Error {
        request_id: Option<u64>,
        message: String,
    },
}

impl ClientMessage {
    pub fn get_all(request_id: u64, collection: impl Into<String>) -> Self {
        ClientMessage::GetAll {
            request_id,
            collection: collection.into(),
        }
    }

    pub fn add(request_id: u64, collection: impl Into<String>, record: Record) -> Self {
        ClientMessage::Add {
            request_id,
            collection: collection.into(),
            record,
        }
    }

    pub fn upsert(request_id: u64, collection: impl Into<String>, record: Record) -> Self {
        ClientMessage::Upsert {
            request_id,
            collection: collection.into(),
            id: record.id.clone(),
            record,
        }
    }

    pub fn delete(request_id: u64, collection: impl Into<String>, id: impl Into<String>) -> Self {
        ClientMessage::Delete {
            request_id,
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn ping(id: u64) -> Self {
        ClientMessage::Ping { id }
    }

    /// Request id of the message, if it expects a correlated response.
    pub fn request_id(&self) -> Option<u64> {
        match self {
            ClientMessage::GetAll { request_id, .. }
            | ClientMessage::Add { request_id, .. }
            | ClientMessage::Upsert { request_id, .. }
            | ClientMessage::Delete { request_id, .. } => Some(*request_id),
            ClientMessage::Ping { .. } => None,
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    pub fn records(request_id: u64, records: Vec<Record>) -> Self {
        ServerMessage::Records {
            request_id,
            records,
        }
    }

    pub fn added(request_id: u64, id: impl Into<String>) -> Self {
        ServerMessage::Added {
            request_id,
            id: id.into(),
        }
    }

    pub fn ack(request_id: u64) -> Self {
        ServerMessage::Ack { request_id }
    }

    pub fn pong(id: u64) -> Self {
        ServerMessage::Pong { id }
    }

    pub fn error(request_id: Option<u64>, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            request_id,
            message: message.into(),
        }
    }

    /// Request id this message answers, if any.
    pub fn request_id(&self) -> Option<u64> {
        match self {
            ServerMessage::Records { request_id, .. }
            | ServerMessage::Added { request_id, .. }
            | ServerMessage::Ack { request_id } => Some(*request_id),
            ServerMessage::Error { request_id, .. } => *request_id,
            ServerMessage::Pong { .. } => None,
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
