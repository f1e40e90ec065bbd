// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Business records and the stores that hold them.
//!
//! A [`Record`] is a generic container: the business payload `F` is
//! flattened next to the id and timestamps, so on the wire a party looks
//! like `{"id": "...", "name": "...", "createdAt": "...", "updatedAt": "..."}`.
//! The default payload is an untyped JSON object ([`Fields`]); feature code
//! can convert to a typed payload with [`Record::into_typed`].

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Untyped business fields of a record.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Prefix used for ids generated while offline, unless configured otherwise.
pub const DEFAULT_LOCAL_PREFIX: &str = "local";

/// Keys owned by the record envelope; business fields may not use them.
pub const RESERVED_KEYS: [&str; 3] = ["id", "createdAt", "updatedAt"];

/// A named collection in the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreName {
    Parties,
    Sales,
    Purchases,
    Payments,
    Items,
    /// Control collection for records awaiting operator resolution.
    PendingActions,
}

impl StoreName {
    /// Every store that holds business records, in sync order.
    pub const ENTITIES: [StoreName; 5] = [
        StoreName::Parties,
        StoreName::Items,
        StoreName::Sales,
        StoreName::Purchases,
        StoreName::Payments,
    ];

    /// Every keyed store, entities first.
    pub const ALL: [StoreName; 6] = [
        StoreName::Parties,
        StoreName::Items,
        StoreName::Sales,
        StoreName::Purchases,
        StoreName::Payments,
        StoreName::PendingActions,
    ];

    /// Returns the name used in remote collection paths and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreName::Parties => "parties",
            StoreName::Sales => "sales",
            StoreName::Purchases => "purchases",
            StoreName::Payments => "payments",
            StoreName::Items => "items",
            StoreName::PendingActions => "pendingActions",
        }
    }

    /// Returns the SQLite table backing this store.
    pub fn table(&self) -> &'static str {
        match self {
            StoreName::PendingActions => "pending_actions",
            other => other.as_str(),
        }
    }

    /// Returns true for business entity stores (not control collections).
    pub fn is_entity(&self) -> bool {
        !matches!(self, StoreName::PendingActions)
    }

    /// Returns an error unless this is an entity store.
    pub fn require_entity(self) -> Result<Self> {
        if self.is_entity() {
            Ok(self)
        } else {
            Err(Error::NotAnEntityStore(self))
        }
    }
}

impl fmt::Display for StoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StoreName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(['_', '-'], "").as_str() {
            "parties" | "party" => Ok(StoreName::Parties),
            "sales" | "sale" => Ok(StoreName::Sales),
            "purchases" | "purchase" => Ok(StoreName::Purchases),
            "payments" | "payment" => Ok(StoreName::Payments),
            "items" | "item" => Ok(StoreName::Items),
            "pendingactions" => Ok(StoreName::PendingActions),
            _ => Err(Error::InvalidStoreName(s.to_string())),
        }
    }
}

/// A business record with its envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record<F = Fields> {
    pub id: String,
    #[serde(flatten)]
    pub fields: F,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<F> Record<F> {
    /// Creates a record stamped with the current time.
    pub fn new(id: impl Into<String>, fields: F) -> Self {
        let now = Utc::now();
        Record {
            id: id.into(),
            fields,
            created_at: now,
            updated_at: now,
        }
    }

    /// Bumps `updated_at` to now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Returns true if the id was generated locally with the given prefix.
    pub fn has_local_id(&self, prefix: &str) -> bool {
        is_local_id(&self.id, prefix)
    }
}

impl<F: Serialize> Record<F> {
    /// Converts the payload to untyped fields.
    pub fn to_untyped(&self) -> Result<Record> {
        let value = serde_json::to_value(&self.fields)?;
        let fields = match value {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(Error::CorruptedData(format!(
                    "record payload must be an object, got {other}"
                )))
            }
        };
        Ok(Record {
            id: self.id.clone(),
            fields,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl Record {
    /// Converts untyped fields into a typed payload.
    pub fn into_typed<F: DeserializeOwned>(self) -> Result<Record<F>> {
        let fields = serde_json::from_value(serde_json::Value::Object(self.fields))?;
        Ok(Record {
            id: self.id,
            fields,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

static LOCAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate an id for a record created without remote confirmation.
///
/// Format: `{prefix}_{unix_seconds}_{5 hex chars}`. The suffix is taken from
/// SHA-256 over the store, the nanosecond clock and a process-wide counter,
/// so ids minted in the same second stay distinct.
pub fn generate_local_id(prefix: &str, store: StoreName, now: &DateTime<Utc>) -> String {
    let seq = LOCAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = now.timestamp_nanos_opt().unwrap_or_default();
    let input = format!("{}:{}:{}", store, nanos, seq);
    let hash = Sha256::digest(input.as_bytes());
    let suffix = hex::encode(&hash[..3]);
    format!("{}_{}_{}", prefix, now.timestamp(), &suffix[..5])
}

/// Returns true if `id` was generated locally with `prefix`.
pub fn is_local_id(id: &str, prefix: &str) -> bool {
    id.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('_'))
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
