// Message identifiers
//
// An id is `<originating-port>-<creation-timestamp-ms>`. Ids received from
// peers are taken verbatim; only locally generated ids follow the format.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Identifier of a replicated message or rumor
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Wrap an existing id string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build an id from its origin port and creation time
    pub fn from_parts(port: u16, timestamp_ms: i64) -> Self {
        Self(format!("{}-{}", port, timestamp_ms))
    }

    /// Get the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Originating port, if the id follows the `<port>-<timestamp>` format
    pub fn origin_port(&self) -> Option<u16> {
        let (port, timestamp) = self.0.split_once('-')?;
        timestamp.parse::<i64>().ok()?;
        port.parse().ok()
    }

    /// Creation timestamp in milliseconds, if the id follows the format
    pub fn timestamp_ms(&self) -> Option<i64> {
        let (port, timestamp) = self.0.split_once('-')?;
        port.parse::<u16>().ok()?;
        timestamp.parse().ok()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for MessageId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Generates ids for messages originated on this node
///
/// Timestamps are strictly increasing per generator: when the clock has not
/// moved since the previous id, the previous timestamp plus one is used.
#[derive(Clone, Debug)]
pub struct IdGenerator {
    port: u16,
    last_timestamp: Option<i64>,
}

impl IdGenerator {
    /// Create a generator for the given local port
    pub fn new(port: u16) -> Self {
        Self {
            port,
            last_timestamp: None,
        }
    }

    /// Local port embedded in every generated id
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Generate an id stamped with the current wall clock
    pub fn next_id(&mut self) -> MessageId {
        self.next_at(Utc::now().timestamp_millis())
    }

    /// Generate an id for an explicit clock reading
    pub fn next_at(&mut self, now_ms: i64) -> MessageId {
        let timestamp = match self.last_timestamp {
            Some(last) if now_ms <= last => last.saturating_add(1),
            _ => now_ms,
        };
        self.last_timestamp = Some(timestamp);
        MessageId::from_parts(self.port, timestamp)
    }
}
