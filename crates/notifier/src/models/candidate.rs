//! Message candidates produced fresh on every cycle

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display value for any header the message does not carry
pub const MISSING_HEADER: &str = "[no subject]";

/// Unique identifier for a message (Gmail message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A search hit before its detail has been fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    pub id: MessageId,
}

impl MessageSummary {
    pub fn new(id: impl Into<MessageId>) -> Self {
        Self { id: id.into() }
    }
}

/// A fully fetched message, prior to watermark filtering
#[derive(Debug, Clone, PartialEq)]
pub struct MessageCandidate {
    pub id: MessageId,
    /// Header name/value pairs in the order the provider returned them
    pub headers: Vec<(String, String)>,
    /// Provider receipt time, milliseconds since epoch
    pub received_at: i64,
}

impl MessageCandidate {
    pub fn new(id: impl Into<MessageId>, received_at: i64) -> Self {
        Self {
            id: id.into(),
            headers: Vec::new(),
            received_at,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header by case-insensitive name, falling back to [`MISSING_HEADER`]
    pub fn header(&self, name: &str) -> &str {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .unwrap_or(MISSING_HEADER)
    }

    pub fn subject(&self) -> &str {
        self.header("Subject")
    }

    /// Receipt time as a UTC timestamp, for logging
    pub fn received_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.received_at).single()
    }
}
