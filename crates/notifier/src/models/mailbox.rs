//! Durable per-mailbox state

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Identity, OAuthToken};

/// Receipt time (epoch milliseconds) of the newest message already notified
///
/// Messages received at or before the watermark are never notified again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Watermark(pub i64);

impl Watermark {
    pub fn millis(self) -> i64 {
        self.0
    }

    /// Whether a message received at `received_at` lies past this watermark
    pub fn admits(self, received_at: i64) -> bool {
        received_at > self.0
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Utc.timestamp_millis_opt(self.0).single() {
            Some(ts) => write!(f, "{} ({})", self.0, ts.to_rfc3339()),
            None => write!(f, "{}", self.0),
        }
    }
}

impl FromStr for Watermark {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Watermark)
    }
}

/// Everything the engine loads for one mailbox at the start of a cycle
#[derive(Debug, Clone)]
pub struct MailboxState {
    pub identity: Identity,
    pub credential: OAuthToken,
    /// None until the first cycle that dispatched something
    pub watermark: Option<Watermark>,
    pub query: String,
}
