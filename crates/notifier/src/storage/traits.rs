//! Storage trait definitions

use anyhow::{Context, Result};
use std::time::Duration;

use crate::models::{OAuthToken, Watermark};

/// Kind of record kept per mailbox
///
/// The string forms are the record kind names used as the first half of the
/// store key, so existing stored state keeps resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Credential,
    Watermark,
    Query,
}

impl StateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StateKind::Credential => "oauth2Token",
            StateKind::Watermark => "lastRunTime",
            StateKind::Query => "query",
        }
    }
}

/// Trait for per-mailbox state storage
///
/// Records are opaque strings keyed by `(kind, identity)`. The typed
/// accessors below handle the encoding of each kind.
pub trait StateStore: Send + Sync {
    /// Get a record, or None if absent
    fn get(&self, kind: StateKind, identity: &str) -> Result<Option<String>>;

    /// Insert or replace a record
    fn put(&self, kind: StateKind, identity: &str, value: &str) -> Result<()>;

    /// Delete a record (no-op if absent)
    fn delete(&self, kind: StateKind, identity: &str) -> Result<()>;

    /// Try to take the cycle lease for a mailbox
    ///
    /// Succeeds if no lease exists, the existing one has expired, or it is
    /// already held by `holder`. Returns false if another holder has it.
    fn try_acquire_lease(&self, identity: &str, holder: &str, ttl: Duration) -> Result<bool>;

    /// Release the lease if `holder` still owns it
    fn release_lease(&self, identity: &str, holder: &str) -> Result<()>;

    /// Store `watermark` only if it is greater than the stored one
    ///
    /// The compare and the write happen atomically. Returns false and leaves
    /// the record untouched when the stored watermark is already at or past
    /// `watermark`.
    fn put_watermark_if_greater(&self, identity: &str, watermark: Watermark) -> Result<bool>;

    // === Typed accessors ===

    fn get_credential(&self, identity: &str) -> Result<Option<OAuthToken>> {
        self.get(StateKind::Credential, identity)?
            .map(|raw| serde_json::from_str(&raw).context("Stored credential is not valid JSON"))
            .transpose()
    }

    fn put_credential(&self, identity: &str, token: &OAuthToken) -> Result<()> {
        let raw = serde_json::to_string(token)?;
        self.put(StateKind::Credential, identity, &raw)
    }

    fn get_watermark(&self, identity: &str) -> Result<Option<Watermark>> {
        self.get(StateKind::Watermark, identity)?
            .map(|raw| {
                raw.parse::<Watermark>()
                    .with_context(|| format!("Stored watermark '{}' is not an integer", raw))
            })
            .transpose()
    }

    /// Unconditional overwrite; cycles go through `put_watermark_if_greater`
    fn put_watermark(&self, identity: &str, watermark: Watermark) -> Result<()> {
        self.put(StateKind::Watermark, identity, &watermark.millis().to_string())
    }

    fn get_query(&self, identity: &str) -> Result<Option<String>> {
        self.get(StateKind::Query, identity)
    }

    fn put_query(&self, identity: &str, query: &str) -> Result<()> {
        self.put(StateKind::Query, identity, query)
    }
}
