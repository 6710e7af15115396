//! In-memory storage implementation
//!
//! Used by tests. State is lost when the store is dropped.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use super::{StateKind, StateStore};
use crate::models::Watermark;

/// Lease holder and expiry
struct Lease {
    holder: String,
    expires_at: DateTime<Utc>,
}

/// In-memory implementation of StateStore
///
/// Uses a HashMap protected by an RwLock for thread-safe access.
pub struct InMemoryStateStore {
    records: RwLock<HashMap<(StateKind, String), String>>,
    leases: Mutex<HashMap<String, Lease>>,
}

impl InMemoryStateStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            leases: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored records (for tests)
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current lease holder for a mailbox, ignoring expiry (for tests)
    pub fn lease_holder(&self, identity: &str) -> Option<String> {
        self.leases
            .lock()
            .unwrap()
            .get(identity)
            .map(|l| l.holder.clone())
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for InMemoryStateStore {
    fn get(&self, kind: StateKind, identity: &str) -> Result<Option<String>> {
        let records = self.records.read().unwrap();
        Ok(records.get(&(kind, identity.to_string())).cloned())
    }

    fn put(&self, kind: StateKind, identity: &str, value: &str) -> Result<()> {
        let mut records = self.records.write().unwrap();
        records.insert((kind, identity.to_string()), value.to_string());
        Ok(())
    }

    fn delete(&self, kind: StateKind, identity: &str) -> Result<()> {
        let mut records = self.records.write().unwrap();
        records.remove(&(kind, identity.to_string()));
        Ok(())
    }

    fn put_watermark_if_greater(&self, identity: &str, watermark: Watermark) -> Result<bool> {
        let mut records = self.records.write().unwrap();
        let key = (StateKind::Watermark, identity.to_string());

        if let Some(raw) = records.get(&key) {
            let current: Watermark = raw
                .parse()
                .with_context(|| format!("Stored watermark '{}' is not an integer", raw))?;
            if current >= watermark {
                return Ok(false);
            }
        }

        records.insert(key, watermark.millis().to_string());
        Ok(true)
    }

    fn try_acquire_lease(&self, identity: &str, holder: &str, ttl: Duration) -> Result<bool> {
        let now = Utc::now();
        let mut leases = self.leases.lock().unwrap();

        if let Some(existing) = leases.get(identity)
            && existing.holder != holder
            && existing.expires_at > now
        {
            return Ok(false);
        }

        let ttl = chrono::Duration::from_std(ttl)?;
        leases.insert(
            identity.to_string(),
            Lease {
                holder: holder.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    fn release_lease(&self, identity: &str, holder: &str) -> Result<()> {
        let mut leases = self.leases.lock().unwrap();
        if leases.get(identity).is_some_and(|l| l.holder == holder) {
            leases.remove(identity);
        }
        Ok(())
    }
}
