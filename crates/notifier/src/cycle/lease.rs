//! Per-mailbox cycle lease
//!
//! Serializes cycles for the same mailbox across processes. The engine
//! renews the lease before dispatching, so a cycle whose lease lapsed and was
//! taken over stops before sending anything.

use log::warn;
use std::time::Duration;

use crate::error::{NotifierError, Stage};
use crate::models::Identity;
use crate::storage::StateStore;

/// Holds the lease until dropped
pub struct LeaseGuard<'a> {
    store: &'a dyn StateStore,
    identity: &'a Identity,
    holder: &'a str,
    ttl: Duration,
}

impl<'a> LeaseGuard<'a> {
    /// Take the lease or fail with [`NotifierError::CycleInProgress`]
    pub fn acquire(
        store: &'a dyn StateStore,
        identity: &'a Identity,
        holder: &'a str,
        ttl: Duration,
    ) -> Result<Self, NotifierError> {
        let acquired = store
            .try_acquire_lease(identity.as_str(), holder, ttl)
            .map_err(|e| NotifierError::storage(Stage::Lease, e))?;

        if !acquired {
            return Err(NotifierError::CycleInProgress {
                identity: identity.to_string(),
            });
        }

        Ok(Self {
            store,
            identity,
            holder,
            ttl,
        })
    }

    /// Extend the lease for another TTL
    ///
    /// Fails with [`NotifierError::CycleInProgress`] if the lease expired and
    /// another holder took it in the meantime.
    pub fn renew(&self) -> Result<(), NotifierError> {
        let renewed = self
            .store
            .try_acquire_lease(self.identity.as_str(), self.holder, self.ttl)
            .map_err(|e| NotifierError::storage(Stage::Lease, e))?;

        if renewed {
            Ok(())
        } else {
            Err(NotifierError::CycleInProgress {
                identity: self.identity.to_string(),
            })
        }
    }
}

impl Drop for LeaseGuard<'_> {
    fn drop(&mut self) {
        // A failed release only delays the next cycle until the TTL passes
        if let Err(e) = self.store.release_lease(self.identity.as_str(), self.holder) {
            warn!("[{}] failed to release cycle lease: {:#}", self.identity, e);
        }
    }
}
