//! Poll cycle engine
//!
//! One cycle: load state, search, fetch details, filter by watermark,
//! dispatch, advance the watermark. Everything before filtering is
//! fail-closed; dispatch failures are contained per message.

use log::{debug, error, info, warn};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::lease::LeaseGuard;
use super::report::{CycleReport, FailedDispatch};
use super::watermark::{self, DispatchOutcome};
use crate::error::{NotifierError, Stage};
use crate::gmail::MailProvider;
use crate::models::{Identity, MailboxState, MessageCandidate, MessageSummary, OAuthToken};
use crate::notify::{DeliveryReceipt, NotificationSink, format_notification};
use crate::storage::{StateKind, StateStore};

/// Tunables for the engine
#[derive(Debug, Clone)]
pub struct CycleOptions {
    /// Worker pool width for detail fetches and dispatches
    pub concurrency: usize,
    /// How long a lease stays valid if the holder never releases it
    pub lease_ttl: Duration,
    /// Name recorded as the lease holder
    pub holder: String,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            lease_ttl: Duration::from_secs(300),
            holder: format!(
                "pid-{}-{}",
                std::process::id(),
                chrono::Utc::now().timestamp_millis()
            ),
        }
    }
}

/// Runs poll-and-notify cycles against injected collaborators
pub struct PollCycle {
    store: Arc<dyn StateStore>,
    provider: Arc<dyn MailProvider>,
    sink: Arc<dyn NotificationSink>,
    options: CycleOptions,
    pool: rayon::ThreadPool,
}

impl PollCycle {
    /// Create a new engine with its own bounded worker pool
    pub fn new(
        store: Arc<dyn StateStore>,
        provider: Arc<dyn MailProvider>,
        sink: Arc<dyn NotificationSink>,
        options: CycleOptions,
    ) -> anyhow::Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.concurrency.max(1))
            .thread_name(|i| format!("notifier-worker-{}", i))
            .build()?;

        Ok(Self {
            store,
            provider,
            sink,
            options,
            pool,
        })
    }

    /// Execute exactly one poll-and-notify cycle for a mailbox
    ///
    /// Returns an error without sending anything if state loading, search,
    /// or any detail fetch fails. Dispatch failures are reported in the
    /// returned [`CycleReport`] instead.
    pub fn run_cycle(&self, identity: &Identity) -> Result<CycleReport, NotifierError> {
        let start = Instant::now();
        info!("[{}] cycle starting", identity);

        let result = LeaseGuard::acquire(
            self.store.as_ref(),
            identity,
            &self.options.holder,
            self.options.lease_ttl,
        )
        .and_then(|lease| self.run_locked(identity, &lease, start));

        match &result {
            Ok(report) => info!("{}", report),
            Err(e @ NotifierError::CycleInProgress { .. }) => warn!("[{}] {}", identity, e),
            Err(e) => error!("[{}] cycle aborted: {}", identity, e),
        }
        result
    }

    fn run_locked(
        &self,
        identity: &Identity,
        lease: &LeaseGuard<'_>,
        start: Instant,
    ) -> Result<CycleReport, NotifierError> {
        let mut state = self.load_state(identity)?;
        info!(
            "[{}] watermark is {}, query is \"{}\"",
            identity,
            state
                .watermark
                .map_or_else(|| "unset".to_string(), |w| w.to_string()),
            state.query
        );

        let credential_refreshed = self.refresh_credential(&mut state)?;

        let summaries = self
            .provider
            .list_messages(identity, &state.credential, &state.query)?;
        debug!("[{}] query matched {} messages", identity, summaries.len());

        let candidates = self.fetch_details(identity, &state.credential, &summaries)?;
        let candidate_count = candidates.len();
        let new = watermark::select_new(candidates, state.watermark);
        debug!(
            "[{}] {} of {} candidates are past the watermark",
            identity,
            new.len(),
            candidate_count
        );

        // Search and fetch may have outlived the lease
        lease.renew()?;

        let (outcomes, failures) = self.dispatch_all(identity, &new);
        let mut next = watermark::advance(state.watermark, &outcomes);

        if next != state.watermark
            && let Some(w) = next
        {
            let save_err = |e: anyhow::Error| NotifierError::storage(Stage::SaveWatermark, e);
            if self
                .store
                .put_watermark_if_greater(identity.as_str(), w)
                .map_err(save_err)?
            {
                debug!("[{}] watermark advanced to {}", identity, w);
            } else {
                next = self.store.get_watermark(identity.as_str()).map_err(save_err)?;
                warn!(
                    "[{}] stored watermark is already past {}, keeping it",
                    identity, w
                );
            }
        }

        Ok(CycleReport {
            identity: identity.clone(),
            previous_watermark: state.watermark,
            watermark: next,
            candidates: candidate_count,
            new_messages: new.len(),
            sent: outcomes.iter().filter(|o| o.delivered).count(),
            failures,
            credential_refreshed,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Load credential, watermark, and query for a mailbox
    fn load_state(&self, identity: &Identity) -> Result<MailboxState, NotifierError> {
        let key = identity.as_str();
        let storage_err = |e: anyhow::Error| NotifierError::storage(Stage::LoadState, e);

        let raw_credential = self
            .store
            .get(StateKind::Credential, key)
            .map_err(storage_err)?
            .ok_or_else(|| NotifierError::CredentialMissing {
                identity: identity.to_string(),
            })?;
        let credential: OAuthToken = serde_json::from_str(&raw_credential).map_err(|e| {
            NotifierError::CredentialInvalid {
                identity: identity.to_string(),
                reason: format!("stored credential is unreadable: {}", e),
            }
        })?;

        let watermark = self.store.get_watermark(key).map_err(storage_err)?;

        let query = self
            .store
            .get_query(key)
            .map_err(storage_err)?
            .ok_or_else(|| {
                NotifierError::ConfigurationMissing(format!("no search query stored for {}", identity))
            })?;

        Ok(MailboxState {
            identity: identity.clone(),
            credential,
            watermark,
            query,
        })
    }

    /// Refresh the access token if needed and write the new bundle back
    fn refresh_credential(&self, state: &mut MailboxState) -> Result<bool, NotifierError> {
        let Some(fresh) = self
            .provider
            .refresh_credential(&state.identity, &state.credential)?
        else {
            return Ok(false);
        };

        // An unsaved token is refreshed again next cycle
        if let Err(e) = self.store.put_credential(state.identity.as_str(), &fresh) {
            warn!(
                "[{}] failed to save refreshed credential: {:#}",
                state.identity, e
            );
        }
        state.credential = fresh;
        Ok(true)
    }

    /// Fetch every candidate's detail on the worker pool
    ///
    /// All-or-nothing: one failed fetch fails the whole step.
    fn fetch_details(
        &self,
        identity: &Identity,
        credential: &OAuthToken,
        summaries: &[MessageSummary],
    ) -> Result<Vec<MessageCandidate>, NotifierError> {
        self.pool.install(|| {
            summaries
                .par_iter()
                .map(|s| self.provider.get_message(identity, credential, &s.id))
                .collect()
        })
    }

    /// Dispatch one notification per new message and wait for all of them
    fn dispatch_all(
        &self,
        identity: &Identity,
        new: &[MessageCandidate],
    ) -> (Vec<DispatchOutcome>, Vec<FailedDispatch>) {
        let results: Vec<anyhow::Result<DeliveryReceipt>> = self.pool.install(|| {
            new.par_iter()
                .map(|c| self.sink.send(&format_notification(c, identity)))
                .collect()
        });

        let mut outcomes = Vec::with_capacity(new.len());
        let mut failures = Vec::new();

        for (candidate, result) in new.iter().zip(results) {
            match result {
                Ok(receipt) => {
                    debug!(
                        "[{}] notified message {} (received {:?}, request {:?})",
                        identity,
                        candidate.id,
                        candidate.received_at_utc(),
                        receipt.request
                    );
                    outcomes.push(DispatchOutcome::delivered(candidate.received_at));
                }
                Err(e) => {
                    let err = NotifierError::DispatchFailure {
                        message_id: candidate.id.to_string(),
                        reason: format!("{:#}", e),
                    };
                    error!("[{}] stage={} {}", identity, Stage::Dispatch, err);
                    outcomes.push(DispatchOutcome::failed(candidate.received_at));
                    failures.push(FailedDispatch {
                        message_id: candidate.id.clone(),
                        received_at: candidate.received_at,
                        reason: format!("{:#}", e),
                    });
                }
            }
        }

        (outcomes, failures)
    }
}
