//! Error taxonomy for the poll cycle
//!
//! Adapters use `anyhow` internally and convert into [`NotifierError`] at the
//! trait seams, so the engine and the CLI can decide per variant whether a
//! failure aborts the cycle or is contained.

use std::fmt;

/// Point in a cycle at which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lease,
    LoadState,
    RefreshCredential,
    Search,
    FetchDetail,
    Dispatch,
    SaveWatermark,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Lease => "lease",
            Stage::LoadState => "load-state",
            Stage::RefreshCredential => "refresh-credential",
            Stage::Search => "search",
            Stage::FetchDetail => "fetch-detail",
            Stage::Dispatch => "dispatch",
            Stage::SaveWatermark => "save-watermark",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by the notifier
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    /// No credential bundle stored for the mailbox
    #[error("No credential stored for {identity}")]
    CredentialMissing { identity: String },

    /// Stored credential is unreadable or was rejected by the provider
    #[error("Credential for {identity} is invalid: {reason}")]
    CredentialInvalid { identity: String, reason: String },

    /// Search or detail fetch failed (network, timeout, 5xx, bad payload)
    #[error("Mail provider unavailable during {stage}: {reason}")]
    ProviderUnavailable { stage: Stage, reason: String },

    /// A single notification could not be delivered
    #[error("Failed to dispatch notification for message {message_id}: {reason}")]
    DispatchFailure { message_id: String, reason: String },

    /// Required configuration is absent
    #[error("Missing configuration: {0}")]
    ConfigurationMissing(String),

    /// Trigger payload did not carry a usable mailbox identity
    #[error("Invalid trigger event: {0}")]
    InvalidTrigger(String),

    /// Another invocation holds the lease for this mailbox
    #[error("A cycle for {identity} is already in progress")]
    CycleInProgress { identity: String },

    /// State store read or write failed
    #[error("State store failure during {stage}: {reason}")]
    Storage { stage: Stage, reason: String },
}

impl NotifierError {
    /// Wrap a provider-side failure, keeping the full context chain
    pub fn provider(stage: Stage, err: impl Into<anyhow::Error>) -> Self {
        Self::ProviderUnavailable {
            stage,
            reason: format!("{:#}", err.into()),
        }
    }

    /// Wrap a state store failure, keeping the full context chain
    pub fn storage(stage: Stage, err: impl Into<anyhow::Error>) -> Self {
        Self::Storage {
            stage,
            reason: format!("{:#}", err.into()),
        }
    }

    /// Whether running the same cycle again later can succeed
    ///
    /// False for errors that need an operator: a missing or rejected
    /// credential, missing configuration, or a bad trigger.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable { .. }
                | Self::DispatchFailure { .. }
                | Self::CycleInProgress { .. }
                | Self::Storage { .. }
        )
    }
}
