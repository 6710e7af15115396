//! Gmail API integration
//!
//! This module provides:
//! - The [`MailProvider`] seam the poll cycle searches through
//! - OAuth2 token refresh and authorization-code exchange
//! - A Gmail REST client implementing [`MailProvider`]
//! - Response normalization to message candidates

mod auth;
mod client;
mod normalize;

pub use auth::{GmailAuth, TokenRejectedError};
pub use client::GmailClient;
pub use normalize::to_candidate;

use crate::error::NotifierError;
use crate::models::{Identity, MessageCandidate, MessageId, MessageSummary, OAuthToken};

/// Mail search provider used by the poll cycle
///
/// Implementations map authentication failures to
/// [`NotifierError::CredentialInvalid`] and everything else to
/// [`NotifierError::ProviderUnavailable`].
pub trait MailProvider: Send + Sync {
    /// List every message matching `query` in the mailbox, in provider order
    fn list_messages(
        &self,
        identity: &Identity,
        credential: &OAuthToken,
        query: &str,
    ) -> Result<Vec<MessageSummary>, NotifierError>;

    /// Fetch headers and receipt time for one message
    fn get_message(
        &self,
        identity: &Identity,
        credential: &OAuthToken,
        id: &MessageId,
    ) -> Result<MessageCandidate, NotifierError>;

    /// Refresh the credential if it is about to expire
    ///
    /// Returns the new bundle when a refresh happened, so the caller can
    /// persist it. The default never refreshes.
    fn refresh_credential(
        &self,
        _identity: &Identity,
        _credential: &OAuthToken,
    ) -> Result<Option<OAuthToken>, NotifierError> {
        Ok(None)
    }
}

/// Gmail API response types
pub mod api {
    use serde::Deserialize;

    /// Response from listing messages
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListMessagesResponse {
        pub messages: Option<Vec<MessageRef>>,
        pub next_page_token: Option<String>,
        pub result_size_estimate: Option<u32>,
    }

    /// Reference to a message in a search result
    #[derive(Debug, Deserialize)]
    pub struct MessageRef {
        pub id: String,
    }

    /// Message fetched with `format=metadata`
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        pub id: String,
        /// Receipt time in epoch milliseconds, as a decimal string
        pub internal_date: Option<String>,
        pub payload: Option<MessagePayload>,
    }

    /// Message payload containing headers
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePayload {
        pub headers: Option<Vec<Header>>,
    }

    /// Email header (name-value pair)
    #[derive(Debug, Deserialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }
}
