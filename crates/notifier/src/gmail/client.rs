//! Gmail API HTTP client
//!
//! Implements [`MailProvider`] over the Gmail REST API.
//! Uses synchronous HTTP (ureq) so it can run on the cycle's worker pool.

use anyhow::Context;
use log::{debug, info};
use ureq::Agent;

use super::api::{GmailMessage, ListMessagesResponse};
use super::{GmailAuth, MailProvider, TokenRejectedError, to_candidate};
use crate::error::{NotifierError, Stage};
use crate::models::{Identity, MessageCandidate, MessageId, MessageSummary, OAuthToken};

/// Headers requested with each message; everything the notification shows
const METADATA_HEADERS: [&str; 3] = ["Subject", "From", "To"];

/// Gmail API client for searching a mailbox
pub struct GmailClient {
    auth: GmailAuth,
    agent: Agent,
    base_url: String,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Maximum page size accepted by messages.list
    const PAGE_SIZE: usize = 500;

    /// Create a new Gmail client
    pub fn new(auth: GmailAuth, agent: Agent) -> Self {
        Self {
            auth,
            agent,
            base_url: Self::BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API root (e.g. a local stub server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self, identity: &Identity) -> String {
        format!(
            "{}/users/{}/messages",
            self.base_url,
            urlencoding::encode(identity.as_str())
        )
    }

    /// Fetch one page of search results
    fn list_page(
        &self,
        identity: &Identity,
        credential: &OAuthToken,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<ListMessagesResponse, NotifierError> {
        let mut request = self
            .agent
            .get(&self.messages_url(identity))
            .header("Authorization", &format!("Bearer {}", credential.access_token))
            .query("q", query)
            .query("maxResults", Self::PAGE_SIZE.to_string());

        if let Some(token) = page_token {
            request = request.query("pageToken", token);
        }

        let mut response = request
            .call()
            .map_err(|e| classify(identity, Stage::Search, e))?;

        response
            .body_mut()
            .read_json::<ListMessagesResponse>()
            .context("Failed to parse list messages response")
            .map_err(|e| NotifierError::provider(Stage::Search, e))
    }
}

impl MailProvider for GmailClient {
    /// Follows `nextPageToken` until the result set is exhausted
    fn list_messages(
        &self,
        identity: &Identity,
        credential: &OAuthToken,
        query: &str,
    ) -> Result<Vec<MessageSummary>, NotifierError> {
        let mut summaries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.list_page(identity, credential, query, page_token.as_deref())?;
            debug!(
                "[{}] search page: {} messages, estimate {:?}",
                identity,
                page.messages.as_ref().map_or(0, Vec::len),
                page.result_size_estimate
            );

            summaries.extend(
                page.messages
                    .unwrap_or_default()
                    .into_iter()
                    .map(|m| MessageSummary::new(m.id)),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(summaries)
    }

    fn get_message(
        &self,
        identity: &Identity,
        credential: &OAuthToken,
        id: &MessageId,
    ) -> Result<MessageCandidate, NotifierError> {
        let url = format!(
            "{}/{}",
            self.messages_url(identity),
            urlencoding::encode(id.as_str())
        );

        let mut request = self
            .agent
            .get(&url)
            .header("Authorization", &format!("Bearer {}", credential.access_token))
            .query("format", "metadata");
        for header in METADATA_HEADERS {
            request = request.query("metadataHeaders", header);
        }

        let mut response = request
            .call()
            .map_err(|e| classify(identity, Stage::FetchDetail, e))?;

        let message: GmailMessage = response
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse message {}", id))
            .map_err(|e| NotifierError::provider(Stage::FetchDetail, e))?;

        to_candidate(message).map_err(|e| NotifierError::provider(Stage::FetchDetail, e))
    }

    fn refresh_credential(
        &self,
        identity: &Identity,
        credential: &OAuthToken,
    ) -> Result<Option<OAuthToken>, NotifierError> {
        if !credential.needs_refresh() {
            return Ok(None);
        }
        if !credential.can_refresh() {
            return Err(NotifierError::CredentialInvalid {
                identity: identity.to_string(),
                reason: "access token expired and no refresh token is stored".to_string(),
            });
        }

        match credential.expiry_date {
            Some(_) => info!("[{}] access token expires soon, refreshing", identity),
            None => info!("[{}] access token expiry unknown, refreshing", identity),
        }
        match self.auth.refresh(credential) {
            Ok(token) => Ok(Some(token)),
            Err(e) if e.is::<TokenRejectedError>() => Err(NotifierError::CredentialInvalid {
                identity: identity.to_string(),
                reason: format!("{:#}", e),
            }),
            Err(e) => Err(NotifierError::provider(Stage::RefreshCredential, e)),
        }
    }
}

/// Map a transport or status error onto the cycle's error taxonomy
fn classify(identity: &Identity, stage: Stage, err: ureq::Error) -> NotifierError {
    match err {
        ureq::Error::StatusCode(status @ (401 | 403)) => NotifierError::CredentialInvalid {
            identity: identity.to_string(),
            reason: format!("Gmail answered HTTP {} during {}", status, stage),
        },
        ureq::Error::StatusCode(status) => NotifierError::ProviderUnavailable {
            stage,
            reason: format!("Gmail answered HTTP {}", status),
        },
        other => NotifierError::provider(stage, other),
    }
}
