//! Gmail OAuth2 token handling
//!
//! Covers the two token endpoints the notifier needs: exchanging an
//! authorization code once when a mailbox is registered, and refreshing the
//! access token before a cycle. Uses synchronous HTTP (ureq).

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use ureq::Agent;

use crate::models::OAuthToken;

/// Error indicating Google refused the grant (revoked or expired refresh
/// token, or a bad authorization code)
#[derive(Debug, thiserror::Error)]
#[error("Google rejected the OAuth grant (HTTP {status})")]
pub struct TokenRejectedError {
    pub status: u16,
}

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
    token_type: Option<String>,
}

impl TokenResponse {
    fn into_token(self, now_ms: i64) -> OAuthToken {
        OAuthToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            scope: self.scope,
            token_type: self.token_type,
            expiry_date: self
                .expires_in
                .map(|secs| now_ms.saturating_add((secs as i64).saturating_mul(1000))),
        }
    }
}

/// OAuth2 client configuration for Gmail
pub struct GmailAuth {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    agent: Agent,
    token_url: String,
}

impl GmailAuth {
    /// Gmail API OAuth2 endpoints
    const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// Read-only access is all a notifier needs
    pub const GMAIL_READONLY_SCOPE: &'static str =
        "https://www.googleapis.com/auth/gmail.readonly";

    /// Create a new GmailAuth instance
    ///
    /// # Arguments
    /// * `client_id` - OAuth2 client ID from Google Cloud Console
    /// * `client_secret` - OAuth2 client secret from Google Cloud Console
    /// * `redirect_uri` - Callback URL registered for the client
    /// * `agent` - HTTP agent (carries the request timeout)
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
        agent: Agent,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            agent,
            token_url: Self::TOKEN_URL.to_string(),
        }
    }

    /// Send code exchanges and refreshes to a different token endpoint
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Build the consent URL for registering a mailbox
    ///
    /// Requests offline access with a forced consent prompt so Google always
    /// returns a refresh token.
    pub fn authorization_url(&self, login_hint: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&login_hint={}",
            Self::AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(Self::GMAIL_READONLY_SCOPE),
            urlencoding::encode(login_hint),
        )
    }

    /// Exchange an authorization code for a token bundle
    pub fn exchange_code(&self, code: &str) -> Result<OAuthToken> {
        let response = self.agent.post(&self.token_url).send_form([
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.redirect_uri.as_str()),
        ]);

        let mut response = match response {
            Ok(resp) => resp,
            Err(ureq::Error::StatusCode(status @ (400 | 401))) => {
                return Err(TokenRejectedError { status }.into());
            }
            Err(e) => return Err(e).context("Failed to exchange authorization code"),
        };

        let token: TokenResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse token response")?;

        Ok(token.into_token(Utc::now().timestamp_millis()))
    }

    /// Refresh an access token using the bundle's refresh token
    ///
    /// The returned bundle keeps the old refresh token when Google does not
    /// issue a new one.
    pub fn refresh(&self, token: &OAuthToken) -> Result<OAuthToken> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .context("Credential has no refresh token")?;

        let response = self.agent.post(&self.token_url).send_form([
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ]);

        let response = match response {
            Ok(resp) => resp,
            Err(ureq::Error::StatusCode(status @ (400 | 401))) => {
                return Err(TokenRejectedError { status }.into());
            }
            Err(e) => return Err(e).context("Failed to refresh access token"),
        };

        let fresh: TokenResponse = response
            .into_body()
            .read_json()
            .context("Failed to parse refresh token response")?;

        let mut refreshed = fresh.into_token(Utc::now().timestamp_millis());
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = Some(refresh_token.to_string());
        }
        if refreshed.scope.is_none() {
            refreshed.scope = token.scope.clone();
        }
        Ok(refreshed)
    }
}
