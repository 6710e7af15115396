//! OAuth credential bundle stored per mailbox

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Stored OAuth2 token data
///
/// Field names follow the Google token format so that bundles saved by
/// other tools can be read back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Access token expiry, milliseconds since epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
}

impl OAuthToken {
    /// Refresh tokens this many seconds ahead of expiry
    pub const EXPIRY_BUFFER_SECS: i64 = 300;

    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            scope: None,
            token_type: None,
            expiry_date: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_expiry_date(mut self, expiry_date: i64) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }

    /// Whether the access token expires within the refresh buffer at `now_ms`
    ///
    /// False when the expiry is unknown.
    pub fn expires_soon_at(&self, now_ms: i64) -> bool {
        self.expiry_date
            .is_some_and(|exp| exp <= now_ms + Self::EXPIRY_BUFFER_SECS * 1000)
    }

    pub fn expires_soon(&self) -> bool {
        self.expires_soon_at(Utc::now().timestamp_millis())
    }

    /// Whether the access token should be refreshed before use at `now_ms`
    ///
    /// A token with an unknown expiry is refreshed whenever it can be, since
    /// there is no way to tell whether it is still alive.
    pub fn needs_refresh_at(&self, now_ms: i64) -> bool {
        match self.expiry_date {
            Some(_) => self.expires_soon_at(now_ms),
            None => self.can_refresh(),
        }
    }

    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh_at(Utc::now().timestamp_millis())
    }

    /// Whether this token can be refreshed without user interaction
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}
