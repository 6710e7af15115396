//! Configuration loading for the notifier
//!
//! Everything comes from the process environment, with one fallback: the
//! Google OAuth client may instead be read from a Google Cloud Console JSON
//! file in the config directory. Anything required and absent is a
//! [`NotifierError::ConfigurationMissing`] raised before any cycle runs.

use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::NotifierError;
use crate::http;

/// Credentials filename in the notifier config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";

/// State database filename in the notifier data directory
const DATABASE_FILE: &str = "state.db";

/// OAuth client credentials for Gmail API access
#[derive(Debug, Clone)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
}

#[derive(Deserialize)]
struct ClientSection {
    client_id: String,
    client_secret: String,
}

impl GoogleCredentials {
    /// Load credentials from `GOOGLE_CLIENT_ID`/`GOOGLE_CLIENT_SECRET`,
    /// falling back to ~/.config/gmail-notifier/google-credentials.json
    pub fn load_with(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, NotifierError> {
        if let (Some(client_id), Some(client_secret)) =
            (lookup("GOOGLE_CLIENT_ID"), lookup("GOOGLE_CLIENT_SECRET"))
        {
            return Ok(Self {
                client_id,
                client_secret,
            });
        }

        if config::config_exists(CREDENTIALS_FILE) {
            let creds: GoogleCredentialFile = config::load_json(CREDENTIALS_FILE)
                .map_err(|e| NotifierError::ConfigurationMissing(format!("{:#}", e)))?;
            return Self::from_credential_file(creds);
        }

        let missing = if lookup("GOOGLE_CLIENT_ID").is_none() {
            "GOOGLE_CLIENT_ID"
        } else {
            "GOOGLE_CLIENT_SECRET"
        };
        Err(NotifierError::ConfigurationMissing(format!(
            "{} is not set and no {} was found",
            missing, CREDENTIALS_FILE
        )))
    }

    /// Parse credentials from JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self, NotifierError> {
        let creds: GoogleCredentialFile = serde_json::from_str(json)
            .context("Failed to parse credentials JSON")
            .map_err(|e| NotifierError::ConfigurationMissing(format!("{:#}", e)))?;
        Self::from_credential_file(creds)
    }

    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self, NotifierError> {
        // Support both "installed" (desktop) and "web" credential types
        let section = creds.installed.or(creds.web).ok_or_else(|| {
            NotifierError::ConfigurationMissing(
                "credentials file missing 'installed' or 'web' section".to_string(),
            )
        })?;

        Ok(Self {
            client_id: section.client_id,
            client_secret: section.client_secret,
        })
    }
}

/// Pushover application token and user key
#[derive(Debug, Clone)]
pub struct PushoverCredentials {
    pub api_key: String,
    pub user_key: String,
}

/// Complete process configuration
#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub google: GoogleCredentials,
    pub pushover: PushoverCredentials,
    /// OAuth redirect URI registered for the Google client
    pub callback_url: String,
    pub db_path: PathBuf,
    pub http_timeout: Duration,
    pub fetch_concurrency: usize,
}

impl NotifierConfig {
    pub const DEFAULT_CONCURRENCY: usize = 4;

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, NotifierError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, NotifierError> {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let pushover = PushoverCredentials {
            api_key: required(&lookup, "PUSHOVER_API_KEY")?,
            user_key: required(&lookup, "PUSHOVER_USER_KEY")?,
        };
        let google = GoogleCredentials::load_with(&lookup)?;
        let callback_url = callback_url(&lookup)?;

        let db_path = match lookup("NOTIFIER_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => config::data_path(DATABASE_FILE).ok_or_else(|| {
                NotifierError::ConfigurationMissing(
                    "NOTIFIER_DB_PATH is not set and no data directory is available".to_string(),
                )
            })?,
        };

        let http_timeout = match lookup("NOTIFIER_HTTP_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(positive(&raw, "NOTIFIER_HTTP_TIMEOUT_SECS")? as u64),
            None => http::DEFAULT_TIMEOUT,
        };

        let fetch_concurrency = match lookup("NOTIFIER_FETCH_CONCURRENCY") {
            Some(raw) => positive(&raw, "NOTIFIER_FETCH_CONCURRENCY")?,
            None => Self::DEFAULT_CONCURRENCY,
        };

        Ok(Self {
            google,
            pushover,
            callback_url,
            db_path,
            http_timeout,
            fetch_concurrency,
        })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String, NotifierError> {
    lookup(key).ok_or_else(|| NotifierError::ConfigurationMissing(format!("{} is not set", key)))
}

fn positive(raw: &str, key: &str) -> Result<usize, NotifierError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(NotifierError::ConfigurationMissing(format!(
            "{} must be a positive integer, got '{}'",
            key, raw
        ))),
    }
}

/// Resolve the OAuth callback URL
///
/// `OAUTH_CALLBACK_URL` wins; otherwise it is derived from the Cloud
/// Functions region and project as
/// `https://<region>-<project>.cloudfunctions.net/oauth2callback`.
fn callback_url(lookup: &impl Fn(&str) -> Option<String>) -> Result<String, NotifierError> {
    let raw = match lookup("OAUTH_CALLBACK_URL") {
        Some(url) => url,
        None => format!(
            "https://{}-{}.cloudfunctions.net/oauth2callback",
            required(lookup, "GCF_REGION")?,
            required(lookup, "GCP_PROJECT_ID")?
        ),
    };

    let parsed = url::Url::parse(&raw).map_err(|e| {
        NotifierError::ConfigurationMissing(format!("callback URL '{}' is invalid: {}", raw, e))
    })?;
    Ok(parsed.to_string())
}
