//! Pushover messages API client

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use ureq::Agent;

use super::{DeliveryReceipt, Notification, NotificationSink};

/// Response body of the messages endpoint
#[derive(Debug, Deserialize)]
struct PushoverResponse {
    status: i64,
    request: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

/// Delivers notifications through Pushover
pub struct PushoverClient {
    api_key: String,
    user_key: String,
    agent: Agent,
    endpoint: String,
}

impl PushoverClient {
    const MESSAGES_URL: &'static str = "https://api.pushover.net/1/messages.json";

    /// Create a client for one application token / user key pair
    ///
    /// `agent` should keep error bodies (see
    /// [`crate::http::agent_keeping_error_bodies`]) so Pushover's error list
    /// ends up in the log.
    pub fn new(api_key: impl Into<String>, user_key: impl Into<String>, agent: Agent) -> Self {
        Self {
            api_key: api_key.into(),
            user_key: user_key.into(),
            agent,
            endpoint: Self::MESSAGES_URL.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn form<'a>(&'a self, n: &'a Notification) -> [(&'static str, &'a str); 6] {
        [
            ("token", self.api_key.as_str()),
            ("user", self.user_key.as_str()),
            ("title", n.title.as_str()),
            ("message", n.message.as_str()),
            ("url", n.url.as_str()),
            ("url_title", n.url_title.as_str()),
        ]
    }
}

impl NotificationSink for PushoverClient {
    fn send(&self, notification: &Notification) -> Result<DeliveryReceipt> {
        let mut response = self
            .agent
            .post(&self.endpoint)
            .send_form(self.form(notification))
            .context("Failed to send Pushover request")?;

        let status = response.status();
        let body: Option<PushoverResponse> = response.body_mut().read_json().ok();

        match body {
            Some(body) if status.is_success() && body.status == 1 => Ok(DeliveryReceipt {
                request: body.request,
            }),
            Some(body) => bail!(
                "Pushover rejected the message (HTTP {}, status {}): {}",
                status.as_u16(),
                body.status,
                body.errors.join("; ")
            ),
            None => bail!(
                "Pushover answered HTTP {} with an unreadable body",
                status.as_u16()
            ),
        }
    }
}
