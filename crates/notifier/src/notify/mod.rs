//! Push notification formatting and delivery

mod format;
mod pushover;

pub use format::{
    ANDROID_URL_TITLE, MESSAGE_LIMIT, TITLE_LIMIT, android_url, format_notification, web_url,
};
pub use pushover::PushoverClient;

use anyhow::Result;

/// A formatted push notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    /// Multi-line body text
    pub message: String,
    /// Supplementary link opened from the notification
    pub url: String,
    pub url_title: String,
}

/// What the sink reported back for one delivery
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Sink-assigned request identifier, if any
    pub request: Option<String>,
}

/// Destination for notifications
///
/// Each call delivers exactly one notification; there is no batching.
pub trait NotificationSink: Send + Sync {
    fn send(&self, notification: &Notification) -> Result<DeliveryReceipt>;
}
