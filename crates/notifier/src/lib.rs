//! Notifier crate - scheduled Gmail-to-Pushover relay
//!
//! This crate provides:
//! - The poll cycle engine (watermark-based incremental fetch)
//! - Per-mailbox state storage (credential, watermark, query, lease)
//! - A Gmail API adapter and OAuth token handling
//! - Notification formatting and a Pushover sink
//! - Trigger event parsing and environment configuration
//!
//! The engine only sees the [`StateStore`], [`MailProvider`] and
//! [`NotificationSink`] traits, so tests run it against in-memory fakes.

pub mod config;
pub mod cycle;
pub mod error;
pub mod gmail;
pub mod http;
pub mod models;
pub mod notify;
pub mod storage;
pub mod trigger;

pub use crate::config::{GoogleCredentials, NotifierConfig, PushoverCredentials};
pub use cycle::{CycleOptions, CycleReport, FailedDispatch, PollCycle};
pub use error::{NotifierError, Stage};
pub use gmail::{GmailAuth, GmailClient, MailProvider};
pub use models::{
    Identity, MISSING_HEADER, MailboxState, MessageCandidate, MessageId, MessageSummary,
    OAuthToken, Watermark,
};
pub use notify::{DeliveryReceipt, Notification, NotificationSink, PushoverClient, format_notification};
pub use storage::{InMemoryStateStore, SqliteStateStore, StateKind, StateStore};
pub use trigger::identity_from_event;
