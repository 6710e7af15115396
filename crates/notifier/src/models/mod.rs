//! Domain models for the notifier

mod candidate;
mod identity;
mod mailbox;
mod token;

pub use candidate::{MISSING_HEADER, MessageCandidate, MessageId, MessageSummary};
pub use identity::Identity;
pub use mailbox::{MailboxState, Watermark};
pub use token::OAuthToken;
