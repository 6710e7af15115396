//! Gmail API response normalization
//!
//! Converts Gmail API responses to message candidates.

use anyhow::{Context, Result};

use super::api::GmailMessage;
use crate::models::MessageCandidate;

/// Normalize a Gmail API message to a MessageCandidate
///
/// The receipt time is mandatory: a message without a parseable
/// `internalDate` cannot be placed against the watermark, so it is an error
/// rather than a default. Missing headers are not an error.
pub fn to_candidate(gmail_msg: GmailMessage) -> Result<MessageCandidate> {
    let received_at: i64 = gmail_msg
        .internal_date
        .as_deref()
        .with_context(|| format!("Message {} has no internalDate", gmail_msg.id))?
        .trim()
        .parse()
        .with_context(|| format!("Message {} has a malformed internalDate", gmail_msg.id))?;

    let headers = gmail_msg
        .payload
        .and_then(|p| p.headers)
        .unwrap_or_default()
        .into_iter()
        .map(|h| (h.name, h.value))
        .collect();

    Ok(MessageCandidate {
        id: gmail_msg.id.into(),
        headers,
        received_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MISSING_HEADER;

    fn parse(json: &str) -> GmailMessage {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_metadata_message() {
        let msg = parse(
            r#"{
                "id": "18c1f2a3b4",
                "threadId": "18c1f2a3b4",
                "labelIds": ["INBOX", "UNREAD"],
                "snippet": "ignored",
                "internalDate": "1700000000123",
                "payload": {
                    "mimeType": "multipart/alternative",
                    "headers": [
                        {"name": "From", "value": "Alice <alice@example.com>"},
                        {"name": "To", "value": "me@example.com"},
                        {"name": "Subject", "value": "Quarterly report"}
                    ]
                }
            }"#,
        );

        let candidate = to_candidate(msg).unwrap();
        assert_eq!(candidate.id.as_str(), "18c1f2a3b4");
        assert_eq!(candidate.received_at, 1_700_000_000_123);
        assert_eq!(candidate.subject(), "Quarterly report");
        assert_eq!(candidate.header("from"), "Alice <alice@example.com>");
    }

    #[test]
    fn test_missing_payload_keeps_candidate() {
        let msg = parse(r#"{"id": "m1", "internalDate": "42"}"#);
        let candidate = to_candidate(msg).unwrap();
        assert_eq!(candidate.received_at, 42);
        assert_eq!(candidate.subject(), MISSING_HEADER);
    }

    #[test]
    fn test_missing_internal_date_is_an_error() {
        let msg = parse(r#"{"id": "m1", "payload": {"headers": []}}"#);
        let err = to_candidate(msg).unwrap_err();
        assert!(err.to_string().contains("no internalDate"));
    }

    #[test]
    fn test_malformed_internal_date_is_an_error() {
        let msg = parse(r#"{"id": "m1", "internalDate": "soon"}"#);
        assert!(to_candidate(msg).is_err());
    }
}
