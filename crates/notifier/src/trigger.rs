//! Trigger event parsing
//!
//! A scheduler invokes a cycle with a JSON event naming the mailbox. Three
//! shapes are accepted:
//!
//! - `{"attributes": {"emailAddress": "..."}}`
//! - a Pub/Sub push envelope, `{"message": {"attributes": {...}, "data": "..."}}`
//! - either of the above with no attributes, where `data` is base64 JSON
//!   carrying `emailAddress` (the Gmail watch notification format)

use base64::prelude::*;
use serde::Deserialize;

use crate::error::NotifierError;
use crate::models::Identity;

#[derive(Debug, Deserialize)]
struct TriggerEvent {
    attributes: Option<Attributes>,
    data: Option<String>,
    message: Option<Box<TriggerEvent>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Attributes {
    email_address: Option<String>,
}

impl TriggerEvent {
    fn email_address(&self) -> Result<Option<String>, NotifierError> {
        if let Some(address) = self
            .attributes
            .as_ref()
            .and_then(|a| a.email_address.clone())
        {
            return Ok(Some(address));
        }

        if let Some(data) = &self.data {
            let decoded = decode_data(data)?;
            if let Some(address) = decoded.email_address {
                return Ok(Some(address));
            }
        }

        match &self.message {
            Some(inner) => inner.email_address(),
            None => Ok(None),
        }
    }
}

fn decode_data(data: &str) -> Result<Attributes, NotifierError> {
    let bytes = BASE64_STANDARD
        .decode(data.trim())
        .or_else(|_| BASE64_URL_SAFE.decode(data.trim()))
        .map_err(|e| NotifierError::InvalidTrigger(format!("event data is not base64: {}", e)))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| NotifierError::InvalidTrigger(format!("event data is not JSON: {}", e)))
}

/// Extract the mailbox identity from a trigger payload
pub fn identity_from_event(payload: &str) -> Result<Identity, NotifierError> {
    let event: TriggerEvent = serde_json::from_str(payload)
        .map_err(|e| NotifierError::InvalidTrigger(format!("event is not JSON: {}", e)))?;

    let address = event.email_address()?.ok_or_else(|| {
        NotifierError::InvalidTrigger("event carries no emailAddress".to_string())
    })?;

    Identity::parse(&address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_event() {
        let identity =
            identity_from_event(r#"{"attributes": {"emailAddress": "me@example.com"}}"#).unwrap();
        assert_eq!(identity.as_str(), "me@example.com");
    }

    #[test]
    fn test_pubsub_envelope() {
        let payload = r#"{
            "message": {
                "attributes": {"emailAddress": "me@example.com"},
                "messageId": "1234",
                "publishTime": "2024-01-01T00:00:00Z"
            },
            "subscription": "projects/p/subscriptions/s"
        }"#;
        assert_eq!(identity_from_event(payload).unwrap().as_str(), "me@example.com");
    }

    #[test]
    fn test_base64_data() {
        let data = BASE64_STANDARD.encode(r#"{"emailAddress":"me@example.com","historyId":9876}"#);
        let payload = format!(r#"{{"message": {{"data": "{}"}}}}"#, data);
        assert_eq!(identity_from_event(&payload).unwrap().as_str(), "me@example.com");
    }

    #[test]
    fn test_missing_identity() {
        let err = identity_from_event(r#"{"attributes": {}}"#).unwrap_err();
        assert!(matches!(err, NotifierError::InvalidTrigger(_)));
        assert!(identity_from_event("{}").is_err());
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(identity_from_event("not json").is_err());
        assert!(identity_from_event(r#"{"data": "%%%"}"#).is_err());
        assert!(identity_from_event(r#"{"attributes": {"emailAddress": "nobody"}}"#).is_err());
    }
}
