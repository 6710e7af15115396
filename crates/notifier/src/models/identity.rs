//! Mailbox identity

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::NotifierError;

/// The mailbox address, used as the key for all stored state
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity(String);

impl Identity {
    /// Parse and validate a mailbox address
    ///
    /// Only checks the shape (non-empty local part and domain around a
    /// single `@`); the provider is the authority on whether it exists.
    pub fn parse(address: &str) -> Result<Self, NotifierError> {
        let address = address.trim();
        match address.split_once('@') {
            Some((local, domain))
                if !local.is_empty()
                    && !domain.is_empty()
                    && !domain.contains('@')
                    && !address.contains(char::is_whitespace) =>
            {
                Ok(Self(address.to_string()))
            }
            _ => Err(NotifierError::InvalidTrigger(format!(
                "'{}' is not a mailbox address",
                address
            ))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
