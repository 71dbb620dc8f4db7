//! Behavioral events recorded against a contact.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest accepted event name, in UTF-16 code units.
pub const MAX_EVENT_NAME_LENGTH: usize = 30;

/// Property keys are restricted to ASCII letters and underscores.
pub const PROPERTIES_KEY_PATTERN: &str = "^[a-zA-Z_]*$";

static PROPERTIES_KEY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PROPERTIES_KEY_PATTERN).expect("property key pattern compiles"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventValidationError {
    #[error("event name {name:?} is longer than {max} UTF-16 code units")]
    NameTooLong { name: String, max: usize },

    #[error("invalid event property key {0:?}: keys are restricted to A-z and underscores")]
    InvalidPropertyKey(String),
}

/// An event for a contact. Construct with [`ContactEvent::new`], which
/// validates the name and property keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEvent {
    pub email_address: String,
    pub event_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, String>>,
}

impl ContactEvent {
    pub fn new(
        email_address: impl Into<String>,
        event_name: impl Into<String>,
        properties: Option<BTreeMap<String, String>>,
    ) -> Result<Self, EventValidationError> {
        let event = Self {
            email_address: email_address.into(),
            event_name: event_name.into(),
            properties,
        };
        event.validate()?;
        Ok(event)
    }

    pub fn validate(&self) -> Result<(), EventValidationError> {
        if self.event_name.encode_utf16().count() > MAX_EVENT_NAME_LENGTH {
            return Err(EventValidationError::NameTooLong {
                name: self.event_name.clone(),
                max: MAX_EVENT_NAME_LENGTH,
            });
        }
        if let Some(ref properties) = self.properties {
            if let Some(key) = properties
                .keys()
                .find(|key| !PROPERTIES_KEY_REGEX.is_match(key))
            {
                return Err(EventValidationError::InvalidPropertyKey(key.clone()));
            }
        }
        Ok(())
    }
}
