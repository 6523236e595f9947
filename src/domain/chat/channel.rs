//! Channel value objects.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ChannelId, ServerId, Timestamp, ValidationError};

/// Whether a channel carries text messages or voice sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Text,
    Voice,
}

impl ChannelKind {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Text => "text",
            ChannelKind::Voice => "voice",
        }
    }

    /// Parses the storage representation.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s {
            "text" => Ok(ChannelKind::Text),
            "voice" => Ok(ChannelKind::Voice),
            other => Err(ValidationError::invalid_value(
                "kind",
                format!("expected 'text' or 'voice', got '{}'", other),
            )),
        }
    }
}

/// A channel inside a server. Every channel belongs to exactly one server;
/// access control is entirely server-level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ChannelId,
    pub server_id: ServerId,
    pub name: String,
    pub kind: ChannelKind,
    pub created_at: Timestamp,
}

/// Validates a channel or server name (1-64 characters).
pub fn validate_name(field: &str, name: &str) -> Result<(), ValidationError> {
    let len = name.chars().count();
    if len < 1 || len > 64 {
        return Err(ValidationError::length_out_of_range(field, 1, 64, len));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_storage_form() {
        assert_eq!(ChannelKind::parse("text").unwrap(), ChannelKind::Text);
        assert_eq!(ChannelKind::parse("voice").unwrap(), ChannelKind::Voice);
        assert_eq!(ChannelKind::Voice.as_str(), "voice");
    }

    #[test]
    fn kind_rejects_unknown_value() {
        assert!(ChannelKind::parse("video").is_err());
    }

    #[test]
    fn name_length_is_bounded() {
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", "general").is_ok());
        assert!(validate_name("name", &"x".repeat(64)).is_ok());
        assert!(validate_name("name", &"x".repeat(65)).is_err());
    }
}
