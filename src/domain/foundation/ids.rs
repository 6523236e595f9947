//! Strongly-typed identifier value objects.
//!
//! Entity ids are string-backed (UUIDv4 rendered as text) because that is
//! how the store persists them; `ConnectionId` is transport-local and stays
//! a raw Uuid.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Wraps an existing identifier string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the inner string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a registered user.
    UserId
);
string_id!(
    /// Identifier of a chat server (a community of channels and members).
    ServerId
);
string_id!(
    /// Identifier of a text or voice channel.
    ChannelId
);
string_id!(
    /// Identifier of a channel message.
    MessageId
);
string_id!(
    /// Identifier of a direct-message conversation.
    ConversationId
);
string_id!(
    /// Identifier of an uploaded attachment.
    AttachmentId
);

/// Identifier of a single live WebSocket connection.
///
/// Generated server-side at registration; one user may hold many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Creates a new random connection id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(UserId::generate(), UserId::generate());
        assert_ne!(ConnectionId::new(), ConnectionId::new());
    }

    #[test]
    fn string_id_round_trips_through_serde() {
        let id = ChannelId::new("chan-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"chan-1\"");
        let back: ChannelId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn string_id_displays_inner_value() {
        let id = ServerId::new("srv-9");
        assert_eq!(format!("{}", id), "srv-9");
        assert_eq!(id.as_str(), "srv-9");
    }
}
