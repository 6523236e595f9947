//! Message value objects for channels and direct conversations.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    AttachmentId, ChannelId, ConversationId, MessageId, Timestamp, UserId,
};

/// An uploaded file linked to exactly one message or direct message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: AttachmentId,
    pub message_id: MessageId,
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
    /// Capability URL clients fetch the bytes from.
    pub url: String,
}

/// A persisted channel message, hydrated for broadcast and history reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: Timestamp,
    pub attachment: Option<Attachment>,
    pub gif_url: Option<String>,
    /// Locked messages survive bulk purge.
    pub locked: bool,
}

/// A persisted direct message, hydrated for broadcast and history reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: Timestamp,
    pub attachment: Option<Attachment>,
    pub gif_url: Option<String>,
}

/// The sendable part of a message before persistence.
///
/// At least one of content, attachment or GIF URL must be present for the
/// draft to be accepted; whitespace-only content counts as empty.
#[derive(Debug, Clone, Default)]
pub struct MessageDraft {
    pub content: String,
    pub attachment_id: Option<AttachmentId>,
    pub gif_url: Option<String>,
}

impl MessageDraft {
    /// Whether this draft carries anything worth persisting.
    pub fn has_payload(&self) -> bool {
        !self.content.trim().is_empty() || self.attachment_id.is_some() || self.gif_url.is_some()
    }

    /// Content normalized for storage (empty string when blank).
    pub fn stored_content(&self) -> &str {
        if self.content.trim().is_empty() {
            ""
        } else {
            &self.content
        }
    }
}
