//! MessageStore port - persistence for channel messages, direct messages
//! and attachment linkage.

use async_trait::async_trait;

use crate::domain::chat::{Attachment, DirectMessage, Message, PublicUser};
use crate::domain::foundation::{
    AttachmentId, ChannelId, ConversationId, DomainError, MessageId, ServerId, Timestamp, UserId,
};

/// An uploaded attachment never linked to a message or DM.
#[derive(Debug, Clone, PartialEq)]
pub struct OrphanedAttachment {
    pub id: AttachmentId,
    pub storage_path: String,
}

/// Persistence operations for messages and their attachments.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Inserts a channel message with a server-assigned creation timestamp.
    /// The returned message carries no attachment; linkage happens through
    /// [`MessageStore::claim_attachment_for_message`].
    async fn insert_message(
        &self,
        channel_id: &ChannelId,
        author_id: &UserId,
        content: &str,
        gif_url: Option<&str>,
    ) -> Result<Message, DomainError>;

    /// Inserts a direct message with a server-assigned creation timestamp.
    async fn insert_direct_message(
        &self,
        conversation_id: &ConversationId,
        author_id: &UserId,
        content: &str,
        gif_url: Option<&str>,
    ) -> Result<DirectMessage, DomainError>;

    /// Atomically links an attachment to a channel message, but only if it
    /// is not already linked anywhere. Exactly one of two concurrent claims
    /// for the same attachment succeeds; the loser observes `None`.
    async fn claim_attachment_for_message(
        &self,
        attachment_id: &AttachmentId,
        message_id: &MessageId,
    ) -> Result<Option<Attachment>, DomainError>;

    /// Atomically links an attachment to a direct message; same contract as
    /// [`MessageStore::claim_attachment_for_message`].
    async fn claim_attachment_for_dm(
        &self,
        attachment_id: &AttachmentId,
        dm_id: &MessageId,
    ) -> Result<Option<Attachment>, DomainError>;

    /// The channel, owning server and lock flag of a message, or `None`
    /// when the message does not exist.
    async fn message_context(
        &self,
        message_id: &MessageId,
    ) -> Result<Option<(ChannelId, ServerId, bool)>, DomainError>;

    /// Hard-deletes one message.
    async fn delete_message(&self, message_id: &MessageId) -> Result<(), DomainError>;

    /// Sets the purge-protection flag on one message.
    async fn set_message_locked(
        &self,
        message_id: &MessageId,
        locked: bool,
    ) -> Result<(), DomainError>;

    /// Deletes every unlocked message in every text channel of a server.
    /// Returns the storage paths of attachment files that lost their
    /// owning message, for the caller to remove from disk.
    async fn purge_unlocked_messages(
        &self,
        server_id: &ServerId,
    ) -> Result<Vec<String>, DomainError>;

    /// Paginated channel history, oldest-first, hydrated with the author
    /// snapshot and attachment. `before` is an exclusive upper bound.
    async fn channel_messages(
        &self,
        channel_id: &ChannelId,
        before: Option<Timestamp>,
        limit: u32,
    ) -> Result<Vec<(Message, PublicUser)>, DomainError>;

    /// Paginated conversation history, oldest-first.
    async fn conversation_messages(
        &self,
        conversation_id: &ConversationId,
        before: Option<Timestamp>,
        limit: u32,
    ) -> Result<Vec<(DirectMessage, PublicUser)>, DomainError>;

    /// Attachments uploaded before `cutoff` and never linked anywhere.
    async fn orphaned_attachments(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<OrphanedAttachment>, DomainError>;

    /// Removes one attachment row.
    async fn delete_attachment(&self, attachment_id: &AttachmentId) -> Result<(), DomainError>;
}
