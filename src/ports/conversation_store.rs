//! ConversationStore port - direct-message conversation lifecycle.
//!
//! Only 1:1 and note-to-self conversations exist; there are no group DMs.

use async_trait::async_trait;

use crate::domain::chat::{DirectMessage, PublicUser};
use crate::domain::foundation::{ConversationId, DomainError, Timestamp, UserId};

/// A conversation hydrated for listing: participants and last activity.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationView {
    pub id: ConversationId,
    pub participants: Vec<PublicUser>,
    pub last_message: Option<DirectMessage>,
    pub created_at: Timestamp,
}

/// Writes and reads for conversations.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Conversations the user participates in, most recent activity first.
    async fn conversations_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ConversationView>, DomainError>;

    /// Finds the existing conversation with exactly this participant set,
    /// or creates it. `other` is `None` for note-to-self. Returns the view
    /// and whether a new conversation was created.
    async fn find_or_create(
        &self,
        user_id: &UserId,
        other: Option<&UserId>,
    ) -> Result<(ConversationView, bool), DomainError>;

    /// Whether a user id exists at all (for validating the `other` side).
    async fn user_exists(&self, user_id: &UserId) -> Result<bool, DomainError>;
}
