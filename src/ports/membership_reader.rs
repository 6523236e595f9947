//! MembershipReader port - read-only authorization predicates.
//!
//! Every realtime write and every broadcast audience computation is gated
//! by these lookups. They are pure reads over the store snapshot so the
//! broadcast router stays independently testable without a live socket.

use async_trait::async_trait;

use crate::domain::chat::Membership;
use crate::domain::foundation::{ChannelId, ConversationId, DomainError, ServerId, UserId};

/// Read-only membership, role and participancy lookups.
#[async_trait]
pub trait MembershipReader: Send + Sync {
    /// Whether `user_id` is a member of `server_id`.
    async fn is_server_member(
        &self,
        user_id: &UserId,
        server_id: &ServerId,
    ) -> Result<bool, DomainError>;

    /// The user's membership row in one server, including role and any
    /// active timeout.
    async fn membership(
        &self,
        user_id: &UserId,
        server_id: &ServerId,
    ) -> Result<Option<Membership>, DomainError>;

    /// The server a channel belongs to, or `None` for an unknown channel.
    async fn channel_server(&self, channel_id: &ChannelId)
        -> Result<Option<ServerId>, DomainError>;

    /// Whether `user_id` may access `channel_id` (member of the channel's
    /// owning server — channels have no independent membership lists).
    async fn is_channel_accessible(
        &self,
        user_id: &UserId,
        channel_id: &ChannelId,
    ) -> Result<bool, DomainError>;

    /// Whether `user_id` participates in `conversation_id`.
    async fn is_conversation_participant(
        &self,
        user_id: &UserId,
        conversation_id: &ConversationId,
    ) -> Result<bool, DomainError>;

    /// All member ids of one server.
    async fn server_member_ids(&self, server_id: &ServerId) -> Result<Vec<UserId>, DomainError>;

    /// All servers one user belongs to.
    async fn user_server_ids(&self, user_id: &UserId) -> Result<Vec<ServerId>, DomainError>;

    /// All participant ids of one conversation (one or two users).
    async fn conversation_participant_ids(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<UserId>, DomainError>;

    /// Distinct users sharing at least one server with `user_id`,
    /// excluding the user themselves. Used for the initial presence sync.
    async fn co_member_ids(&self, user_id: &UserId) -> Result<Vec<UserId>, DomainError>;
}
