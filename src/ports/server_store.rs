//! ServerStore port - server lifecycle, membership mutation, invites and
//! moderation writes.

use async_trait::async_trait;

use crate::domain::chat::{ChatServer, Invite, PublicUser, Role};
use crate::domain::foundation::{DomainError, ServerId, Timestamp, UserId};

/// A member listing entry with identity and role.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberProfile {
    pub user: PublicUser,
    pub role: Role,
    pub joined_at: Timestamp,
}

/// Writes and reads for servers, members, bans and invites.
#[async_trait]
pub trait ServerStore: Send + Sync {
    /// Creates a server, seeding the owner as an admin member plus a
    /// default text channel and a default voice channel, atomically.
    async fn create_server(
        &self,
        name: &str,
        owner_id: &UserId,
    ) -> Result<ChatServer, DomainError>;

    /// Servers the user is a member of, oldest-first.
    async fn servers_for_user(&self, user_id: &UserId) -> Result<Vec<ChatServer>, DomainError>;

    /// One server, if it exists.
    async fn get_server(&self, server_id: &ServerId) -> Result<Option<ChatServer>, DomainError>;

    /// Deletes a server and everything under it.
    async fn delete_server(&self, server_id: &ServerId) -> Result<(), DomainError>;

    /// Member listing with identity snapshots, oldest-first.
    async fn server_members(&self, server_id: &ServerId)
        -> Result<Vec<MemberProfile>, DomainError>;

    /// Adds a member with the default role; no-op if already a member.
    async fn add_member(&self, server_id: &ServerId, user_id: &UserId)
        -> Result<(), DomainError>;

    /// Removes a membership row and records the ban, atomically.
    async fn ban_member(&self, server_id: &ServerId, user_id: &UserId)
        -> Result<(), DomainError>;

    /// Whether the user was banned from the server. Banned users cannot
    /// rejoin through an invite.
    async fn is_banned(&self, server_id: &ServerId, user_id: &UserId)
        -> Result<bool, DomainError>;

    /// Sets a member's role.
    async fn set_role(
        &self,
        server_id: &ServerId,
        user_id: &UserId,
        role: Role,
    ) -> Result<(), DomainError>;

    /// Sets the member's mute deadline.
    async fn set_timeout(
        &self,
        server_id: &ServerId,
        user_id: &UserId,
        until: Timestamp,
    ) -> Result<(), DomainError>;

    /// Stores the retention policy.
    async fn set_purge_after_days(
        &self,
        server_id: &ServerId,
        days: i64,
    ) -> Result<(), DomainError>;

    /// Mints an invite code for a server.
    async fn create_invite(
        &self,
        server_id: &ServerId,
        created_by: &UserId,
        uses_remaining: Option<i64>,
        expires_at: Option<Timestamp>,
    ) -> Result<Invite, DomainError>;

    /// Atomically consumes one use of an invite code. Returns the target
    /// server, or `None` when the code is unknown, expired or exhausted.
    async fn consume_invite(&self, code: &str) -> Result<Option<ServerId>, DomainError>;
}
