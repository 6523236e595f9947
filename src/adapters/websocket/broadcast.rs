//! Broadcast router - audience computation and fan-out.
//!
//! Resolving an audience is a pure read over the store snapshot; pushing
//! the serialized envelope to live sockets is best-effort with no queuing
//! and no retry. A user with zero connections simply receives nothing.

use std::sync::Arc;
use tracing::warn;

use crate::adapters::websocket::events::ServerEvent;
use crate::adapters::websocket::registry::{ConnectionRegistry, OutboundFrame};
use crate::domain::foundation::{ChannelId, ConversationId, DomainError, ServerId, UserId};
use crate::ports::MembershipReader;

/// The scope an event fans out to.
#[derive(Debug, Clone, PartialEq)]
pub enum Scope {
    /// Every member of the server.
    Server(ServerId),
    /// Every member of the channel's owning server.
    Channel(ChannelId),
    /// Every conversation participant (one or two users).
    Conversation(ConversationId),
}

/// Fans serialized envelopes out to the audience of a scope.
pub struct BroadcastRouter {
    membership: Arc<dyn MembershipReader>,
    registry: Arc<ConnectionRegistry>,
}

impl BroadcastRouter {
    pub fn new(membership: Arc<dyn MembershipReader>, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            membership,
            registry,
        }
    }

    /// The user ids an event in `scope` should reach, computed at call
    /// time. Unknown channels resolve to an empty audience.
    pub async fn resolve_audience(&self, scope: &Scope) -> Result<Vec<UserId>, DomainError> {
        match scope {
            Scope::Server(server_id) => self.membership.server_member_ids(server_id).await,
            Scope::Channel(channel_id) => {
                match self.membership.channel_server(channel_id).await? {
                    Some(server_id) => self.membership.server_member_ids(&server_id).await,
                    None => Ok(Vec::new()),
                }
            }
            Scope::Conversation(conversation_id) => {
                self.membership
                    .conversation_participant_ids(conversation_id)
                    .await
            }
        }
    }

    /// Serializes the event once and queues it on every live connection of
    /// every audience member, minus `exclude`.
    pub async fn broadcast(
        &self,
        scope: &Scope,
        event: &ServerEvent,
        exclude: Option<&UserId>,
    ) -> Result<(), DomainError> {
        let audience = self.resolve_audience(scope).await?;
        let frame = serialize(event)?;
        for user_id in &audience {
            if Some(user_id) == exclude {
                continue;
            }
            self.registry.send_to_user(user_id, &frame).await;
        }
        Ok(())
    }

    /// Queues the event on every connection of a single user, regardless
    /// of any membership (used for direct notifications like kicks).
    pub async fn send_to_user(
        &self,
        user_id: &UserId,
        event: &ServerEvent,
    ) -> Result<(), DomainError> {
        let frame = serialize(event)?;
        self.registry.send_to_user(user_id, &frame).await;
        Ok(())
    }

    /// Pushes the user's presence to everyone sharing a server with them,
    /// plus the user's own other devices. Deduplicated across servers.
    pub async fn broadcast_presence(
        &self,
        user_id: &UserId,
        event: &ServerEvent,
    ) -> Result<(), DomainError> {
        let mut audience = self.membership.co_member_ids(user_id).await?;
        audience.push(user_id.clone());
        let frame = serialize(event)?;
        for peer in &audience {
            self.registry.send_to_user(peer, &frame).await;
        }
        Ok(())
    }
}

fn serialize(event: &ServerEvent) -> Result<OutboundFrame, DomainError> {
    match serde_json::to_string(event) {
        Ok(json) => Ok(OutboundFrame::Event(json)),
        Err(e) => {
            warn!(error = %e, "Failed to serialize broadcast envelope");
            Err(DomainError::database(format!(
                "Failed to serialize event: {}",
                e
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{test_pool, SqliteMembershipReader};
    use crate::adapters::websocket::registry::ConnectionHandle;
    use crate::domain::foundation::ConnectionId;
    use sqlx::SqlitePool;
    use tokio::sync::mpsc;

    async fn seed(pool: &SqlitePool) {
        for id in ["u1", "u2", "u3"] {
            sqlx::query("INSERT INTO users (id, username, created_at) VALUES (?, ?, 0)")
                .bind(id)
                .bind(id)
                .execute(pool)
                .await
                .unwrap();
        }
        sqlx::query("INSERT INTO servers (id, name, owner_id, created_at) VALUES ('s1', 'home', 'u1', 0)")
            .execute(pool)
            .await
            .unwrap();
        for user in ["u1", "u2"] {
            sqlx::query(
                "INSERT INTO server_members (server_id, user_id, role, joined_at) VALUES ('s1', ?, 'user', 0)",
            )
            .bind(user)
            .execute(pool)
            .await
            .unwrap();
        }
        sqlx::query(
            "INSERT INTO channels (id, server_id, name, kind, created_at) VALUES ('c1', 's1', 'general', 'text', 0)",
        )
        .execute(pool)
        .await
        .unwrap();
    }

    async fn router_with_registry(pool: SqlitePool) -> (BroadcastRouter, Arc<ConnectionRegistry>) {
        let registry = Arc::new(ConnectionRegistry::new());
        let membership = Arc::new(SqliteMembershipReader::new(pool));
        (
            BroadcastRouter::new(membership, Arc::clone(&registry)),
            registry,
        )
    }

    async fn connect(
        registry: &ConnectionRegistry,
        user: &str,
    ) -> mpsc::UnboundedReceiver<OutboundFrame> {
        let (tx, rx) = mpsc::unbounded_channel();
        registry
            .register(&UserId::new(user), ConnectionId::new(), ConnectionHandle::new(tx))
            .await;
        rx
    }

    fn typing_event() -> ServerEvent {
        ServerEvent::MessageTyping {
            channel_id: ChannelId::new("c1"),
            user_id: UserId::new("u1"),
            username: "u1".to_string(),
        }
    }

    #[tokio::test]
    async fn channel_scope_resolves_to_server_members() {
        let pool = test_pool().await;
        seed(&pool).await;
        let (router, _) = router_with_registry(pool).await;

        let mut audience = router
            .resolve_audience(&Scope::Channel(ChannelId::new("c1")))
            .await
            .unwrap();
        audience.sort();
        assert_eq!(audience, vec![UserId::new("u1"), UserId::new("u2")]);
    }

    #[tokio::test]
    async fn unknown_channel_resolves_to_empty_audience() {
        let pool = test_pool().await;
        seed(&pool).await;
        let (router, _) = router_with_registry(pool).await;

        let audience = router
            .resolve_audience(&Scope::Channel(ChannelId::new("ghost")))
            .await
            .unwrap();
        assert!(audience.is_empty());
    }

    #[tokio::test]
    async fn broadcast_reaches_members_only() {
        let pool = test_pool().await;
        seed(&pool).await;
        let (router, registry) = router_with_registry(pool).await;

        let mut member = connect(&registry, "u2").await;
        let mut outsider = connect(&registry, "u3").await;

        router
            .broadcast(&Scope::Channel(ChannelId::new("c1")), &typing_event(), None)
            .await
            .unwrap();

        assert!(matches!(member.try_recv().unwrap(), OutboundFrame::Event(_)));
        assert!(outsider.try_recv().is_err());
    }

    #[tokio::test]
    async fn exclusion_skips_the_trigger_user_only() {
        let pool = test_pool().await;
        seed(&pool).await;
        let (router, registry) = router_with_registry(pool).await;

        let mut sender = connect(&registry, "u1").await;
        let mut peer = connect(&registry, "u2").await;

        router
            .broadcast(
                &Scope::Channel(ChannelId::new("c1")),
                &typing_event(),
                Some(&UserId::new("u1")),
            )
            .await
            .unwrap();

        assert!(sender.try_recv().is_err());
        assert!(peer.try_recv().is_ok());
    }

    #[tokio::test]
    async fn presence_broadcast_includes_self_and_co_members() {
        let pool = test_pool().await;
        seed(&pool).await;
        let (router, registry) = router_with_registry(pool).await;

        let mut own_device = connect(&registry, "u1").await;
        let mut peer = connect(&registry, "u2").await;
        let mut stranger = connect(&registry, "u3").await;

        let event = ServerEvent::PresenceUpdate {
            user_id: UserId::new("u1"),
            status: crate::domain::chat::PresenceStatus::Online,
            voice_channel_id: None,
        };
        router
            .broadcast_presence(&UserId::new("u1"), &event)
            .await
            .unwrap();

        assert!(own_device.try_recv().is_ok());
        assert!(peer.try_recv().is_ok());
        assert!(stranger.try_recv().is_err());
    }
}
