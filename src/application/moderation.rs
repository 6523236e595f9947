//! Moderation use-cases - admin-gated mutations plus their broadcasts.
//!
//! These are triggered over HTTP but emit the same broadcast primitives
//! as the realtime handlers. Unlike the silent-drop realtime path, every
//! failure here is a structured error the HTTP layer maps to a response.

use std::sync::Arc;
use tracing::{info, warn};

use crate::adapters::websocket::{BroadcastRouter, Scope, ServerEvent};
use crate::domain::chat::{validate_name, Channel, ChannelKind, Membership, Role};
use crate::domain::foundation::{
    ChannelId, DomainError, ErrorCode, MessageId, ServerId, Timestamp, UserId,
};
use crate::ports::{ChannelStore, FileStore, MembershipReader, MessageStore, ServerStore};

/// How long a timeout mutes a member, in seconds.
const TIMEOUT_SECS: i64 = 5 * 60;

/// Admin-gated moderation actions with broadcast side-effects.
pub struct ModerationService {
    membership: Arc<dyn MembershipReader>,
    servers: Arc<dyn ServerStore>,
    channels: Arc<dyn ChannelStore>,
    messages: Arc<dyn MessageStore>,
    files: Arc<dyn FileStore>,
    router: Arc<BroadcastRouter>,
}

impl ModerationService {
    pub fn new(
        membership: Arc<dyn MembershipReader>,
        servers: Arc<dyn ServerStore>,
        channels: Arc<dyn ChannelStore>,
        messages: Arc<dyn MessageStore>,
        files: Arc<dyn FileStore>,
        router: Arc<BroadcastRouter>,
    ) -> Self {
        Self {
            membership,
            servers,
            channels,
            messages,
            files,
            router,
        }
    }

    /// The actor's membership, required to carry the admin role.
    async fn require_admin(
        &self,
        actor: &UserId,
        server_id: &ServerId,
    ) -> Result<Membership, DomainError> {
        let membership = self
            .membership
            .membership(actor, server_id)
            .await?
            .ok_or_else(|| DomainError::new(ErrorCode::Forbidden, "Not a member of this server"))?;
        if !membership.role.is_admin() {
            return Err(DomainError::new(
                ErrorCode::Forbidden,
                "Admin role required",
            ));
        }
        Ok(membership)
    }

    async fn target_membership(
        &self,
        target: &UserId,
        server_id: &ServerId,
    ) -> Result<Membership, DomainError> {
        self.membership
            .membership(target, server_id)
            .await?
            .ok_or_else(|| DomainError::new(ErrorCode::UserNotFound, "Not a member of this server"))
    }

    /// Removes and bans a member. Admins must be demoted first; the victim
    /// gets a direct kick notification, the remaining members a ban event.
    pub async fn ban(
        &self,
        actor: &UserId,
        server_id: &ServerId,
        target: &UserId,
    ) -> Result<(), DomainError> {
        self.require_admin(actor, server_id).await?;
        if actor == target {
            return Err(DomainError::new(
                ErrorCode::TargetIsSelf,
                "Cannot ban yourself",
            ));
        }
        let membership = self.target_membership(target, server_id).await?;
        if membership.role.is_admin() {
            return Err(DomainError::new(
                ErrorCode::TargetIsAdmin,
                "Demote the admin before banning",
            ));
        }

        self.servers.ban_member(server_id, target).await?;
        info!(%server_id, %target, %actor, "Member banned");

        self.router
            .send_to_user(
                target,
                &ServerEvent::MemberKicked {
                    server_id: server_id.clone(),
                    reason: "banned".to_string(),
                },
            )
            .await?;
        self.router
            .broadcast(
                &Scope::Server(server_id.clone()),
                &ServerEvent::MemberBanned {
                    server_id: server_id.clone(),
                    user_id: target.clone(),
                },
                None,
            )
            .await?;
        Ok(())
    }

    /// Mutes a member for five minutes.
    pub async fn timeout(
        &self,
        actor: &UserId,
        server_id: &ServerId,
        target: &UserId,
    ) -> Result<Timestamp, DomainError> {
        self.require_admin(actor, server_id).await?;
        if actor == target {
            return Err(DomainError::new(
                ErrorCode::TargetIsSelf,
                "Cannot time yourself out",
            ));
        }
        let membership = self.target_membership(target, server_id).await?;
        if membership.role.is_admin() {
            return Err(DomainError::new(
                ErrorCode::TargetIsAdmin,
                "Cannot time out an admin",
            ));
        }

        let until = Timestamp::now().plus_secs(TIMEOUT_SECS);
        self.servers.set_timeout(server_id, target, until).await?;

        self.router
            .broadcast(
                &Scope::Server(server_id.clone()),
                &ServerEvent::MemberTimeout {
                    server_id: server_id.clone(),
                    user_id: target.clone(),
                    timeout_until: until,
                },
                None,
            )
            .await?;
        Ok(until)
    }

    /// Grants the admin role.
    pub async fn promote(
        &self,
        actor: &UserId,
        server_id: &ServerId,
        target: &UserId,
    ) -> Result<(), DomainError> {
        self.require_admin(actor, server_id).await?;
        let membership = self.target_membership(target, server_id).await?;
        if membership.role.is_admin() {
            return Err(DomainError::new(
                ErrorCode::AlreadyAdmin,
                "Member is already an admin",
            ));
        }
        self.set_role_and_broadcast(server_id, target, Role::Admin)
            .await
    }

    /// Revokes the admin role. Self-demotion is rejected.
    pub async fn demote(
        &self,
        actor: &UserId,
        server_id: &ServerId,
        target: &UserId,
    ) -> Result<(), DomainError> {
        self.require_admin(actor, server_id).await?;
        if actor == target {
            return Err(DomainError::new(
                ErrorCode::TargetIsSelf,
                "Cannot demote yourself",
            ));
        }
        let membership = self.target_membership(target, server_id).await?;
        if !membership.role.is_admin() {
            return Err(DomainError::new(ErrorCode::NotAdmin, "Member is not an admin"));
        }
        self.set_role_and_broadcast(server_id, target, Role::User)
            .await
    }

    async fn set_role_and_broadcast(
        &self,
        server_id: &ServerId,
        target: &UserId,
        role: Role,
    ) -> Result<(), DomainError> {
        self.servers.set_role(server_id, target, role).await?;
        info!(%server_id, %target, role = role.as_str(), "Role changed");

        self.router
            .broadcast(
                &Scope::Server(server_id.clone()),
                &ServerEvent::MemberRoleChanged {
                    server_id: server_id.clone(),
                    user_id: target.clone(),
                    role,
                },
                None,
            )
            .await?;
        Ok(())
    }

    /// Hard-deletes a message and tells the channel audience.
    pub async fn delete_message(
        &self,
        actor: &UserId,
        message_id: &MessageId,
    ) -> Result<(), DomainError> {
        let (channel_id, server_id, _) = self
            .messages
            .message_context(message_id)
            .await?
            .ok_or_else(|| DomainError::new(ErrorCode::MessageNotFound, "No such message"))?;
        self.require_admin(actor, &server_id).await?;

        self.messages.delete_message(message_id).await?;

        self.router
            .broadcast(
                &Scope::Channel(channel_id.clone()),
                &ServerEvent::MessageDeleted {
                    message_id: message_id.clone(),
                    channel_id,
                },
                None,
            )
            .await?;
        Ok(())
    }

    /// Toggles purge protection on a message.
    pub async fn set_message_locked(
        &self,
        actor: &UserId,
        message_id: &MessageId,
        locked: bool,
    ) -> Result<(), DomainError> {
        let (channel_id, server_id, _) = self
            .messages
            .message_context(message_id)
            .await?
            .ok_or_else(|| DomainError::new(ErrorCode::MessageNotFound, "No such message"))?;
        self.require_admin(actor, &server_id).await?;

        self.messages.set_message_locked(message_id, locked).await?;

        self.router
            .broadcast(
                &Scope::Channel(channel_id.clone()),
                &ServerEvent::MessageLocked {
                    message_id: message_id.clone(),
                    channel_id,
                    locked,
                },
                None,
            )
            .await?;
        Ok(())
    }

    /// Deletes every unlocked message in the server's text channels and
    /// removes their attachment files. Deliberately emits no realtime
    /// event; the actor's HTTP response is the only signal.
    pub async fn purge_now(
        &self,
        actor: &UserId,
        server_id: &ServerId,
    ) -> Result<(), DomainError> {
        self.require_admin(actor, server_id).await?;

        let paths = self.messages.purge_unlocked_messages(server_id).await?;
        info!(%server_id, files = paths.len(), "Purged unlocked messages");
        for path in paths {
            if let Err(e) = self.files.remove(&path).await {
                warn!(error = %e, path, "Failed to remove purged attachment file");
            }
        }
        Ok(())
    }

    /// Stores the retention policy (0 disables scheduled purging).
    pub async fn set_purge_after_days(
        &self,
        actor: &UserId,
        server_id: &ServerId,
        days: i64,
    ) -> Result<(), DomainError> {
        self.require_admin(actor, server_id).await?;
        if !(0..=365).contains(&days) {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                "purge_after_days must be between 0 and 365",
            ));
        }
        self.servers.set_purge_after_days(server_id, days).await
    }

    /// Creates a channel and announces it to the server audience.
    pub async fn create_channel(
        &self,
        actor: &UserId,
        server_id: &ServerId,
        name: &str,
        kind: ChannelKind,
    ) -> Result<Channel, DomainError> {
        self.require_admin(actor, server_id).await?;
        validate_name("name", name)?;

        let channel = self.channels.create_channel(server_id, name, kind).await?;

        self.router
            .broadcast(
                &Scope::Server(server_id.clone()),
                &ServerEvent::ChannelCreated {
                    channel: channel.clone(),
                },
                None,
            )
            .await?;
        Ok(channel)
    }

    /// Deletes a channel. A server must always keep at least one text
    /// channel, so deleting the last one is rejected.
    pub async fn delete_channel(
        &self,
        actor: &UserId,
        channel_id: &ChannelId,
    ) -> Result<(), DomainError> {
        let channel = self
            .channels
            .get_channel(channel_id)
            .await?
            .ok_or_else(|| DomainError::new(ErrorCode::ChannelNotFound, "No such channel"))?;
        self.require_admin(actor, &channel.server_id).await?;

        if channel.kind == ChannelKind::Text
            && self.channels.text_channel_count(&channel.server_id).await? <= 1
        {
            return Err(DomainError::new(
                ErrorCode::LastTextChannel,
                "Cannot delete the last text channel",
            ));
        }

        self.channels.delete_channel(channel_id).await?;

        self.router
            .broadcast(
                &Scope::Server(channel.server_id.clone()),
                &ServerEvent::ChannelDeleted {
                    channel_id: channel_id.clone(),
                    server_id: channel.server_id,
                },
                None,
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{
        test_pool, SqliteChannelStore, SqliteMembershipReader, SqliteMessageStore,
        SqliteServerStore,
    };
    use crate::adapters::websocket::{
        ConnectionHandle, ConnectionRegistry, OutboundFrame,
    };
    use crate::domain::foundation::ConnectionId;
    use crate::ports::FileStore;
    use async_trait::async_trait;
    use sqlx::SqlitePool;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// Records removals instead of touching disk.
    #[derive(Default)]
    struct RecordingFileStore {
        removed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl FileStore for RecordingFileStore {
        async fn remove(&self, storage_path: &str) -> Result<(), DomainError> {
            self.removed.lock().unwrap().push(storage_path.to_string());
            Ok(())
        }
    }

    struct Harness {
        pool: SqlitePool,
        service: ModerationService,
        registry: Arc<ConnectionRegistry>,
        files: Arc<RecordingFileStore>,
    }

    async fn harness() -> Harness {
        let pool = test_pool().await;
        for (id, name) in [("admin", "ada"), ("member", "brian"), ("second", "clara")] {
            sqlx::query("INSERT INTO users (id, username, created_at) VALUES (?, ?, 0)")
                .bind(id)
                .bind(name)
                .execute(&pool)
                .await
                .unwrap();
        }
        sqlx::query(
            "INSERT INTO servers (id, name, owner_id, created_at) VALUES ('s1', 'home', 'admin', 0)",
        )
        .execute(&pool)
        .await
        .unwrap();
        for (user, role) in [("admin", "admin"), ("member", "user"), ("second", "user")] {
            sqlx::query(
                "INSERT INTO server_members (server_id, user_id, role, joined_at) VALUES ('s1', ?, ?, 0)",
            )
            .bind(user)
            .bind(role)
            .execute(&pool)
            .await
            .unwrap();
        }
        sqlx::query(
            "INSERT INTO channels (id, server_id, name, kind, created_at) VALUES ('c1', 's1', 'general', 'text', 0)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let registry = Arc::new(ConnectionRegistry::new());
        let membership: Arc<dyn MembershipReader> =
            Arc::new(SqliteMembershipReader::new(pool.clone()));
        let router = Arc::new(BroadcastRouter::new(
            Arc::clone(&membership),
            Arc::clone(&registry),
        ));
        let files = Arc::new(RecordingFileStore::default());
        let service = ModerationService::new(
            membership,
            Arc::new(SqliteServerStore::new(pool.clone())),
            Arc::new(SqliteChannelStore::new(pool.clone())),
            Arc::new(SqliteMessageStore::new(pool.clone())),
            Arc::clone(&files) as Arc<dyn FileStore>,
            router,
        );
        Harness {
            pool,
            service,
            registry,
            files,
        }
    }

    async fn connect(h: &Harness, id: &str) -> mpsc::UnboundedReceiver<OutboundFrame> {
        let (tx, rx) = mpsc::unbounded_channel();
        h.registry
            .register(&UserId::new(id), ConnectionId::new(), ConnectionHandle::new(tx))
            .await;
        rx
    }

    fn recv_json(rx: &mut mpsc::UnboundedReceiver<OutboundFrame>) -> serde_json::Value {
        match rx.try_recv().unwrap() {
            OutboundFrame::Event(json) => serde_json::from_str(&json).unwrap(),
            other => panic!("expected event frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn ban_kicks_victim_and_informs_the_rest() {
        let h = harness().await;
        let mut victim = connect(&h, "member").await;
        let mut bystander = connect(&h, "second").await;

        h.service
            .ban(&UserId::new("admin"), &ServerId::new("s1"), &UserId::new("member"))
            .await
            .unwrap();

        let kicked = recv_json(&mut victim);
        assert_eq!(kicked["event"], "member:kicked");
        assert_eq!(kicked["data"]["serverId"], "s1");

        let banned = recv_json(&mut bystander);
        assert_eq!(banned["event"], "member:banned");
        assert_eq!(banned["data"]["userId"], "member");

        // The victim's membership row is gone, so the ban broadcast to the
        // server audience no longer includes them.
        assert!(victim.try_recv().is_err());
    }

    #[tokio::test]
    async fn banning_self_or_admin_is_rejected() {
        let h = harness().await;
        let admin = UserId::new("admin");
        let server = ServerId::new("s1");

        let e = h.service.ban(&admin, &server, &admin).await.unwrap_err();
        assert_eq!(e.code, ErrorCode::TargetIsSelf);

        // Promote then try to ban: rejected until demoted.
        h.service
            .promote(&admin, &server, &UserId::new("member"))
            .await
            .unwrap();
        let e = h
            .service
            .ban(&admin, &server, &UserId::new("member"))
            .await
            .unwrap_err();
        assert_eq!(e.code, ErrorCode::TargetIsAdmin);

        h.service
            .demote(&admin, &server, &UserId::new("member"))
            .await
            .unwrap();
        assert!(h.service.ban(&admin, &server, &UserId::new("member")).await.is_ok());
    }

    #[tokio::test]
    async fn non_admin_actor_is_forbidden() {
        let h = harness().await;
        let e = h
            .service
            .ban(&UserId::new("member"), &ServerId::new("s1"), &UserId::new("second"))
            .await
            .unwrap_err();
        assert_eq!(e.code, ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn timeout_sets_future_deadline_and_broadcasts() {
        let h = harness().await;
        let mut bystander = connect(&h, "second").await;

        let until = h
            .service
            .timeout(&UserId::new("admin"), &ServerId::new("s1"), &UserId::new("member"))
            .await
            .unwrap();
        assert!(until.is_future());

        let frame = recv_json(&mut bystander);
        assert_eq!(frame["event"], "member:timeout");
        assert_eq!(frame["data"]["userId"], "member");
        assert_eq!(frame["data"]["timeoutUntil"], until.as_unix());
    }

    #[tokio::test]
    async fn double_promotion_and_double_demotion_are_rejected() {
        let h = harness().await;
        let admin = UserId::new("admin");
        let server = ServerId::new("s1");
        let target = UserId::new("member");

        h.service.promote(&admin, &server, &target).await.unwrap();
        let e = h.service.promote(&admin, &server, &target).await.unwrap_err();
        assert_eq!(e.code, ErrorCode::AlreadyAdmin);

        h.service.demote(&admin, &server, &target).await.unwrap();
        let e = h.service.demote(&admin, &server, &target).await.unwrap_err();
        assert_eq!(e.code, ErrorCode::NotAdmin);

        let e = h.service.demote(&admin, &server, &admin).await.unwrap_err();
        assert_eq!(e.code, ErrorCode::TargetIsSelf);
    }

    #[tokio::test]
    async fn delete_message_broadcasts_to_the_channel() {
        let h = harness().await;
        sqlx::query(
            "INSERT INTO messages (id, channel_id, author_id, content, locked, created_at) VALUES ('m1', 'c1', 'member', 'hi', 0, 0)",
        )
        .execute(&h.pool)
        .await
        .unwrap();
        let mut bystander = connect(&h, "second").await;

        h.service
            .delete_message(&UserId::new("admin"), &MessageId::new("m1"))
            .await
            .unwrap();

        let frame = recv_json(&mut bystander);
        assert_eq!(frame["event"], "message:deleted");
        assert_eq!(frame["data"]["messageId"], "m1");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&h.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn lock_then_purge_spares_the_locked_message_silently() {
        let h = harness().await;
        for (id, path) in [("m1", "uploads/m1.png"), ("m2", "uploads/m2.png")] {
            sqlx::query(
                "INSERT INTO messages (id, channel_id, author_id, content, locked, created_at) VALUES (?, 'c1', 'member', 'x', 0, 0)",
            )
            .bind(id)
            .execute(&h.pool)
            .await
            .unwrap();
            sqlx::query(
                "INSERT INTO attachments (id, message_id, filename, mime_type, size, storage_path, created_at) VALUES (?, ?, 'f', 'image/png', 1, ?, 0)",
            )
            .bind(format!("a-{}", id))
            .bind(id)
            .bind(path)
            .execute(&h.pool)
            .await
            .unwrap();
        }
        let admin = UserId::new("admin");

        h.service
            .set_message_locked(&admin, &MessageId::new("m1"), true)
            .await
            .unwrap();

        let mut bystander = connect(&h, "second").await;
        h.service.purge_now(&admin, &ServerId::new("s1")).await.unwrap();

        // Purge pushes nothing over the realtime channel.
        assert!(bystander.try_recv().is_err());

        let survivors: Vec<String> = sqlx::query_scalar("SELECT id FROM messages")
            .fetch_all(&h.pool)
            .await
            .unwrap();
        assert_eq!(survivors, vec!["m1".to_string()]);
        assert_eq!(
            *h.files.removed.lock().unwrap(),
            vec!["uploads/m2.png".to_string()]
        );
    }

    #[tokio::test]
    async fn last_text_channel_cannot_be_deleted() {
        let h = harness().await;
        let admin = UserId::new("admin");

        let e = h
            .service
            .delete_channel(&admin, &ChannelId::new("c1"))
            .await
            .unwrap_err();
        assert_eq!(e.code, ErrorCode::LastTextChannel);

        // With a second text channel the delete goes through and the
        // audience hears about it.
        let extra = h
            .service
            .create_channel(&admin, &ServerId::new("s1"), "random", ChannelKind::Text)
            .await
            .unwrap();
        let mut bystander = connect(&h, "second").await;

        h.service.delete_channel(&admin, &extra.id).await.unwrap();
        let frame = recv_json(&mut bystander);
        assert_eq!(frame["event"], "channel:deleted");
        assert_eq!(frame["data"]["channelId"], extra.id.as_str());
    }

    #[tokio::test]
    async fn channel_creation_is_admin_gated_and_broadcast() {
        let h = harness().await;
        let mut bystander = connect(&h, "second").await;

        let e = h
            .service
            .create_channel(&UserId::new("member"), &ServerId::new("s1"), "nope", ChannelKind::Text)
            .await
            .unwrap_err();
        assert_eq!(e.code, ErrorCode::Forbidden);

        h.service
            .create_channel(&UserId::new("admin"), &ServerId::new("s1"), "random", ChannelKind::Text)
            .await
            .unwrap();
        let frame = recv_json(&mut bystander);
        assert_eq!(frame["event"], "channel:created");
        assert_eq!(frame["data"]["channel"]["name"], "random");
    }

    #[tokio::test]
    async fn purge_days_outside_range_rejected() {
        let h = harness().await;
        let e = h
            .service
            .set_purge_after_days(&UserId::new("admin"), &ServerId::new("s1"), 400)
            .await
            .unwrap_err();
        assert_eq!(e.code, ErrorCode::ValidationFailed);

        assert!(h
            .service
            .set_purge_after_days(&UserId::new("admin"), &ServerId::new("s1"), 30)
            .await
            .is_ok());
    }
}
