//! SQLite implementation of MembershipReader.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::chat::{Membership, Role};
use crate::domain::foundation::{
    ChannelId, ConversationId, DomainError, ServerId, Timestamp, UserId,
};
use crate::ports::MembershipReader;

/// Read-only membership predicates over the SQLite store.
#[derive(Clone)]
pub struct SqliteMembershipReader {
    pool: SqlitePool,
}

impl SqliteMembershipReader {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct MembershipRow {
    server_id: String,
    user_id: String,
    role: String,
    joined_at: i64,
    timeout_until: Option<i64>,
}

impl TryFrom<MembershipRow> for Membership {
    type Error = DomainError;

    fn try_from(row: MembershipRow) -> Result<Self, Self::Error> {
        Ok(Membership {
            server_id: ServerId::new(row.server_id),
            user_id: UserId::new(row.user_id),
            role: Role::parse(&row.role)?,
            joined_at: Timestamp::from_unix(row.joined_at),
            timeout_until: row.timeout_until.map(Timestamp::from_unix),
        })
    }
}

#[async_trait]
impl MembershipReader for SqliteMembershipReader {
    async fn is_server_member(
        &self,
        user_id: &UserId,
        server_id: &ServerId,
    ) -> Result<bool, DomainError> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM server_members WHERE server_id = ? AND user_id = ?)",
        )
        .bind(server_id.as_str())
        .bind(user_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to check membership: {}", e)))?;

        Ok(exists != 0)
    }

    async fn membership(
        &self,
        user_id: &UserId,
        server_id: &ServerId,
    ) -> Result<Option<Membership>, DomainError> {
        let row: Option<MembershipRow> = sqlx::query_as(
            r#"
            SELECT server_id, user_id, role, joined_at, timeout_until
            FROM server_members
            WHERE server_id = ? AND user_id = ?
            "#,
        )
        .bind(server_id.as_str())
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load membership: {}", e)))?;

        row.map(Membership::try_from).transpose()
    }

    async fn channel_server(
        &self,
        channel_id: &ChannelId,
    ) -> Result<Option<ServerId>, DomainError> {
        let server_id: Option<String> =
            sqlx::query_scalar("SELECT server_id FROM channels WHERE id = ?")
                .bind(channel_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    DomainError::database(format!("Failed to resolve channel server: {}", e))
                })?;

        Ok(server_id.map(ServerId::new))
    }

    async fn is_channel_accessible(
        &self,
        user_id: &UserId,
        channel_id: &ChannelId,
    ) -> Result<bool, DomainError> {
        let exists: i64 = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM channels c
                JOIN server_members m ON m.server_id = c.server_id
                WHERE c.id = ? AND m.user_id = ?
            )
            "#,
        )
        .bind(channel_id.as_str())
        .bind(user_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to check channel access: {}", e)))?;

        Ok(exists != 0)
    }

    async fn is_conversation_participant(
        &self,
        user_id: &UserId,
        conversation_id: &ConversationId,
    ) -> Result<bool, DomainError> {
        let exists: i64 = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM conversation_participants
                WHERE conversation_id = ? AND user_id = ?
            )
            "#,
        )
        .bind(conversation_id.as_str())
        .bind(user_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to check participancy: {}", e)))?;

        Ok(exists != 0)
    }

    async fn server_member_ids(&self, server_id: &ServerId) -> Result<Vec<UserId>, DomainError> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT user_id FROM server_members WHERE server_id = ?")
                .bind(server_id.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DomainError::database(format!("Failed to list members: {}", e)))?;

        Ok(ids.into_iter().map(UserId::new).collect())
    }

    async fn user_server_ids(&self, user_id: &UserId) -> Result<Vec<ServerId>, DomainError> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT server_id FROM server_members WHERE user_id = ?")
                .bind(user_id.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DomainError::database(format!("Failed to list servers: {}", e)))?;

        Ok(ids.into_iter().map(ServerId::new).collect())
    }

    async fn conversation_participant_ids(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<UserId>, DomainError> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT user_id FROM conversation_participants WHERE conversation_id = ?",
        )
        .bind(conversation_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list participants: {}", e)))?;

        Ok(ids.into_iter().map(UserId::new).collect())
    }

    async fn co_member_ids(&self, user_id: &UserId) -> Result<Vec<UserId>, DomainError> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT peer.user_id
            FROM server_members own
            JOIN server_members peer ON peer.server_id = own.server_id
            WHERE own.user_id = ? AND peer.user_id != ?
            "#,
        )
        .bind(user_id.as_str())
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list co-members: {}", e)))?;

        Ok(ids.into_iter().map(UserId::new).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::test_pool;

    async fn seed(pool: &SqlitePool) {
        for (id, name) in [("u1", "ada"), ("u2", "brian"), ("u3", "clara")] {
            sqlx::query("INSERT INTO users (id, username, created_at) VALUES (?, ?, 0)")
                .bind(id)
                .bind(name)
                .execute(pool)
                .await
                .unwrap();
        }
        sqlx::query("INSERT INTO servers (id, name, owner_id, created_at) VALUES ('s1', 'home', 'u1', 0)")
            .execute(pool)
            .await
            .unwrap();
        for (user, role) in [("u1", "admin"), ("u2", "user")] {
            sqlx::query(
                "INSERT INTO server_members (server_id, user_id, role, joined_at) VALUES ('s1', ?, ?, 0)",
            )
            .bind(user)
            .bind(role)
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

    #[tokio::test]
    async fn membership_carries_role_and_timeout() {
        let pool = test_pool().await;
        seed(&pool).await;

        let reader = SqliteMembershipReader::new(pool);
        let m = reader
            .membership(&UserId::new("u1"), &ServerId::new("s1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(m.role, Role::Admin);
        assert!(m.timeout_until.is_none());

        assert!(reader
            .membership(&UserId::new("u3"), &ServerId::new("s1"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn channel_access_follows_server_membership() {
        let pool = test_pool().await;
        seed(&pool).await;

        let reader = SqliteMembershipReader::new(pool);
        assert!(reader
            .is_channel_accessible(&UserId::new("u2"), &ChannelId::new("c1"))
            .await
            .unwrap());
        assert!(!reader
            .is_channel_accessible(&UserId::new("u3"), &ChannelId::new("c1"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn co_members_exclude_self() {
        let pool = test_pool().await;
        seed(&pool).await;

        let reader = SqliteMembershipReader::new(pool);
        let peers = reader.co_member_ids(&UserId::new("u1")).await.unwrap();
        assert_eq!(peers, vec![UserId::new("u2")]);
    }
}
