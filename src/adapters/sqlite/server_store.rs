//! SQLite implementation of ServerStore.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::chat::{ChatServer, Invite, PublicUser, Role};
use crate::domain::foundation::{ChannelId, DomainError, ServerId, Timestamp, UserId};
use crate::ports::{MemberProfile, ServerStore};

/// Server, membership, ban and invite persistence over the SQLite store.
#[derive(Clone)]
pub struct SqliteServerStore {
    pool: SqlitePool,
}

impl SqliteServerStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ServerRow {
    id: String,
    name: String,
    owner_id: String,
    created_at: i64,
    purge_after_days: i64,
}

impl From<ServerRow> for ChatServer {
    fn from(row: ServerRow) -> Self {
        ChatServer {
            id: ServerId::new(row.id),
            name: row.name,
            owner_id: UserId::new(row.owner_id),
            created_at: Timestamp::from_unix(row.created_at),
            purge_after_days: row.purge_after_days,
        }
    }
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    user_id: String,
    username: String,
    avatar_url: Option<String>,
    user_created_at: i64,
    role: String,
    joined_at: i64,
}

impl TryFrom<MemberRow> for MemberProfile {
    type Error = DomainError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        Ok(MemberProfile {
            user: PublicUser {
                id: UserId::new(row.user_id),
                username: row.username,
                avatar_url: row.avatar_url,
                created_at: Timestamp::from_unix(row.user_created_at),
            },
            role: Role::parse(&row.role)?,
            joined_at: Timestamp::from_unix(row.joined_at),
        })
    }
}

fn generate_invite_code() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    raw[..10].to_string()
}

#[async_trait]
impl ServerStore for SqliteServerStore {
    async fn create_server(
        &self,
        name: &str,
        owner_id: &UserId,
    ) -> Result<ChatServer, DomainError> {
        let id = ServerId::generate();
        let created_at = Timestamp::now();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to start transaction: {}", e)))?;

        sqlx::query(
            "INSERT INTO servers (id, name, owner_id, created_at, purge_after_days) VALUES (?, ?, ?, ?, 0)",
        )
        .bind(id.as_str())
        .bind(name)
        .bind(owner_id.as_str())
        .bind(created_at.as_unix())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to insert server: {}", e)))?;

        sqlx::query(
            "INSERT INTO server_members (server_id, user_id, role, joined_at) VALUES (?, ?, 'admin', ?)",
        )
        .bind(id.as_str())
        .bind(owner_id.as_str())
        .bind(created_at.as_unix())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to seed owner membership: {}", e)))?;

        for (channel_name, kind) in [("general", "text"), ("Voice", "voice")] {
            sqlx::query(
                "INSERT INTO channels (id, server_id, name, kind, created_at) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(ChannelId::generate().as_str())
            .bind(id.as_str())
            .bind(channel_name)
            .bind(kind)
            .bind(created_at.as_unix())
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to seed channel: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit server creation: {}", e)))?;

        Ok(ChatServer {
            id,
            name: name.to_string(),
            owner_id: owner_id.clone(),
            created_at,
            purge_after_days: 0,
        })
    }

    async fn servers_for_user(&self, user_id: &UserId) -> Result<Vec<ChatServer>, DomainError> {
        let rows: Vec<ServerRow> = sqlx::query_as(
            r#"
            SELECT s.id, s.name, s.owner_id, s.created_at, s.purge_after_days
            FROM servers s
            JOIN server_members m ON m.server_id = s.id
            WHERE m.user_id = ?
            ORDER BY s.created_at ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list servers: {}", e)))?;

        Ok(rows.into_iter().map(ChatServer::from).collect())
    }

    async fn get_server(&self, server_id: &ServerId) -> Result<Option<ChatServer>, DomainError> {
        let row: Option<ServerRow> = sqlx::query_as(
            "SELECT id, name, owner_id, created_at, purge_after_days FROM servers WHERE id = ?",
        )
        .bind(server_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load server: {}", e)))?;

        Ok(row.map(ChatServer::from))
    }

    async fn delete_server(&self, server_id: &ServerId) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM servers WHERE id = ?")
            .bind(server_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to delete server: {}", e)))?;
        Ok(())
    }

    async fn server_members(
        &self,
        server_id: &ServerId,
    ) -> Result<Vec<MemberProfile>, DomainError> {
        let rows: Vec<MemberRow> = sqlx::query_as(
            r#"
            SELECT m.user_id, u.username, u.avatar_url, u.created_at AS user_created_at,
                   m.role, m.joined_at
            FROM server_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.server_id = ?
            ORDER BY m.joined_at ASC
            "#,
        )
        .bind(server_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list members: {}", e)))?;

        rows.into_iter().map(MemberProfile::try_from).collect()
    }

    async fn add_member(
        &self,
        server_id: &ServerId,
        user_id: &UserId,
    ) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT OR IGNORE INTO server_members (server_id, user_id, role, joined_at) VALUES (?, ?, 'user', ?)",
        )
        .bind(server_id.as_str())
        .bind(user_id.as_str())
        .bind(Timestamp::now().as_unix())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to add member: {}", e)))?;
        Ok(())
    }

    async fn ban_member(
        &self,
        server_id: &ServerId,
        user_id: &UserId,
    ) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to start transaction: {}", e)))?;

        sqlx::query("DELETE FROM server_members WHERE server_id = ? AND user_id = ?")
            .bind(server_id.as_str())
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to remove membership: {}", e)))?;

        sqlx::query(
            "INSERT OR REPLACE INTO server_bans (server_id, user_id, banned_at) VALUES (?, ?, ?)",
        )
        .bind(server_id.as_str())
        .bind(user_id.as_str())
        .bind(Timestamp::now().as_unix())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to record ban: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit ban: {}", e)))?;
        Ok(())
    }

    async fn is_banned(
        &self,
        server_id: &ServerId,
        user_id: &UserId,
    ) -> Result<bool, DomainError> {
        let exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM server_bans WHERE server_id = ? AND user_id = ?)",
        )
        .bind(server_id.as_str())
        .bind(user_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to check ban: {}", e)))?;

        Ok(exists != 0)
    }

    async fn set_role(
        &self,
        server_id: &ServerId,
        user_id: &UserId,
        role: Role,
    ) -> Result<(), DomainError> {
        sqlx::query("UPDATE server_members SET role = ? WHERE server_id = ? AND user_id = ?")
            .bind(role.as_str())
            .bind(server_id.as_str())
            .bind(user_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to set role: {}", e)))?;
        Ok(())
    }

    async fn set_timeout(
        &self,
        server_id: &ServerId,
        user_id: &UserId,
        until: Timestamp,
    ) -> Result<(), DomainError> {
        sqlx::query(
            "UPDATE server_members SET timeout_until = ? WHERE server_id = ? AND user_id = ?",
        )
        .bind(until.as_unix())
        .bind(server_id.as_str())
        .bind(user_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to set timeout: {}", e)))?;
        Ok(())
    }

    async fn set_purge_after_days(
        &self,
        server_id: &ServerId,
        days: i64,
    ) -> Result<(), DomainError> {
        sqlx::query("UPDATE servers SET purge_after_days = ? WHERE id = ?")
            .bind(days)
            .bind(server_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to set retention: {}", e)))?;
        Ok(())
    }

    async fn create_invite(
        &self,
        server_id: &ServerId,
        created_by: &UserId,
        uses_remaining: Option<i64>,
        expires_at: Option<Timestamp>,
    ) -> Result<Invite, DomainError> {
        let code = generate_invite_code();
        let created_at = Timestamp::now();

        sqlx::query(
            r#"
            INSERT INTO invite_codes (code, server_id, created_by, uses_remaining, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&code)
        .bind(server_id.as_str())
        .bind(created_by.as_str())
        .bind(uses_remaining)
        .bind(expires_at.map(|t| t.as_unix()))
        .bind(created_at.as_unix())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to create invite: {}", e)))?;

        Ok(Invite {
            code,
            server_id: server_id.clone(),
            created_by: created_by.clone(),
            uses_remaining,
            expires_at,
            created_at,
        })
    }

    async fn consume_invite(&self, code: &str) -> Result<Option<ServerId>, DomainError> {
        // Single conditional decrement so concurrent joins cannot overdraw
        // a use-limited code.
        let server_id: Option<String> = sqlx::query_scalar(
            r#"
            UPDATE invite_codes
            SET uses_remaining = CASE
                WHEN uses_remaining IS NULL THEN NULL
                ELSE uses_remaining - 1
            END
            WHERE code = ?
              AND (expires_at IS NULL OR expires_at > ?)
              AND (uses_remaining IS NULL OR uses_remaining > 0)
            RETURNING server_id
            "#,
        )
        .bind(code)
        .bind(Timestamp::now().as_unix())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to consume invite: {}", e)))?;

        Ok(server_id.map(ServerId::new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::test_pool;

    async fn seed_users(pool: &SqlitePool) {
        for (id, name) in [("u1", "ada"), ("u2", "brian")] {
            sqlx::query("INSERT INTO users (id, username, created_at) VALUES (?, ?, 0)")
                .bind(id)
                .bind(name)
                .execute(pool)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn create_server_seeds_owner_and_default_channels() {
        let pool = test_pool().await;
        seed_users(&pool).await;

        let store = SqliteServerStore::new(pool.clone());
        let server = store.create_server("home", &UserId::new("u1")).await.unwrap();

        let members = store.server_members(&server.id).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].role, Role::Admin);

        let kinds: Vec<String> =
            sqlx::query_scalar("SELECT kind FROM channels WHERE server_id = ? ORDER BY kind")
                .bind(server.id.as_str())
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(kinds, vec!["text".to_string(), "voice".to_string()]);
    }

    #[tokio::test]
    async fn ban_removes_membership_and_blocks_rejoin_check() {
        let pool = test_pool().await;
        seed_users(&pool).await;

        let store = SqliteServerStore::new(pool);
        let server = store.create_server("home", &UserId::new("u1")).await.unwrap();
        let target = UserId::new("u2");
        store.add_member(&server.id, &target).await.unwrap();

        store.ban_member(&server.id, &target).await.unwrap();

        let members = store.server_members(&server.id).await.unwrap();
        assert!(members.iter().all(|m| m.user.id != target));
        assert!(store.is_banned(&server.id, &target).await.unwrap());
        assert!(!store.is_banned(&server.id, &UserId::new("u1")).await.unwrap());
    }

    #[tokio::test]
    async fn use_limited_invite_is_exhausted_atomically() {
        let pool = test_pool().await;
        seed_users(&pool).await;

        let store = SqliteServerStore::new(pool);
        let server = store.create_server("home", &UserId::new("u1")).await.unwrap();
        let invite = store
            .create_invite(&server.id, &UserId::new("u1"), Some(1), None)
            .await
            .unwrap();

        assert_eq!(
            store.consume_invite(&invite.code).await.unwrap(),
            Some(server.id.clone())
        );
        assert_eq!(store.consume_invite(&invite.code).await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_invite_is_rejected() {
        let pool = test_pool().await;
        seed_users(&pool).await;

        let store = SqliteServerStore::new(pool);
        let server = store.create_server("home", &UserId::new("u1")).await.unwrap();
        let invite = store
            .create_invite(&server.id, &UserId::new("u1"), None, Some(Timestamp::from_unix(1)))
            .await
            .unwrap();

        assert_eq!(store.consume_invite(&invite.code).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_invite_code_is_rejected() {
        let pool = test_pool().await;
        let store = SqliteServerStore::new(pool);
        assert_eq!(store.consume_invite("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn add_member_twice_is_a_noop() {
        let pool = test_pool().await;
        seed_users(&pool).await;

        let store = SqliteServerStore::new(pool);
        let server = store.create_server("home", &UserId::new("u1")).await.unwrap();
        let target = UserId::new("u2");
        store.add_member(&server.id, &target).await.unwrap();
        store.add_member(&server.id, &target).await.unwrap();

        assert_eq!(store.server_members(&server.id).await.unwrap().len(), 2);
    }
}
