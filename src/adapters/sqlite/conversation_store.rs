//! SQLite implementation of ConversationStore.
//!
//! Conversations are either 1:1 or note-to-self, so participant-set lookup
//! reduces to "exactly these one or two users".

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::chat::{DirectMessage, PublicUser};
use crate::domain::foundation::{ConversationId, DomainError, MessageId, Timestamp, UserId};
use crate::ports::{ConversationStore, ConversationView};

/// Conversation persistence over the SQLite store.
#[derive(Clone)]
pub struct SqliteConversationStore {
    pool: SqlitePool,
}

impl SqliteConversationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn hydrate(
        &self,
        conversation_id: &ConversationId,
        created_at: Timestamp,
    ) -> Result<ConversationView, DomainError> {
        let participants: Vec<(String, String, Option<String>, i64)> = sqlx::query_as(
            r#"
            SELECT u.id, u.username, u.avatar_url, u.created_at
            FROM conversation_participants p
            JOIN users u ON u.id = p.user_id
            WHERE p.conversation_id = ?
            ORDER BY u.username ASC
            "#,
        )
        .bind(conversation_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load participants: {}", e)))?;

        let last: Option<(String, String, String, Option<String>, i64)> = sqlx::query_as(
            r#"
            SELECT id, author_id, content, gif_url, created_at
            FROM direct_messages
            WHERE conversation_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(conversation_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load last message: {}", e)))?;

        Ok(ConversationView {
            id: conversation_id.clone(),
            participants: participants
                .into_iter()
                .map(|(id, username, avatar_url, created)| PublicUser {
                    id: UserId::new(id),
                    username,
                    avatar_url,
                    created_at: Timestamp::from_unix(created),
                })
                .collect(),
            last_message: last.map(|(id, author_id, content, gif_url, created)| DirectMessage {
                id: MessageId::new(id),
                conversation_id: conversation_id.clone(),
                author_id: UserId::new(author_id),
                content,
                created_at: Timestamp::from_unix(created),
                attachment: None,
                gif_url,
            }),
            created_at,
        })
    }

    async fn find_existing(
        &self,
        user_id: &UserId,
        other: Option<&UserId>,
    ) -> Result<Option<(String, i64)>, DomainError> {
        let row: Option<(String, i64)> = match other {
            Some(other) => {
                sqlx::query_as(
                    r#"
                    SELECT c.id, c.created_at
                    FROM conversations c
                    JOIN conversation_participants p1 ON p1.conversation_id = c.id AND p1.user_id = ?
                    JOIN conversation_participants p2 ON p2.conversation_id = c.id AND p2.user_id = ?
                    WHERE (SELECT COUNT(*) FROM conversation_participants pc
                           WHERE pc.conversation_id = c.id) = 2
                    "#,
                )
                .bind(user_id.as_str())
                .bind(other.as_str())
                .fetch_optional(&self.pool)
                .await
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT c.id, c.created_at
                    FROM conversations c
                    JOIN conversation_participants p ON p.conversation_id = c.id AND p.user_id = ?
                    WHERE (SELECT COUNT(*) FROM conversation_participants pc
                           WHERE pc.conversation_id = c.id) = 1
                    "#,
                )
                .bind(user_id.as_str())
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(|e| DomainError::database(format!("Failed to find conversation: {}", e)))?;

        Ok(row)
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn conversations_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ConversationView>, DomainError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT c.id, c.created_at
            FROM conversations c
            JOIN conversation_participants p ON p.conversation_id = c.id
            WHERE p.user_id = ?
            ORDER BY COALESCE(
                (SELECT MAX(dm.created_at) FROM direct_messages dm
                 WHERE dm.conversation_id = c.id),
                c.created_at
            ) DESC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list conversations: {}", e)))?;

        let mut views = Vec::with_capacity(rows.len());
        for (id, created_at) in rows {
            views.push(
                self.hydrate(&ConversationId::new(id), Timestamp::from_unix(created_at))
                    .await?,
            );
        }
        Ok(views)
    }

    async fn find_or_create(
        &self,
        user_id: &UserId,
        other: Option<&UserId>,
    ) -> Result<(ConversationView, bool), DomainError> {
        if let Some((id, created_at)) = self.find_existing(user_id, other).await? {
            let view = self
                .hydrate(&ConversationId::new(id), Timestamp::from_unix(created_at))
                .await?;
            return Ok((view, false));
        }

        let id = ConversationId::generate();
        let created_at = Timestamp::now();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to start transaction: {}", e)))?;

        sqlx::query("INSERT INTO conversations (id, created_at) VALUES (?, ?)")
            .bind(id.as_str())
            .bind(created_at.as_unix())
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to create conversation: {}", e)))?;

        let mut participants = vec![user_id];
        if let Some(other) = other {
            participants.push(other);
        }
        for participant in participants {
            sqlx::query(
                "INSERT INTO conversation_participants (conversation_id, user_id) VALUES (?, ?)",
            )
            .bind(id.as_str())
            .bind(participant.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to add participant: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit conversation: {}", e)))?;

        let view = self.hydrate(&id, created_at).await?;
        Ok((view, true))
    }

    async fn user_exists(&self, user_id: &UserId) -> Result<bool, DomainError> {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
            .bind(user_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to check user: {}", e)))?;
        Ok(exists != 0)
    }
}
