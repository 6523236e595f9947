//! Channel message history.
//!
//! Live traffic arrives over the gateway; this route backfills history
//! when a client opens a channel or scrolls up.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::domain::chat::{Message, PublicUser};
use crate::domain::foundation::{ChannelId, DomainError, ErrorCode, Timestamp};

use super::error::ApiError;
use super::middleware::RequireAuth;
use super::AppState;

const DEFAULT_PAGE: u32 = 50;
const MAX_PAGE: u32 = 100;

/// Routes:
/// - `GET /channels/:id/messages`  paginated history (members only)
pub fn router() -> Router<AppState> {
    Router::new().route("/channels/:channel_id/messages", get(channel_history))
}

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    /// Exclusive upper bound on creation time (unix seconds).
    pub before: Option<i64>,
    pub limit: Option<u32>,
}

impl HistoryQuery {
    pub(super) fn page_size(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE)
    }

    pub(super) fn cursor(&self) -> Option<Timestamp> {
        self.before.map(Timestamp::from_unix)
    }
}

#[derive(Debug, Serialize)]
pub(super) struct MessageWithAuthor<M> {
    pub message: M,
    pub author: PublicUser,
}

async fn channel_history(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(channel_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<MessageWithAuthor<Message>>>, ApiError> {
    let channel_id = ChannelId::new(channel_id);
    state
        .membership
        .channel_server(&channel_id)
        .await?
        .ok_or_else(|| DomainError::new(ErrorCode::ChannelNotFound, "Channel not found"))?;
    if !state
        .membership
        .is_channel_accessible(&user.user_id, &channel_id)
        .await?
    {
        return Err(DomainError::new(ErrorCode::Forbidden, "Not a member of this server").into());
    }

    let page = state
        .messages
        .channel_messages(&channel_id, query.cursor(), query.page_size())
        .await?
        .into_iter()
        .map(|(message, author)| MessageWithAuthor { message, author })
        .collect();
    Ok(Json(page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::http::testing::{seed_user, test_app};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    #[test]
    fn page_size_is_clamped() {
        let query = HistoryQuery {
            before: None,
            limit: Some(1000),
        };
        assert_eq!(query.page_size(), 100);
        let query = HistoryQuery {
            before: None,
            limit: None,
        };
        assert_eq!(query.page_size(), 50);
        let query = HistoryQuery {
            before: None,
            limit: Some(0),
        };
        assert_eq!(query.page_size(), 1);
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn history_is_member_gated_and_oldest_first() {
        let (app, pool) = test_app().await;
        let member = seed_user(&pool, "u1", "ada").await;
        let outsider = seed_user(&pool, "u2", "eve").await;

        sqlx::query("INSERT INTO servers (id, name, owner_id, created_at) VALUES ('s1', 'Hub', 'u1', 0)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO server_members (server_id, user_id, role, joined_at) VALUES ('s1', 'u1', 'admin', 0)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO channels (id, server_id, name, kind, created_at) VALUES ('c1', 's1', 'general', 'text', 0)",
        )
        .execute(&pool)
        .await
        .unwrap();
        for (id, at) in [("m1", 10), ("m2", 20), ("m3", 30)] {
            sqlx::query(
                "INSERT INTO messages (id, channel_id, author_id, content, created_at) VALUES (?, 'c1', 'u1', 'hi', ?)",
            )
            .bind(id)
            .bind(at)
            .execute(&pool)
            .await
            .unwrap();
        }

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/channels/c1/messages?before=30")
                    .header(header::AUTHORIZATION, format!("Bearer {}", member))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = body_json(response).await;
        let ids: Vec<&str> = page
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["message"]["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["m1", "m2"]);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/channels/c1/messages")
                    .header(header::AUTHORIZATION, format!("Bearer {}", outsider))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unknown_channel_is_404() {
        let (app, pool) = test_app().await;
        let token = seed_user(&pool, "u1", "ada").await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/channels/nope/messages")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
