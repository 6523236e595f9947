//! Direct-message conversation routes.
//!
//! Conversations are 1:1 or note-to-self; creation is idempotent on the
//! participant set.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::domain::chat::{DirectMessage, PublicUser};
use crate::domain::foundation::{ConversationId, DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::ConversationView;

use super::error::ApiError;
use super::messages::{HistoryQuery, MessageWithAuthor};
use super::middleware::RequireAuth;
use super::AppState;

/// Routes:
/// - `GET  /conversations`               list the caller's conversations
/// - `POST /conversations`               find or start one
/// - `GET  /conversations/:id/messages`  paginated history (participants only)
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/conversations", get(list_conversations).post(open_conversation))
        .route("/conversations/:conversation_id/messages", get(conversation_history))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenConversationRequest {
    /// The other participant; `None` opens the caller's note-to-self.
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConversationResponse {
    id: ConversationId,
    participants: Vec<PublicUser>,
    last_message: Option<DirectMessage>,
    created_at: Timestamp,
}

impl From<ConversationView> for ConversationResponse {
    fn from(view: ConversationView) -> Self {
        Self {
            id: view.id,
            participants: view.participants,
            last_message: view.last_message,
            created_at: view.created_at,
        }
    }
}

async fn list_conversations(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<ConversationResponse>>, ApiError> {
    let views = state
        .conversations
        .conversations_for_user(&user.user_id)
        .await?
        .into_iter()
        .map(ConversationResponse::from)
        .collect();
    Ok(Json(views))
}

async fn open_conversation(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(request): Json<OpenConversationRequest>,
) -> Result<(StatusCode, Json<ConversationResponse>), ApiError> {
    let other = request.user_id.map(UserId::new);
    if let Some(other) = &other {
        if other != &user.user_id && !state.conversations.user_exists(other).await? {
            return Err(DomainError::new(ErrorCode::UserNotFound, "User not found").into());
        }
    }
    // A user id equal to the caller's collapses to note-to-self.
    let other = other.filter(|o| o != &user.user_id);

    let (view, created) = state
        .conversations
        .find_or_create(&user.user_id, other.as_ref())
        .await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(view.into())))
}

async fn conversation_history(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(conversation_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<MessageWithAuthor<DirectMessage>>>, ApiError> {
    let conversation_id = ConversationId::new(conversation_id);
    if !state
        .membership
        .is_conversation_participant(&user.user_id, &conversation_id)
        .await?
    {
        return Err(DomainError::new(
            ErrorCode::ConversationNotFound,
            "Conversation not found",
        )
        .into());
    }

    let page = state
        .messages
        .conversation_messages(&conversation_id, query.cursor(), query.page_size())
        .await?
        .into_iter()
        .map(|(message, author)| MessageWithAuthor { message, author })
        .collect();
    Ok(Json(page))
}
